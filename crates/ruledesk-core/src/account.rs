//! Users, credentials, and login sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub user_id:    Uuid,
  /// Always lower-case.
  pub email:      String,
  pub created_at: DateTime<Utc>,
}

/// A user row together with its stored argon2 PHC string.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
  pub user:          User,
  pub password_hash: String,
}

/// Email/password pair submitted to signup or login.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
}

impl Credentials {
  /// Check shape and normalise the email to lower case.
  pub fn validate(self) -> Result<Self> {
    let email = self.email.trim().to_lowercase();
    if !looks_like_email(&email) {
      return Err(Error::Validation("Please provide a valid email".into()));
    }

    let len = self.password.chars().count();
    if len < MIN_PASSWORD_LEN {
      return Err(Error::Validation(format!(
        "Password needs to be at least {MIN_PASSWORD_LEN} characters long"
      )));
    }
    if len > MAX_PASSWORD_LEN {
      return Err(Error::Validation(format!(
        "Password cannot exceed {MAX_PASSWORD_LEN} characters"
      )));
    }

    Ok(Self { email, password: self.password })
  }
}

fn looks_like_email(s: &str) -> bool {
  let Some((local, domain)) = s.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.contains('@')
    && !s.contains(char::is_whitespace)
    && domain
      .split_once('.')
      .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

/// Input to [`crate::store::AccountStore::start_session`]. Only the digest of
/// the bearer token is ever persisted.
#[derive(Debug, Clone)]
pub struct NewSession {
  pub token_digest: String,
  pub user_id:      Uuid,
  pub expires_at:   DateTime<Utc>,
}

/// The identity behind a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
  pub user_id:    Uuid,
  pub email:      String,
  pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn creds(email: &str, password: &str) -> Credentials {
    Credentials { email: email.into(), password: password.into() }
  }

  #[test]
  fn email_is_lowercased() {
    let c = creds(" Alice@Example.COM ", "hunter22hunter").validate().unwrap();
    assert_eq!(c.email, "alice@example.com");
  }

  #[test]
  fn rejects_malformed_email() {
    for bad in ["", "alice", "@example.com", "alice@", "alice@example", "a@b@c.io"] {
      assert!(creds(bad, "longenough").validate().is_err(), "{bad:?}");
    }
  }

  #[test]
  fn password_length_bounds() {
    assert!(creds("a@b.io", "short").validate().is_err());
    assert!(creds("a@b.io", "12345678").validate().is_ok());
    assert!(creds("a@b.io", &"x".repeat(129)).validate().is_err());
  }
}
