//! Session tokens and the cookie that carries them.
//!
//! A token is 32 random bytes, hex-encoded. Only its SHA-256 digest reaches
//! the store, so a leaked database does not leak live sessions.

use axum::http::{HeaderMap, header};
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};

use crate::ServerConfig;

const TOKEN_BYTES: usize = 32;

/// A freshly minted bearer token.
pub struct SessionToken(String);

impl SessionToken {
  pub fn generate() -> Self {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    Self(hex::encode(bytes))
  }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn digest(&self) -> String { digest(&self.0) }
}

/// Hex SHA-256 of a raw token; the lookup key in the sessions table.
pub fn digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// Value of the cookie called `name`, if the request carries a non-empty one.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(k, _)| *k == name)
    .map(|(_, v)| v)
    .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value that installs `token` for the configured lifetime.
pub fn set_cookie(config: &ServerConfig, token: &SessionToken) -> String {
  cookie(config, token.as_str(), config.session_ttl().num_seconds())
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
pub fn clear_cookie(config: &ServerConfig) -> String { cookie(config, "", 0) }

fn cookie(config: &ServerConfig, value: &str, max_age: i64) -> String {
  let mut c = format!(
    "{}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}",
    config.cookie_name
  );
  if config.secure_cookies {
    c.push_str("; Secure");
  }
  c
}
