//! Password hashing and the session-backed request context.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use rand_core::OsRng;
use ruledesk_core::{account::SessionUser, store::AccountStore};

use crate::{AppState, Backend, error::ApiError, session};

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

/// Check `password` against a stored PHC string. A malformed hash never
/// verifies.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(password_hash) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

/// The caller behind a request, resolved once from the session cookie.
///
/// Present in a handler's arguments means the request carried a live session.
#[derive(Debug, Clone)]
pub struct RequestContext {
  pub user:         SessionUser,
  pub token_digest: String,
}

impl RequestContext {
  /// Recorded as `modifiedBy` / `inactivatedBy` on rule writes.
  pub fn actor(&self) -> &str { &self.user.email }
}

impl<S: Backend> FromRequestParts<AppState<S>> for RequestContext {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = session::read_cookie(&parts.headers, &state.config.cookie_name)
      .ok_or(ApiError::Unauthorized)?;
    let token_digest = session::digest(token);

    let user = state
      .store
      .resolve_session(&token_digest, Utc::now())
      .await
      .map_err(ApiError::from_store)?
      .ok_or(ApiError::Unauthorized)?;

    Ok(Self { user, token_digest })
  }
}
