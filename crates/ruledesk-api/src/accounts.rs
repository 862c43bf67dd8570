//! Handlers for `/auth` endpoints.

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use chrono::Utc;
use ruledesk_core::{
  account::{Credentials, NewSession, SessionUser, User},
  store::AccountStore,
};

use crate::{
  AppState, Backend,
  auth::{RequestContext, hash_password, verify_password},
  error::ApiError,
  extract::Body,
  session::{self, SessionToken},
};

/// Persist a fresh session for `user` and build its `Set-Cookie` value.
async fn issue_session<S: Backend>(state: &AppState<S>, user: &User) -> Result<String, ApiError> {
  let token = SessionToken::generate();
  state
    .store
    .start_session(NewSession {
      token_digest: token.digest(),
      user_id:      user.user_id,
      expires_at:   Utc::now() + state.config.session_ttl(),
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok(session::set_cookie(&state.config, &token))
}

/// `POST /auth/signup`
pub async fn signup<S: Backend>(
  State(state): State<AppState<S>>,
  Body(creds): Body<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
  if !state.config.allow_signup {
    return Err(ApiError::Forbidden("Signup is disabled".into()));
  }
  let creds = creds.validate()?;
  let password_hash = hash_password(&creds.password)?;

  let user = state
    .store
    .create_user(creds.email, password_hash)
    .await
    .map_err(ApiError::from_store)?;
  let cookie = issue_session(&state, &user).await?;

  tracing::info!(email = %user.email, "user signed up");
  Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(user)))
}

/// `POST /auth/login`
pub async fn login<S: Backend>(
  State(state): State<AppState<S>>,
  Body(creds): Body<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
  let email = creds.email.trim().to_lowercase();
  let stored = state
    .store
    .find_credentials(&email)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(ApiError::BadCredentials)?;

  if !verify_password(&creds.password, &stored.password_hash) {
    return Err(ApiError::BadCredentials);
  }

  let cookie = issue_session(&state, &stored.user).await?;
  Ok(([(header::SET_COOKIE, cookie)], Json(stored.user)))
}

/// `POST /auth/logout` — succeeds whether or not a session was present.
pub async fn logout<S: Backend>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> impl IntoResponse {
  if let Some(token) = session::read_cookie(&headers, &state.config.cookie_name)
    && let Err(e) = state.store.end_session(&session::digest(token)).await
  {
    tracing::warn!(error = %e, "failed to end session");
  }
  (
    StatusCode::NO_CONTENT,
    [(header::SET_COOKIE, session::clear_cookie(&state.config))],
  )
}

/// `GET /auth/me`
pub async fn me(ctx: RequestContext) -> Json<SessionUser> { Json(ctx.user) }
