//! JSON HTTP API for Ruledesk.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`RuleStore`] and [`AccountStore`]. Every `/rules` route and `/auth/me`
//! require a session cookie issued by `/auth/signup` or `/auth/login`.

pub mod accounts;
pub mod auth;
pub mod error;
pub mod extract;
pub mod rules;
pub mod session;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, patch, post},
};
use ruledesk_core::store::{AccountStore, RuleStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `RULEDESK_*` environment variables. Missing keys take their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  pub cookie_name:       String,
  pub session_ttl_hours: u32,
  /// Add `Secure` to the session cookie. Leave off when serving plain HTTP.
  pub secure_cookies:    bool,
  pub allow_signup:      bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:              "127.0.0.1".to_string(),
      port:              8501,
      store_path:        PathBuf::from("ruledesk.db"),
      cookie_name:       "ruledesk_session".to_string(),
      session_ttl_hours: 24 * 7,
      secure_cookies:    false,
      allow_signup:      true,
    }
  }
}

impl ServerConfig {
  pub fn session_ttl(&self) -> chrono::Duration {
    chrono::Duration::hours(i64::from(self.session_ttl_hours))
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Everything a handler needs from the store.
pub trait Backend: RuleStore + AccountStore + Clone + Send + Sync + 'static {}

impl<T> Backend for T where T: RuleStore + AccountStore + Clone + Send + Sync + 'static {}

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S: Backend>(state: AppState<S>) -> Router {
  Router::new()
    // Rules
    .route(
      "/rules",
      get(rules::list::<S>)
        .post(rules::create::<S>)
        .put(rules::update::<S>)
        .delete(rules::remove::<S>),
    )
    .route("/rules/history", get(rules::history::<S>))
    .route("/rules/toggle-active", patch(rules::toggle_active::<S>))
    // Accounts
    .route("/auth/signup", post(accounts::signup::<S>))
    .route("/auth/login", post(accounts::login::<S>))
    .route("/auth/logout", post(accounts::logout::<S>))
    .route("/auth/me", get(accounts::me))
    .route("/health", get(health))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> &'static str { "OK" }

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
  };
  use ruledesk_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  async fn app_with(config: ServerConfig) -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    router(AppState { store: Arc::new(store), config: Arc::new(config) })
  }

  async fn app() -> Router { app_with(ServerConfig::default()).await }

  struct Reply {
    status:  StatusCode,
    headers: HeaderMap,
    body:    Value,
  }

  impl Reply {
    /// The `name=value` pair from `Set-Cookie`, ready to send back.
    fn cookie(&self) -> String {
      let set = self.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
      set.split(';').next().unwrap().to_string()
    }

    fn error(&self) -> &str { self.body["error"].as_str().unwrap() }
  }

  async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
  ) -> Reply {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
      req = req.header(header::COOKIE, cookie);
    }
    let req = match body {
      Some(body) => req
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Reply { status, headers, body }
  }

  async fn signed_up(app: &Router, email: &str) -> String {
    let reply = send(
      app,
      Method::POST,
      "/auth/signup",
      None,
      Some(json!({ "email": email, "password": "password123" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    reply.cookie()
  }

  fn rule(event_name: &str, billing_type: &str) -> Value {
    json!({
      "eventName": event_name,
      "billingType": billing_type,
      "tacticField": "placement",
      "isEngagement": 1,
      "isExposure": 0,
    })
  }

  #[tokio::test]
  async fn health_needs_no_session() {
    let app = app().await;
    let reply = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
  }

  #[tokio::test]
  async fn rules_require_session() {
    let app = app().await;
    for (method, uri) in [
      (Method::GET, "/rules"),
      (Method::GET, "/rules/history?eventName=click"),
      (Method::PUT, "/rules"),
      (Method::PATCH, "/rules/toggle-active"),
      (Method::DELETE, "/rules?eventName=click"),
      (Method::GET, "/auth/me"),
    ] {
      let reply = send(&app, method, uri, None, None).await;
      assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "{uri}");
      assert_eq!(reply.error(), "Unauthorized");
    }

    let reply = send(&app, Method::POST, "/rules", None, Some(rule("click", "CPE"))).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    let reply = send(&app, Method::PUT, "/rules", None, Some(rule("click", "CPE"))).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    let toggle = json!({ "eventName": "click", "isActive": 0 });
    let reply = send(&app, Method::PATCH, "/rules/toggle-active", None, Some(toggle)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let bogus = "ruledesk_session=deadbeef";
    let reply = send(&app, Method::GET, "/rules", Some(bogus), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn signup_issues_cookie() {
    let app = app().await;
    let reply = send(
      &app,
      Method::POST,
      "/auth/signup",
      None,
      Some(json!({ "email": "Ops@Example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["email"], "ops@example.com");
    let set = reply.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set.contains("HttpOnly"));
    assert!(set.contains("SameSite=Lax"));

    let me = send(&app, Method::GET, "/auth/me", Some(&reply.cookie()), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["email"], "ops@example.com");
  }

  #[tokio::test]
  async fn signup_rejects_taken_email_and_bad_input() {
    let app = app().await;
    signed_up(&app, "ops@example.com").await;

    let body = json!({ "email": "OPS@example.com", "password": "password123" });
    let reply = send(&app, Method::POST, "/auth/signup", None, Some(body)).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let body = json!({ "email": "new@example.com", "password": "short" });
    let reply = send(&app, Method::POST, "/auth/signup", None, Some(body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn signup_can_be_disabled() {
    let app = app_with(ServerConfig { allow_signup: false, ..Default::default() }).await;
    let body = json!({ "email": "ops@example.com", "password": "password123" });
    let reply = send(&app, Method::POST, "/auth/signup", None, Some(body)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn login_replaces_earlier_session() {
    let app = app().await;
    let first = signed_up(&app, "ops@example.com").await;

    let wrong = json!({ "email": "ops@example.com", "password": "not-the-password" });
    let reply = send(&app, Method::POST, "/auth/login", None, Some(wrong)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.error(), "Incorrect email or password");

    let unknown = json!({ "email": "nobody@example.com", "password": "password123" });
    let reply = send(&app, Method::POST, "/auth/login", None, Some(unknown)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let right = json!({ "email": " OPS@example.com", "password": "password123" });
    let reply = send(&app, Method::POST, "/auth/login", None, Some(right)).await;
    assert_eq!(reply.status, StatusCode::OK);
    let second = reply.cookie();
    assert_ne!(first, second);

    let me = send(&app, Method::GET, "/auth/me", Some(&first), None).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
    let me = send(&app, Method::GET, "/auth/me", Some(&second), None).await;
    assert_eq!(me.status, StatusCode::OK);
  }

  #[tokio::test]
  async fn logout_invalidates_session() {
    let app = app().await;
    let cookie = signed_up(&app, "ops@example.com").await;

    let reply = send(&app, Method::POST, "/auth/logout", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    let set = reply.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set.contains("Max-Age=0"));

    let reply = send(&app, Method::GET, "/rules", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(&app, Method::POST, "/auth/logout", None, None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
  }

  #[tokio::test]
  async fn rule_lifecycle() {
    let app = app().await;
    let cookie = signed_up(&app, "ops@example.com").await;
    let cookie = Some(cookie.as_str());

    let created = send(&app, Method::POST, "/rules", cookie, Some(rule("click", "CPE"))).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["version"], 1);
    assert_eq!(created.body["isLatest"], 1);
    assert_eq!(created.body["isActive"], 1);
    assert_eq!(created.body["modifiedBy"], "ops@example.com");

    let again = send(&app, Method::POST, "/rules", cookie, Some(rule("click", "CPX"))).await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let updated = send(&app, Method::PUT, "/rules", cookie, Some(rule("click", "CPVS"))).await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["version"], 2);
    assert_eq!(updated.body["billingType"], "CPVS");
    assert_eq!(updated.body["validTo"], Value::Null);

    let history = send(&app, Method::GET, "/rules/history?eventName=click", cookie, None).await;
    assert_eq!(history.status, StatusCode::OK);
    let versions: Vec<_> = history
      .body
      .as_array()
      .unwrap()
      .iter()
      .map(|r| r["version"].as_u64().unwrap())
      .collect();
    assert_eq!(versions, [2, 1]);
    assert_eq!(history.body[1]["isLatest"], 0);
    assert!(history.body[1]["validTo"].is_string());

    let toggled = send(
      &app,
      Method::PATCH,
      "/rules/toggle-active",
      cookie,
      Some(json!({ "eventName": "click", "isActive": 0 })),
    )
    .await;
    assert_eq!(toggled.status, StatusCode::OK);
    assert_eq!(toggled.body["isActive"], 0);
    assert_eq!(toggled.body["version"], 2);
    assert_eq!(toggled.body["inactivatedBy"], "ops@example.com");

    let latest = send(&app, Method::GET, "/rules", cookie, None).await;
    assert_eq!(latest.body.as_array().unwrap().len(), 1);
    let active = send(&app, Method::GET, "/rules?active=true", cookie, None).await;
    assert_eq!(active.body.as_array().unwrap().len(), 0);
    let all = send(&app, Method::GET, "/rules?history=true", cookie, None).await;
    assert_eq!(all.body.as_array().unwrap().len(), 2);
    let all = send(&app, Method::GET, "/rules?latest=false", cookie, None).await;
    assert_eq!(all.body.as_array().unwrap().len(), 2);

    let deleted = send(&app, Method::DELETE, "/rules?eventName=click", cookie, None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Rule deleted successfully");
    assert_eq!(deleted.body["deleted"], 2);

    let deleted = send(&app, Method::DELETE, "/rules?eventName=click", cookie, None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["deleted"], 0);

    let latest = send(&app, Method::GET, "/rules", cookie, None).await;
    assert_eq!(latest.body, json!([]));
  }

  #[tokio::test]
  async fn rule_errors_map_to_statuses() {
    let app = app().await;
    let cookie = signed_up(&app, "ops@example.com").await;
    let cookie = Some(cookie.as_str());

    let partial = json!({ "eventName": "click" });
    let reply = send(&app, Method::POST, "/rules", cookie, Some(partial)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error(), "Missing required fields");

    let reply = send(&app, Method::POST, "/rules", cookie, Some(rule("click", "CPM"))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error(), "Invalid billingType. Must be CPX, CPE, or CPVS");

    let mut bad_flag = rule("click", "CPE");
    bad_flag["isExposure"] = json!(2);
    let reply = send(&app, Method::POST, "/rules", cookie, Some(bad_flag)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error(), "isEngagement and isExposure must be 0 or 1");

    let reply = send(&app, Method::PUT, "/rules", cookie, Some(rule("ghost", "CPE"))).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let toggle = json!({ "eventName": "ghost", "isActive": 1 });
    let reply = send(&app, Method::PATCH, "/rules/toggle-active", cookie, Some(toggle)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let toggle = json!({ "eventName": "ghost", "isActive": 5 });
    let reply = send(&app, Method::PATCH, "/rules/toggle-active", cookie, Some(toggle)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error(), "eventName and isActive (0 or 1) are required");

    let toggle = json!({ "eventName": "ghost", "isActive": true });
    let reply = send(&app, Method::PATCH, "/rules/toggle-active", cookie, Some(toggle)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error(), "eventName and isActive (0 or 1) are required");

    let mut bool_flag = rule("click", "CPE");
    bool_flag["isEngagement"] = json!(true);
    let reply = send(&app, Method::POST, "/rules", cookie, Some(bool_flag)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error(), "isEngagement and isExposure must be 0 or 1");

    let reply = send(&app, Method::GET, "/rules/history", cookie, None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error(), "eventName is required");

    let reply = send(&app, Method::DELETE, "/rules", cookie, None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let req = Request::builder()
      .method(Method::POST)
      .uri("/rules")
      .header(header::COOKIE, cookie.unwrap())
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from("{not json"))
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
  }
}
