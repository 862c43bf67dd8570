//! Handlers for `/rules` endpoints.
//!
//! | Method   | Path                   | Notes |
//! |----------|------------------------|-------|
//! | `GET`    | `/rules`               | `?history=true`, `?active=true`, `?latest=false` |
//! | `GET`    | `/rules/history`       | `?eventName=` required |
//! | `POST`   | `/rules`               | 201, 409 if the name is taken |
//! | `PUT`    | `/rules`               | appends a version, 404 if unknown |
//! | `PATCH`  | `/rules/toggle-active` | body `{"eventName":..,"isActive":0\|1}` |
//! | `DELETE` | `/rules`               | `?eventName=`, removes every version |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use ruledesk_core::{
  flag::FlagInput,
  rule::{EngagementRule, RuleDraft},
  store::{RuleFilter, RuleStore},
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState, Backend,
  auth::RequestContext,
  error::ApiError,
  extract::{Body, Params},
};

// ─── List ─────────────────────────────────────────────────────────────────────

/// Raw `"true"`/`"false"` switches, read the lenient way: anything other than
/// the exact string keeps the default.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub history: Option<String>,
  pub active:  Option<String>,
  pub latest:  Option<String>,
}

impl ListParams {
  fn filter(&self) -> RuleFilter {
    RuleFilter {
      show_history: self.history.as_deref() == Some("true"),
      only_active:  self.active.as_deref() == Some("true"),
      only_latest:  self.latest.as_deref() != Some("false"),
    }
  }
}

/// `GET /rules`
pub async fn list<S: Backend>(
  State(state): State<AppState<S>>,
  _ctx: RequestContext,
  Params(params): Params<ListParams>,
) -> Result<Json<Vec<EngagementRule>>, ApiError> {
  let rules = state
    .store
    .list_rules(params.filter())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rules))
}

// ─── History ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNameParams {
  pub event_name: Option<String>,
}

impl EventNameParams {
  fn event_name(&self) -> &str { self.event_name.as_deref().unwrap_or_default() }
}

/// `GET /rules/history?eventName=<name>`
pub async fn history<S: Backend>(
  State(state): State<AppState<S>>,
  _ctx: RequestContext,
  Params(params): Params<EventNameParams>,
) -> Result<Json<Vec<EngagementRule>>, ApiError> {
  let versions = state
    .store
    .rule_history(params.event_name())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(versions))
}

// ─── Create / update ──────────────────────────────────────────────────────────

/// `POST /rules`
pub async fn create<S: Backend>(
  State(state): State<AppState<S>>,
  ctx: RequestContext,
  Body(draft): Body<RuleDraft>,
) -> Result<impl IntoResponse, ApiError> {
  let rule = draft.validate()?;
  let created = state
    .store
    .create_rule(rule, ctx.actor())
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /rules` — closes the latest version and returns its successor.
pub async fn update<S: Backend>(
  State(state): State<AppState<S>>,
  ctx: RequestContext,
  Body(draft): Body<RuleDraft>,
) -> Result<Json<EngagementRule>, ApiError> {
  let rule = draft.validate()?;
  let next = state
    .store
    .update_rule(rule, ctx.actor())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(next))
}

// ─── Toggle ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleBody {
  pub event_name: Option<String>,
  pub is_active:  Option<FlagInput>,
}

/// `PATCH /rules/toggle-active` — flips activity on the latest version in
/// place; no new version is written.
pub async fn toggle_active<S: Backend>(
  State(state): State<AppState<S>>,
  ctx: RequestContext,
  Body(body): Body<ToggleBody>,
) -> Result<Json<EngagementRule>, ApiError> {
  let (Some(event_name), Some(active)) = (
    body.event_name.filter(|s| !s.is_empty()),
    body.is_active.and_then(FlagInput::to_bool),
  ) else {
    return Err(ApiError::BadRequest(
      "eventName and isActive (0 or 1) are required".into(),
    ));
  };

  let updated = state
    .store
    .set_active(&event_name, active, ctx.actor())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(updated))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Deleted {
  pub message: &'static str,
  /// Number of version records removed; zero when the name was unknown.
  pub deleted: usize,
}

/// `DELETE /rules?eventName=<name>`
pub async fn remove<S: Backend>(
  State(state): State<AppState<S>>,
  _ctx: RequestContext,
  Params(params): Params<EventNameParams>,
) -> Result<Json<Deleted>, ApiError> {
  let deleted = state
    .store
    .delete_rule(params.event_name())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(Deleted { message: "Rule deleted successfully", deleted }))
}
