//! The `RuleStore` and `AccountStore` traits and supporting query types.
//!
//! The traits are implemented by storage backends (e.g.
//! `ruledesk-store-sqlite`). The HTTP layer depends on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  StoreError,
  account::{NewSession, SessionUser, StoredCredentials, User},
  rule::{EngagementRule, NewRule},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`RuleStore::list_rules`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleFilter {
  /// Return every version of every rule; overrides `only_latest`.
  pub show_history: bool,
  pub only_active:  bool,
  pub only_latest:  bool,
}

impl Default for RuleFilter {
  fn default() -> Self {
    Self { show_history: false, only_active: false, only_latest: true }
  }
}

impl RuleFilter {
  /// Whether the result is restricted to `isLatest = 1` records.
  pub fn latest_only(&self) -> bool { self.only_latest && !self.show_history }
}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// Abstraction over a versioned rule store.
///
/// Version records are append-only. Editing a rule closes its latest record
/// and appends a successor in one transaction; only the latest record's
/// activity may be changed in place.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RuleStore: Send + Sync {
  type Error: StoreError;

  /// Rules matching `filter`, ordered by `event_name` ascending then
  /// `version` descending.
  fn list_rules(
    &self,
    filter: RuleFilter,
  ) -> impl Future<Output = Result<Vec<EngagementRule>, Self::Error>> + Send + '_;

  /// Every version of one rule, newest first. Empty if the name is unknown.
  fn rule_history<'a>(
    &'a self,
    event_name: &'a str,
  ) -> impl Future<Output = Result<Vec<EngagementRule>, Self::Error>> + Send + 'a;

  /// Start a new chain at version 1.
  ///
  /// Fails with a conflict if the name already has a latest record.
  fn create_rule<'a>(
    &'a self,
    rule: NewRule,
    actor: &'a str,
  ) -> impl Future<Output = Result<EngagementRule, Self::Error>> + Send + 'a;

  /// Close the current latest record and append its successor atomically.
  ///
  /// Fails with not-found (and writes nothing) if the chain does not exist.
  fn update_rule<'a>(
    &'a self,
    rule: NewRule,
    actor: &'a str,
  ) -> impl Future<Output = Result<EngagementRule, Self::Error>> + Send + 'a;

  /// Switch the latest record on or off in place.
  fn set_active<'a>(
    &'a self,
    event_name: &'a str,
    active: bool,
    actor: &'a str,
  ) -> impl Future<Output = Result<EngagementRule, Self::Error>> + Send + 'a;

  /// Remove every version of a rule. Returns the number of records removed;
  /// zero is not an error.
  fn delete_rule<'a>(
    &'a self,
    event_name: &'a str,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// Users and their login sessions.
pub trait AccountStore: Send + Sync {
  type Error: StoreError;

  /// Fails with a conflict if the email is already registered.
  fn create_user(
    &self,
    email: String,
    password_hash: String,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn find_credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<StoredCredentials>, Self::Error>> + Send + 'a;

  /// Persist a session, replacing any earlier sessions of the same user.
  fn start_session(
    &self,
    session: NewSession,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Look up a session by token digest. Unknown and expired sessions both
  /// resolve to `None`.
  fn resolve_session<'a>(
    &'a self,
    token_digest: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<SessionUser>, Self::Error>> + Send + 'a;

  fn end_session<'a>(
    &'a self,
    token_digest: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete sessions that expired at or before `now`.
  fn purge_expired_sessions(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
