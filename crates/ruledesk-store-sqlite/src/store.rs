//! [`SqliteStore`] — the SQLite implementation of [`RuleStore`] and
//! [`AccountStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use ruledesk_core::{
  account::{NewSession, SessionUser, StoredCredentials, User},
  rule::{EngagementRule, NewRule, require_event_name},
  store::{AccountStore, RuleFilter, RuleStore},
};

use crate::{Error, Result, accounts, encode, rules, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Ruledesk store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── RuleStore impl ──────────────────────────────────────────────────────────

impl RuleStore for SqliteStore {
  type Error = Error;

  async fn list_rules(&self, filter: RuleFilter) -> Result<Vec<EngagementRule>> {
    self.conn.call(move |conn| Ok(rules::list(conn, filter))).await?
  }

  async fn rule_history(&self, event_name: &str) -> Result<Vec<EngagementRule>> {
    let event_name = require_event_name(event_name)?.to_owned();
    self
      .conn
      .call(move |conn| Ok(rules::history(conn, &event_name)))
      .await?
  }

  async fn create_rule(&self, rule: NewRule, actor: &str) -> Result<EngagementRule> {
    require_event_name(&rule.event_name)?;
    let actor = actor.to_owned();

    let created = self
      .conn
      .call(move |conn| Ok(rules::create(conn, rule, &actor, encode::now())))
      .await??;

    tracing::info!(
      event_name = %created.event_name,
      actor = %created.modified_by,
      "rule created"
    );
    Ok(created)
  }

  async fn update_rule(&self, rule: NewRule, actor: &str) -> Result<EngagementRule> {
    require_event_name(&rule.event_name)?;
    let actor = actor.to_owned();

    // Stamped on the connection thread so timestamps follow commit order.
    let next = self
      .conn
      .call(move |conn| Ok(rules::supersede_latest(conn, rule, &actor, encode::now())))
      .await??;

    tracing::info!(
      event_name = %next.event_name,
      version = next.version,
      actor = %next.modified_by,
      "rule superseded"
    );
    Ok(next)
  }

  async fn set_active(
    &self,
    event_name: &str,
    active: bool,
    actor: &str,
  ) -> Result<EngagementRule> {
    let event_name = require_event_name(event_name)?.to_owned();
    let actor = actor.to_owned();

    let updated = self
      .conn
      .call(move |conn| {
        Ok(rules::set_active(conn, &event_name, active, &actor, encode::now()))
      })
      .await??;

    tracing::info!(
      event_name = %updated.event_name,
      version = updated.version,
      active,
      "rule activity changed"
    );
    Ok(updated)
  }

  async fn delete_rule(&self, event_name: &str) -> Result<usize> {
    let event_name = require_event_name(event_name)?.to_owned();
    let name = event_name.clone();
    let removed = self
      .conn
      .call(move |conn| Ok(rules::delete(conn, &name)))
      .await??;

    tracing::info!(%event_name, removed, "rule deleted");
    Ok(removed)
  }
}

// ─── AccountStore impl ───────────────────────────────────────────────────────

impl AccountStore for SqliteStore {
  type Error = Error;

  async fn create_user(&self, email: String, password_hash: String) -> Result<User> {
    let now = encode::now();
    self
      .conn
      .call(move |conn| Ok(accounts::create_user(conn, email, &password_hash, now)))
      .await?
  }

  async fn find_credentials(&self, email: &str) -> Result<Option<StoredCredentials>> {
    let email = email.to_owned();
    self
      .conn
      .call(move |conn| Ok(accounts::find_credentials(conn, &email)))
      .await?
  }

  async fn start_session(&self, session: NewSession) -> Result<()> {
    let now = encode::now();
    self
      .conn
      .call(move |conn| Ok(accounts::start_session(conn, &session, now)))
      .await?
  }

  async fn resolve_session(
    &self,
    token_digest: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<SessionUser>> {
    let token_digest = token_digest.to_owned();
    self
      .conn
      .call(move |conn| Ok(accounts::resolve_session(conn, &token_digest, now)))
      .await?
  }

  async fn end_session(&self, token_digest: &str) -> Result<()> {
    let token_digest = token_digest.to_owned();
    self
      .conn
      .call(move |conn| Ok(accounts::end_session(conn, &token_digest)))
      .await?
  }

  async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
    self
      .conn
      .call(move |conn| Ok(accounts::purge_expired(conn, now)))
      .await?
  }
}
