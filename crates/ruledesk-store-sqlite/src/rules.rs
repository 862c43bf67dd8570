//! Synchronous rule queries, run on the `tokio_rusqlite` connection thread.
//!
//! Every read-then-write operation opens a `BEGIN IMMEDIATE` transaction, so
//! the write lock is held from the latest-record lookup through commit. An
//! early return drops the transaction, which rolls it back.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};
use ruledesk_core::{
  rule::{EngagementRule, NewRule},
  store::RuleFilter,
};

use crate::{
  Result,
  encode::{RULE_COLUMNS, RawRule},
};

fn collect(raws: Vec<RawRule>) -> Result<Vec<EngagementRule>> {
  raws.into_iter().map(RawRule::into_rule).collect()
}

fn latest(conn: &Connection, event_name: &str) -> Result<Option<EngagementRule>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {RULE_COLUMNS} FROM engagement_rules
         WHERE event_name = ?1 AND is_latest = 1"
      ),
      params![event_name],
      RawRule::from_row,
    )
    .optional()?;
  raw.map(RawRule::into_rule).transpose()
}

fn insert(conn: &Connection, rule: &EngagementRule) -> Result<()> {
  let r = RawRule::encode(rule);
  conn.execute(
    &format!(
      "INSERT INTO engagement_rules ({RULE_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
    ),
    params![
      r.id,
      r.event_name,
      r.billing_type,
      r.tactic_field,
      r.is_engagement,
      r.is_exposure,
      r.is_active,
      r.is_latest,
      r.version,
      r.valid_from,
      r.valid_to,
      r.created_at,
      r.updated_at,
      r.modified_by,
      r.inactivated_at,
      r.inactivated_by,
    ],
  )?;
  Ok(())
}

/// Persist the status columns of an already-stored record.
fn write_status(conn: &Connection, rule: &EngagementRule) -> Result<()> {
  let r = RawRule::encode(rule);
  conn.execute(
    "UPDATE engagement_rules
     SET is_active = ?2, inactivated_at = ?3, inactivated_by = ?4,
         is_latest = ?5, valid_to = ?6, updated_at = ?7
     WHERE id = ?1",
    params![
      r.id,
      r.is_active,
      r.inactivated_at,
      r.inactivated_by,
      r.is_latest,
      r.valid_to,
      r.updated_at,
    ],
  )?;
  Ok(())
}

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn list(conn: &Connection, filter: RuleFilter) -> Result<Vec<EngagementRule>> {
  let mut conds: Vec<&'static str> = vec![];
  if filter.latest_only() {
    conds.push("is_latest = 1");
  }
  if filter.only_active {
    conds.push("is_active = 1");
  }

  let where_clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };

  let mut stmt = conn.prepare(&format!(
    "SELECT {RULE_COLUMNS} FROM engagement_rules
     {where_clause}
     ORDER BY event_name ASC, version DESC"
  ))?;
  let raws = stmt
    .query_map([], RawRule::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  collect(raws)
}

pub fn history(conn: &Connection, event_name: &str) -> Result<Vec<EngagementRule>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {RULE_COLUMNS} FROM engagement_rules
     WHERE event_name = ?1
     ORDER BY version DESC"
  ))?;
  let raws = stmt
    .query_map(params![event_name], RawRule::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  collect(raws)
}

// ─── Writes ──────────────────────────────────────────────────────────────────

pub fn create(
  conn: &mut Connection,
  rule: NewRule,
  actor: &str,
  now: DateTime<Utc>,
) -> Result<EngagementRule> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  if latest(&tx, &rule.event_name)?.is_some() {
    return Err(ruledesk_core::Error::RuleExists(rule.event_name).into());
  }

  let first = EngagementRule::first_version(rule, actor, now);
  insert(&tx, &first)?;
  tx.commit()?;
  Ok(first)
}

/// Close the latest version of `rule.event_name` and append its successor.
/// Both writes commit together or not at all.
pub fn supersede_latest(
  conn: &mut Connection,
  rule: NewRule,
  actor: &str,
  now: DateTime<Utc>,
) -> Result<EngagementRule> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let mut current = latest(&tx, &rule.event_name)?
    .ok_or_else(|| ruledesk_core::Error::RuleNotFound(rule.event_name.clone()))?;

  let next = current.successor(rule.fields, actor, now)?;
  current.close(now)?;

  // Close first: the partial unique index admits one latest row per name.
  write_status(&tx, &current)?;
  insert(&tx, &next)?;
  tx.commit()?;
  Ok(next)
}

pub fn set_active(
  conn: &mut Connection,
  event_name: &str,
  active: bool,
  actor: &str,
  now: DateTime<Utc>,
) -> Result<EngagementRule> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let mut current = latest(&tx, event_name)?
    .ok_or_else(|| ruledesk_core::Error::RuleNotFound(event_name.to_owned()))?;

  current.set_active(active, actor, now)?;
  write_status(&tx, &current)?;
  tx.commit()?;
  Ok(current)
}

pub fn delete(conn: &Connection, event_name: &str) -> Result<usize> {
  Ok(conn.execute(
    "DELETE FROM engagement_rules WHERE event_name = ?1",
    params![event_name],
  )?)
}
