//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings with microsecond
//! precision and a `Z` suffix, so that lexical order equals time order. Flags
//! are stored as `0`/`1`. UUIDs are stored as hyphenated lowercase strings.

use std::str::FromStr as _;

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use ruledesk_core::{
  account::{SessionUser, StoredCredentials, User},
  flag,
  rule::{BillingType, EngagementRule},
  status::{Activity, Standing},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── Flags & enums ───────────────────────────────────────────────────────────

fn decode_flag(column: &'static str, value: i64) -> Result<bool> {
  flag::from_int(value).ok_or_else(|| Error::Corrupt {
    column,
    value: value.to_string(),
  })
}

fn decode_billing_type(s: &str) -> Result<BillingType> {
  BillingType::from_str(s).map_err(|_| Error::Corrupt {
    column: "billing_type",
    value:  s.to_owned(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawRule::from_row`].
pub const RULE_COLUMNS: &str = "id, event_name, billing_type, tactic_field, \
   is_engagement, is_exposure, is_active, is_latest, version, valid_from, \
   valid_to, created_at, updated_at, modified_by, inactivated_at, inactivated_by";

/// Raw values read directly from (or destined for) an `engagement_rules` row.
#[derive(Debug, Clone)]
pub struct RawRule {
  pub id:             String,
  pub event_name:     String,
  pub billing_type:   String,
  pub tactic_field:   Option<String>,
  pub is_engagement:  i64,
  pub is_exposure:    i64,
  pub is_active:      i64,
  pub is_latest:      i64,
  pub version:        i64,
  pub valid_from:     String,
  pub valid_to:       Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
  pub modified_by:    String,
  pub inactivated_at: Option<String>,
  pub inactivated_by: Option<String>,
}

impl RawRule {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      event_name:     row.get(1)?,
      billing_type:   row.get(2)?,
      tactic_field:   row.get(3)?,
      is_engagement:  row.get(4)?,
      is_exposure:    row.get(5)?,
      is_active:      row.get(6)?,
      is_latest:      row.get(7)?,
      version:        row.get(8)?,
      valid_from:     row.get(9)?,
      valid_to:       row.get(10)?,
      created_at:     row.get(11)?,
      updated_at:     row.get(12)?,
      modified_by:    row.get(13)?,
      inactivated_at: row.get(14)?,
      inactivated_by: row.get(15)?,
    })
  }

  pub fn encode(rule: &EngagementRule) -> Self {
    Self {
      id:             encode_uuid(rule.id),
      event_name:     rule.event_name.clone(),
      billing_type:   rule.billing_type.as_ref().to_owned(),
      tactic_field:   rule.tactic_field.clone(),
      is_engagement:  flag::to_int(rule.is_engagement),
      is_exposure:    flag::to_int(rule.is_exposure),
      is_active:      flag::to_int(rule.activity.is_active()),
      is_latest:      flag::to_int(rule.standing.is_latest()),
      version:        i64::from(rule.version),
      valid_from:     encode_dt(rule.valid_from),
      valid_to:       rule.standing.valid_to().map(encode_dt),
      created_at:     encode_dt(rule.created_at),
      updated_at:     encode_dt(rule.updated_at),
      modified_by:    rule.modified_by.clone(),
      inactivated_at: rule.activity.inactivated_at().map(encode_dt),
      inactivated_by: rule.activity.inactivated_by().map(str::to_owned),
    }
  }

  pub fn into_rule(self) -> Result<EngagementRule> {
    let activity = Activity::from_columns(
      decode_flag("is_active", self.is_active)?,
      decode_opt_dt(self.inactivated_at.as_deref())?,
      self.inactivated_by,
    )
    .map_err(|e| Error::Corrupt { column: "is_active", value: e.to_string() })?;

    let standing = Standing::from_columns(
      decode_flag("is_latest", self.is_latest)?,
      decode_opt_dt(self.valid_to.as_deref())?,
    )
    .map_err(|e| Error::Corrupt { column: "is_latest", value: e.to_string() })?;

    let version = u32::try_from(self.version).map_err(|_| Error::Corrupt {
      column: "version",
      value:  self.version.to_string(),
    })?;

    Ok(EngagementRule {
      id: decode_uuid(&self.id)?,
      event_name: self.event_name,
      billing_type: decode_billing_type(&self.billing_type)?,
      tactic_field: self.tactic_field,
      is_engagement: decode_flag("is_engagement", self.is_engagement)?,
      is_exposure: decode_flag("is_exposure", self.is_exposure)?,
      activity,
      standing,
      version,
      valid_from: decode_dt(&self.valid_from)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      modified_by: self.modified_by,
    })
  }
}

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub email:         String,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawUser {
  pub fn into_credentials(self) -> Result<StoredCredentials> {
    Ok(StoredCredentials {
      user:          User {
        user_id:    decode_uuid(&self.user_id)?,
        email:      self.email,
        created_at: decode_dt(&self.created_at)?,
      },
      password_hash: self.password_hash,
    })
  }
}

/// A `sessions` row joined with its owner's email.
pub struct RawSessionUser {
  pub user_id:    String,
  pub email:      String,
  pub expires_at: String,
}

impl RawSessionUser {
  pub fn into_session_user(self) -> Result<SessionUser> {
    Ok(SessionUser {
      user_id:    decode_uuid(&self.user_id)?,
      email:      self.email,
      expires_at: decode_dt(&self.expires_at)?,
    })
  }
}
