//! The two status axes of a rule version.
//!
//! A version record is `Active` or `Inactive`, and independently `Latest` or
//! `Historical`. Only the latest record of a chain may change its activity;
//! historical records are frozen.
//!
//! On the wire both enums flatten into the flat column layout
//! (`isActive`/`inactivatedAt`/`inactivatedBy` and `isLatest`/`validTo`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

// ─── Activity ────────────────────────────────────────────────────────────────

/// Whether a rule is currently applied by downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ActivityColumns", try_from = "ActivityColumns")]
pub enum Activity {
  Active,
  Inactive {
    at: DateTime<Utc>,
    /// Email of the user who switched the rule off.
    by: String,
  },
}

impl Activity {
  pub fn is_active(&self) -> bool { matches!(self, Self::Active) }

  pub fn inactivated_at(&self) -> Option<DateTime<Utc>> {
    match self {
      Self::Active => None,
      Self::Inactive { at, .. } => Some(*at),
    }
  }

  pub fn inactivated_by(&self) -> Option<&str> {
    match self {
      Self::Active => None,
      Self::Inactive { by, .. } => Some(by),
    }
  }

  /// Rebuild from stored columns, rejecting combinations that break the
  /// `isActive` ⇔ `inactivated*` invariant.
  pub fn from_columns(
    is_active: bool,
    inactivated_at: Option<DateTime<Utc>>,
    inactivated_by: Option<String>,
  ) -> Result<Self, Error> {
    match (is_active, inactivated_at, inactivated_by) {
      (true, None, None) => Ok(Self::Active),
      (false, Some(at), Some(by)) => Ok(Self::Inactive { at, by }),
      (is_active, ..) => Err(Error::Validation(format!(
        "inconsistent inactivation columns for isActive={}",
        crate::flag::to_int(is_active)
      ))),
    }
  }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityColumns {
  #[serde(with = "crate::flag")]
  is_active:      bool,
  inactivated_at: Option<DateTime<Utc>>,
  inactivated_by: Option<String>,
}

impl From<Activity> for ActivityColumns {
  fn from(a: Activity) -> Self {
    match a {
      Activity::Active => Self {
        is_active:      true,
        inactivated_at: None,
        inactivated_by: None,
      },
      Activity::Inactive { at, by } => Self {
        is_active:      false,
        inactivated_at: Some(at),
        inactivated_by: Some(by),
      },
    }
  }
}

impl TryFrom<ActivityColumns> for Activity {
  type Error = Error;

  fn try_from(c: ActivityColumns) -> Result<Self, Error> {
    Activity::from_columns(c.is_active, c.inactivated_at, c.inactivated_by)
  }
}

// ─── Standing ────────────────────────────────────────────────────────────────

/// Position of a record within its version chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "StandingColumns", try_from = "StandingColumns")]
pub enum Standing {
  /// The currently effective version; `validTo` is open.
  Latest,
  /// Superseded at `valid_to`.
  Historical { valid_to: DateTime<Utc> },
}

impl Standing {
  pub fn is_latest(&self) -> bool { matches!(self, Self::Latest) }

  pub fn valid_to(&self) -> Option<DateTime<Utc>> {
    match self {
      Self::Latest => None,
      Self::Historical { valid_to } => Some(*valid_to),
    }
  }

  pub fn from_columns(
    is_latest: bool,
    valid_to: Option<DateTime<Utc>>,
  ) -> Result<Self, Error> {
    match (is_latest, valid_to) {
      (true, None) => Ok(Self::Latest),
      (false, Some(valid_to)) => Ok(Self::Historical { valid_to }),
      (true, Some(_)) => {
        Err(Error::Validation("latest record must not have validTo".into()))
      }
      (false, None) => {
        Err(Error::Validation("historical record is missing validTo".into()))
      }
    }
  }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StandingColumns {
  #[serde(with = "crate::flag")]
  is_latest: bool,
  valid_to:  Option<DateTime<Utc>>,
}

impl From<Standing> for StandingColumns {
  fn from(s: Standing) -> Self {
    Self { is_latest: s.is_latest(), valid_to: s.valid_to() }
  }
}

impl TryFrom<StandingColumns> for Standing {
  type Error = Error;

  fn try_from(c: StandingColumns) -> Result<Self, Error> {
    Standing::from_columns(c.is_latest, c.valid_to)
  }
}
