//! Boolean flags carried as the integers `0`/`1`.
//!
//! Rule records expose `isEngagement`, `isExposure`, `isActive` and
//! `isLatest` as numbers on the wire and in the database. Use with
//! `#[serde(with = "crate::flag")]`.

use serde::{
  Deserialize, Deserializer, Serializer,
  de::{Error as _, IgnoredAny},
};

pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_u8(to_int(*value) as u8)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
  let raw = i64::deserialize(deserializer)?;
  from_int(raw).ok_or_else(|| D::Error::custom(format!("expected 0 or 1, got {raw}")))
}

/// `0` → `false`, `1` → `true`; anything else is not a flag.
pub fn from_int(value: i64) -> Option<bool> {
  match value {
    0 => Some(false),
    1 => Some(true),
    _ => None,
  }
}

pub fn to_int(value: bool) -> i64 { i64::from(value) }

/// A flag as submitted by a client. Any JSON value is accepted so that a
/// `true` or `"1"` reaches validation instead of failing deserialisation.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum FlagInput {
  Int(i64),
  Other(IgnoredAny),
}

impl FlagInput {
  /// The flag's value, if the input was `0` or `1`.
  pub fn to_bool(self) -> Option<bool> {
    match self {
      Self::Int(value) => from_int(value),
      Self::Other(_) => None,
    }
  }
}
