//! Error types for `ruledesk-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0}")]
  Validation(String),

  #[error("Rule not found: {0}")]
  RuleNotFound(String),

  #[error("A rule with this eventName already exists: {0}")]
  RuleExists(String),

  /// Only the latest version of a rule chain may change.
  #[error("version {version} of {event_name} is historical and cannot change")]
  HistoricalRecord { event_name: String, version: u32 },

  #[error("An account with that email already exists")]
  EmailTaken(String),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Validation(_) => ErrorKind::Validation,
      Self::RuleNotFound(_) => ErrorKind::NotFound,
      Self::RuleExists(_) | Self::HistoricalRecord { .. } | Self::EmailTaken(_) => {
        ErrorKind::Conflict
      }
    }
  }
}

/// Coarse classification used by the HTTP boundary to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Validation,
  NotFound,
  Conflict,
  /// Connectivity, transaction, or decoding failure. Not locally recoverable.
  Storage,
}

/// Implemented by every store backend's error type.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn kind(&self) -> ErrorKind;
}

impl StoreError for Error {
  fn kind(&self) -> ErrorKind { Error::kind(self) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
