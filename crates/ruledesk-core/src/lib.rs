//! Core types and trait definitions for the Ruledesk rule store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod account;
pub mod error;
pub mod flag;
pub mod rule;
pub mod status;
pub mod store;

pub use error::{Error, ErrorKind, Result, StoreError};
