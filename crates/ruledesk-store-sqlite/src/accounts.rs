//! Synchronous user and session queries.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};
use ruledesk_core::account::{NewSession, SessionUser, StoredCredentials, User};
use uuid::Uuid;

use crate::{
  Result,
  encode::{RawSessionUser, RawUser, decode_dt, encode_dt, encode_uuid},
};

pub fn create_user(
  conn: &mut Connection,
  email: String,
  password_hash: &str,
  now: DateTime<Utc>,
) -> Result<User> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let taken = tx
    .query_row("SELECT 1 FROM users WHERE email = ?1", params![email], |_| Ok(()))
    .optional()?
    .is_some();
  if taken {
    return Err(ruledesk_core::Error::EmailTaken(email).into());
  }

  let user = User { user_id: Uuid::new_v4(), email, created_at: now };
  tx.execute(
    "INSERT INTO users (user_id, email, password_hash, created_at)
     VALUES (?1, ?2, ?3, ?4)",
    params![
      encode_uuid(user.user_id),
      user.email,
      password_hash,
      encode_dt(user.created_at),
    ],
  )?;
  tx.commit()?;
  Ok(user)
}

pub fn find_credentials(conn: &Connection, email: &str) -> Result<Option<StoredCredentials>> {
  let raw = conn
    .query_row(
      "SELECT user_id, email, password_hash, created_at FROM users WHERE email = ?1",
      params![email],
      |row| {
        Ok(RawUser {
          user_id:       row.get(0)?,
          email:         row.get(1)?,
          password_hash: row.get(2)?,
          created_at:    row.get(3)?,
        })
      },
    )
    .optional()?;

  raw.map(RawUser::into_credentials).transpose()
}

pub fn start_session(
  conn: &mut Connection,
  session: &NewSession,
  now: DateTime<Utc>,
) -> Result<()> {
  let user_id = encode_uuid(session.user_id);
  let tx = conn.transaction()?;
  tx.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
  tx.execute(
    "INSERT INTO sessions (token_digest, user_id, expires_at, created_at)
     VALUES (?1, ?2, ?3, ?4)",
    params![
      session.token_digest,
      user_id,
      encode_dt(session.expires_at),
      encode_dt(now),
    ],
  )?;
  tx.commit()?;
  Ok(())
}

pub fn resolve_session(
  conn: &Connection,
  token_digest: &str,
  now: DateTime<Utc>,
) -> Result<Option<SessionUser>> {
  let raw = conn
    .query_row(
      "SELECT s.user_id, u.email, s.expires_at
       FROM sessions s
       JOIN users u ON u.user_id = s.user_id
       WHERE s.token_digest = ?1",
      params![token_digest],
      |row| {
        Ok(RawSessionUser {
          user_id:    row.get(0)?,
          email:      row.get(1)?,
          expires_at: row.get(2)?,
        })
      },
    )
    .optional()?;

  let Some(raw) = raw else { return Ok(None) };
  if decode_dt(&raw.expires_at)? <= now {
    return Ok(None);
  }
  raw.into_session_user().map(Some)
}

pub fn end_session(conn: &Connection, token_digest: &str) -> Result<()> {
  conn.execute(
    "DELETE FROM sessions WHERE token_digest = ?1",
    params![token_digest],
  )?;
  Ok(())
}

pub fn purge_expired(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
  Ok(conn.execute(
    "DELETE FROM sessions WHERE expires_at <= ?1",
    params![encode_dt(now)],
  )?)
}
