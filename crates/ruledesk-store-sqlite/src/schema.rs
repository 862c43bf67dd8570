//! SQL schema for the Ruledesk SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per rule version (SCD Type 2).
-- Rows are never updated except to close the latest version or to toggle its
-- activity.
CREATE TABLE IF NOT EXISTS engagement_rules (
    id             TEXT PRIMARY KEY,
    event_name     TEXT    NOT NULL,
    billing_type   TEXT    NOT NULL CHECK (billing_type IN ('CPX', 'CPE', 'CPVS')),
    tactic_field   TEXT,
    is_engagement  INTEGER NOT NULL CHECK (is_engagement IN (0, 1)),
    is_exposure    INTEGER NOT NULL CHECK (is_exposure IN (0, 1)),
    is_active      INTEGER NOT NULL CHECK (is_active IN (0, 1)),
    is_latest      INTEGER NOT NULL CHECK (is_latest IN (0, 1)),
    version        INTEGER NOT NULL CHECK (version >= 1),
    valid_from     TEXT    NOT NULL,   -- RFC 3339 UTC
    valid_to       TEXT,               -- NULL while latest
    created_at     TEXT    NOT NULL,
    updated_at     TEXT    NOT NULL,
    modified_by    TEXT    NOT NULL,
    inactivated_at TEXT,
    inactivated_by TEXT,
    UNIQUE (event_name, version),
    CHECK ((is_latest = 1) = (valid_to IS NULL)),
    CHECK (valid_to IS NULL OR valid_to >= valid_from),
    CHECK (
        (is_active = 1 AND inactivated_at IS NULL AND inactivated_by IS NULL)
        OR (is_active = 0 AND inactivated_at IS NOT NULL AND inactivated_by IS NOT NULL)
    )
);

-- At most one latest record per chain.
CREATE UNIQUE INDEX IF NOT EXISTS rules_one_latest_idx
    ON engagement_rules(event_name) WHERE is_latest = 1;
CREATE INDEX IF NOT EXISTS rules_event_latest_idx
    ON engagement_rules(event_name, is_latest);

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,   -- lower-case
    password_hash TEXT NOT NULL,          -- argon2 PHC string
    created_at    TEXT NOT NULL
);

-- Only the SHA-256 digest of a session token is stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_digest TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    expires_at   TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_user_idx ON sessions(user_id);

PRAGMA user_version = 1;
";
