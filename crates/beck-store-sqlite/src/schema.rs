//! SQL schema for the beck SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id               TEXT PRIMARY KEY,   -- upstream user id
    display_name     TEXT NOT NULL,
    avatar_url       TEXT NOT NULL,
    last_active_time TEXT NOT NULL      -- RFC 3339 UTC; refresh watermark
);

-- One row per (user, subject); re-crawls overwrite in place.
CREATE TABLE IF NOT EXISTS activity_records (
    user_id     TEXT    NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    subject_id  TEXT    NOT NULL,
    category    INTEGER NOT NULL,   -- upstream subject type code
    status      INTEGER NOT NULL,   -- upstream collection type code
    recorded_at TEXT    NOT NULL,   -- RFC 3339 UTC
    rating      INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, subject_id)
);

CREATE INDEX IF NOT EXISTS records_recorded_idx ON activity_records(user_id, recorded_at);

PRAGMA user_version = 1;
";
