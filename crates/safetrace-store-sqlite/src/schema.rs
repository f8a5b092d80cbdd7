//! SQL schema for the SafeTrace SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS profiles (
    seq           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id       TEXT NOT NULL UNIQUE,
    display_name  TEXT NOT NULL,
    phone_number  TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- Alerts are never deleted. The only UPDATE ever issued moves a row out of
-- 'active', guarded by the current status.
CREATE TABLE IF NOT EXISTS alerts (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    alert_id        TEXT NOT NULL UNIQUE,
    user_id         TEXT,            -- NULL for anonymous submissions
    reporter_name   TEXT,
    reporter_phone  TEXT,
    latitude        REAL NOT NULL,
    longitude       REAL NOT NULL,
    message         TEXT NOT NULL,
    kind            TEXT NOT NULL,   -- 'sos' | 'tracking'
    session_id      TEXT,
    status          TEXT NOT NULL DEFAULT 'active'
                    CHECK (status IN ('active', 'resolved', 'cancelled')),
    created_at      TEXT NOT NULL,   -- RFC 3339 UTC, microseconds; store-assigned
    resolved_at     TEXT
);

CREATE TABLE IF NOT EXISTS contacts (
    contact_id    TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL,
    name          TEXT NOT NULL,
    phone_number  TEXT NOT NULL,
    relationship  TEXT,
    priority      INTEGER NOT NULL CHECK (priority >= 1),
    created_at    TEXT NOT NULL,
    UNIQUE (user_id, priority)
);

-- Append-only.
CREATE TABLE IF NOT EXISTS location_updates (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    location_id  TEXT NOT NULL UNIQUE,
    user_id      TEXT NOT NULL,
    latitude     REAL NOT NULL,
    longitude    REAL NOT NULL,
    accuracy     REAL,
    recorded_at  TEXT NOT NULL,
    alert_id     TEXT
);

CREATE INDEX IF NOT EXISTS alerts_user_idx     ON alerts(user_id);
CREATE INDEX IF NOT EXISTS alerts_created_idx  ON alerts(created_at);
CREATE INDEX IF NOT EXISTS locations_user_idx  ON location_updates(user_id);

PRAGMA user_version = 1;
";
