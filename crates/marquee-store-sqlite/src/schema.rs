//! SQL schema for the Marquee SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id           TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    email             TEXT NOT NULL UNIQUE,   -- always lowercased
    rank_level        INTEGER NOT NULL DEFAULT 0,
    suspended         INTEGER NOT NULL DEFAULT 0,
    password_hash     TEXT,
    activation_digest TEXT,
    activated_at      TEXT,
    reset_digest      TEXT,
    reset_sent_at     TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    creator_id        TEXT REFERENCES users(user_id) ON DELETE SET NULL,
    updater_id        TEXT REFERENCES users(user_id) ON DELETE SET NULL,
    rank_assigned_by  TEXT REFERENCES users(user_id) ON DELETE SET NULL
);

-- The name is the natural key the association resolver looks up.
CREATE TABLE IF NOT EXISTS theatres (
    theatre_id TEXT PRIMARY KEY,
    name       TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    creator_id TEXT REFERENCES users(user_id) ON DELETE SET NULL,
    updater_id TEXT REFERENCES users(user_id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS productions (
    production_id      TEXT PRIMARY KEY,
    title              TEXT NOT NULL,
    url                TEXT NOT NULL,
    alphabetise        TEXT,
    first_date         TEXT,            -- YYYY-MM-DD
    press_date         TEXT,
    last_date          TEXT,
    press_date_wording TEXT,
    dates_tbc_note     TEXT,
    dates_note         TEXT,
    theatre_id         TEXT NOT NULL REFERENCES theatres(theatre_id) ON DELETE RESTRICT,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL,
    creator_id         TEXT REFERENCES users(user_id) ON DELETE SET NULL,
    updater_id         TEXT REFERENCES users(user_id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS users_rank_idx          ON users(rank_level);
CREATE INDEX IF NOT EXISTS productions_theatre_idx ON productions(theatre_id);

PRAGMA user_version = 1;
";
