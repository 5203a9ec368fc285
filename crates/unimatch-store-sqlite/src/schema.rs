//! SQL schema for the unimatch SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Connection-level settings; applied to every connection we open.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
";

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS profiles (
    identity    TEXT PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    age         INTEGER NOT NULL,
    gender      TEXT NOT NULL,            -- 'male' | 'female' | 'other'
    hobby       TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    picture_id  TEXT,
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL             -- fixed-width RFC 3339 UTC
);

-- Latest action per ordered pair; rewritten in place, never appended.
CREATE TABLE IF NOT EXISTS interactions (
    actor       TEXT NOT NULL REFERENCES profiles(identity) ON DELETE CASCADE,
    target      TEXT NOT NULL REFERENCES profiles(identity) ON DELETE CASCADE,
    action      TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (actor, target),
    CHECK (actor != target),
    CHECK (action IN ('like', 'dislike'))
);

-- One row per unordered pair, stored with first < second.
CREATE TABLE IF NOT EXISTS matches (
    match_id    TEXT PRIMARY KEY,
    first       TEXT NOT NULL REFERENCES profiles(identity) ON DELETE CASCADE,
    second      TEXT NOT NULL REFERENCES profiles(identity) ON DELETE CASCADE,
    created_at  TEXT NOT NULL,
    UNIQUE (first, second),
    CHECK  (first < second)
);

CREATE INDEX IF NOT EXISTS interactions_target_idx ON interactions(target);
CREATE INDEX IF NOT EXISTS matches_second_idx      ON matches(second);
CREATE INDEX IF NOT EXISTS matches_created_idx     ON matches(created_at);

PRAGMA user_version = 1;
";
