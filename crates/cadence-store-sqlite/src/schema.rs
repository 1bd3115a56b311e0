//! SQL schema for the Cadence SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS habits (
    habit_id        TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    description     TEXT,
    kind            TEXT NOT NULL,   -- 'hourly' | 'daily' | 'weekly' | 'monthly' | 'yearly'
    time_of_day     TEXT NOT NULL,   -- HH:MM:SS, habit-local
    weekday         TEXT,            -- weekly only
    day_of_month    INTEGER,         -- monthly / yearly
    month           INTEGER,         -- yearly only
    daily_times     TEXT NOT NULL DEFAULT '[]',
    grace_minutes   INTEGER NOT NULL DEFAULT 30,
    time_zone       TEXT NOT NULL DEFAULT 'UTC',
    archived        INTEGER NOT NULL DEFAULT 0,
    last_checked    TEXT,
    missed_count    INTEGER NOT NULL DEFAULT 0,
    current_streak  INTEGER NOT NULL DEFAULT 0,
    best_streak     INTEGER NOT NULL DEFAULT 0,
    last_completed  TEXT,            -- habit-local date
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    CHECK (current_streak <= best_streak)
);

-- At most one occurrence per (habit, scheduled instant).
CREATE TABLE IF NOT EXISTS occurrences (
    occurrence_id             TEXT PRIMARY KEY,
    habit_id                  TEXT NOT NULL REFERENCES habits(habit_id),
    scheduled_at              TEXT NOT NULL,   -- fixed-width RFC 3339 UTC
    status                    TEXT NOT NULL DEFAULT 'pending',
    completed_at              TEXT,
    missed_at                 TEXT,
    completed_in_grace_period INTEGER NOT NULL DEFAULT 0,
    notified                  INTEGER NOT NULL DEFAULT 0,
    time_zone                 TEXT NOT NULL,
    created_at                TEXT NOT NULL,   -- habit-local offset
    updated_at                TEXT NOT NULL,
    UNIQUE (habit_id, scheduled_at)
);

CREATE INDEX IF NOT EXISTS habits_archived_idx        ON habits(archived);
CREATE INDEX IF NOT EXISTS occurrences_scheduled_idx  ON occurrences(scheduled_at);
CREATE INDEX IF NOT EXISTS occurrences_status_idx     ON occurrences(habit_id, status, scheduled_at);

PRAGMA user_version = 1;
";
