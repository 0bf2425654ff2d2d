//! SQL schema for the Quill SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Catalog; written only by the seed process.
CREATE TABLE IF NOT EXISTS adventure_types (
    id          TEXT PRIMARY KEY,
    description TEXT NOT NULL,
    setting     TEXT             -- NULL lets the generator choose
);

CREATE TABLE IF NOT EXISTS adventures (
    id                TEXT PRIMARY KEY,
    active            INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL,   -- fixed-width RFC 3339 UTC
    last_modified     TEXT,            -- set when the adventure concludes
    adventure_type_id TEXT NOT NULL REFERENCES adventure_types(id)
);

-- Chapters are append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS chapters (
    id           TEXT PRIMARY KEY,
    adventure_id TEXT NOT NULL REFERENCES adventures(id),
    number       INTEGER NOT NULL CHECK (number >= 1),
    narrative    TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    UNIQUE (adventure_id, number)
);

CREATE TABLE IF NOT EXISTS chapter_choices (
    id         TEXT PRIMARY KEY,
    chapter_id TEXT NOT NULL REFERENCES chapters(id),
    position   INTEGER NOT NULL,   -- order offered by the generator
    action     TEXT NOT NULL,
    chosen     INTEGER NOT NULL DEFAULT 0,
    UNIQUE (chapter_id, position)
);

-- At most one chosen choice per chapter.
CREATE UNIQUE INDEX IF NOT EXISTS chapter_choices_chosen_idx
    ON chapter_choices(chapter_id) WHERE chosen = 1;

CREATE INDEX IF NOT EXISTS adventures_created_idx ON adventures(created_at);

-- Both flags move one way only.
CREATE TRIGGER IF NOT EXISTS chapter_choices_chosen_final
BEFORE UPDATE OF chosen ON chapter_choices
WHEN OLD.chosen = 1 AND NEW.chosen = 0
BEGIN
    SELECT RAISE(ABORT, 'a chosen choice cannot be unchosen');
END;

CREATE TRIGGER IF NOT EXISTS adventures_inactive_final
BEFORE UPDATE OF active ON adventures
WHEN OLD.active = 0 AND NEW.active = 1
BEGIN
    SELECT RAISE(ABORT, 'a concluded adventure cannot be reactivated');
END;

PRAGMA user_version = 1;
";
