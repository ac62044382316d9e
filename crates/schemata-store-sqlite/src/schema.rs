//! SQL schema for the Schemata SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`.

/// Rows of the schema registry carry this kind. The table is shared, so
/// reads always filter on it.
pub const RECORD_KIND: &str = "custom";

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per (id, kind). Other kinds may share the table and need not
-- populate the schema columns.
CREATE TABLE IF NOT EXISTS records (
    record_id     TEXT    NOT NULL,   -- upper-cased name
    record_kind   TEXT    NOT NULL,
    name          TEXT    NOT NULL DEFAULT '',
    revision      INTEGER NOT NULL DEFAULT 0,
    managed       INTEGER NOT NULL DEFAULT 0,
    disabled      INTEGER NOT NULL DEFAULT 0,
    release       TEXT    NOT NULL DEFAULT '',   -- '' for user-defined rows
    description   TEXT    NOT NULL DEFAULT '',
    reference_url TEXT    NOT NULL DEFAULT '',
    spec          TEXT    NOT NULL DEFAULT '',
    created_at    TEXT    NOT NULL DEFAULT '',   -- ISO 8601 UTC
    updated_at    TEXT    NOT NULL DEFAULT '',
    PRIMARY KEY (record_id, record_kind)
);

PRAGMA user_version = 1;
";
