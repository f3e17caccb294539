use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_model_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(MODEL_SQL)?;
    Ok(())
}

pub fn init_store_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(STORE_SQL)?;
    Ok(())
}

const MODEL_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS categories (
    category TEXT PRIMARY KEY,
    allows_bound_fields INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS items (
    item_id TEXT PRIMARY KEY,
    category TEXT NOT NULL REFERENCES categories (category)
);
CREATE INDEX IF NOT EXISTS idx_items_category ON items (category);

CREATE TABLE IF NOT EXISTS item_fields (
    item_id TEXT NOT NULL REFERENCES items (item_id),
    name TEXT NOT NULL,
    field_type TEXT NOT NULL,
    read_only INTEGER NOT NULL DEFAULT 0,
    value BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_item_fields_name ON item_fields (item_id, name);

CREATE TABLE IF NOT EXISTS bindings (
    definition_id TEXT NOT NULL,
    name TEXT NOT NULL,
    field_type TEXT NOT NULL,
    display_group TEXT NOT NULL,
    category TEXT NOT NULL REFERENCES categories (category),
    PRIMARY KEY (definition_id, category)
);
CREATE INDEX IF NOT EXISTS idx_bindings_name ON bindings (name, category);

CREATE TABLE IF NOT EXISTS bound_values (
    item_id TEXT NOT NULL REFERENCES items (item_id),
    definition_id TEXT NOT NULL,
    value BLOB NOT NULL,
    PRIMARY KEY (item_id, definition_id)
);
";

const STORE_SQL: &str = "
CREATE TABLE IF NOT EXISTS groups (
    name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS definitions (
    definition_id TEXT NOT NULL UNIQUE,
    group_name TEXT NOT NULL REFERENCES groups (name),
    name TEXT NOT NULL,
    field_type TEXT NOT NULL,
    PRIMARY KEY (group_name, name)
);
";
