//! Database schema initialization

use rusqlite::{params, OptionalExtension};

use super::sqlite::SCHEMA_VERSION;
use super::{RemoteError, RemoteResult};

/// Create tables if missing and check the stored schema version
pub(super) fn init_schema(conn: &rusqlite::Connection) -> RemoteResult<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        -- Recipes; ingredients and steps are JSON arrays
        CREATE TABLE IF NOT EXISTS recipes (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            base_servings INTEGER NOT NULL,
            emoji TEXT NOT NULL,
            ingredients TEXT NOT NULL DEFAULT '[]',
            steps TEXT NOT NULL DEFAULT '[]',
            color TEXT NOT NULL,
            category TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_recipes_created ON recipes(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_recipes_category ON recipes(category);
        "#,
    )?;

    let stored: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .optional()?
        .flatten();

    match stored {
        None => {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
            Ok(())
        }
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        // Durable data: never drop tables on mismatch
        Some(found) => Err(RemoteError::SchemaVersion {
            found,
            expected: SCHEMA_VERSION,
        }),
    }
}
