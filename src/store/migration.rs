use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{Result, TaskNerdError};

pub const CURRENT_SCHEMA_VERSION: i64 = 4;

/// Databases created before version tracking existed.
const UNVERSIONED_SCHEMA_VERSION: i64 = 1;

struct Migration {
    version: i64,
    description: &'static str,
    apply: fn(&Connection) -> Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 2,
        description: "add category column",
        apply: add_category_column,
    },
    Migration {
        version: 3,
        description: "add position column and normalize status values",
        apply: add_position_column,
    },
    Migration {
        version: 4,
        description: "add completed_at column",
        apply: add_completed_at_column,
    },
];

/// Create the current schema in an empty database.
pub fn create_schema(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            category TEXT,
            position INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            completed_at TEXT
        );
        CREATE INDEX idx_tasks_position ON tasks(position);
        CREATE TABLE schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )?;
    record_version(&tx, CURRENT_SCHEMA_VERSION)?;
    tx.commit()?;
    Ok(())
}

/// Stored schema version, or `None` when the database predates version
/// tracking (no `schema_version` table, or an empty one).
pub fn stored_version(conn: &Connection) -> Result<Option<i64>> {
    if !table_exists(conn, "schema_version")? {
        return Ok(None);
    }
    let version: Option<i64> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        })
        .optional()?
        .flatten();
    Ok(version)
}

/// Bring the database up to `CURRENT_SCHEMA_VERSION`, returning the versions
/// that were applied. All steps commit together or not at all.
pub fn migrate(conn: &Connection) -> Result<Vec<i64>> {
    let stored = stored_version(conn)?;
    let found = stored.unwrap_or(UNVERSIONED_SCHEMA_VERSION);

    if found > CURRENT_SCHEMA_VERSION {
        return Err(TaskNerdError::SchemaIncompatible {
            found,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }
    if stored.is_some() && found == CURRENT_SCHEMA_VERSION {
        return Ok(vec![]);
    }

    let tx = conn.unchecked_transaction()?;
    if !table_exists(&tx, "schema_version")? {
        tx.execute_batch(
            "CREATE TABLE schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );",
        )?;
    }
    if stored.is_none() {
        record_version(&tx, UNVERSIONED_SCHEMA_VERSION)?;
    }

    let mut applied = Vec::new();
    for step in MIGRATIONS.iter().filter(|step| step.version > found) {
        log::info!(
            "applying schema migration v{}: {}",
            step.version,
            step.description
        );
        (step.apply)(&tx)?;
        record_version(&tx, step.version)?;
        applied.push(step.version);
    }

    tx.commit()?;
    Ok(applied)
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        params![table],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|name| name == column))
}

fn record_version(conn: &Connection, version: i64) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        params![version, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn add_category_column(conn: &Connection) -> Result<()> {
    if !column_exists(conn, "tasks", "category")? {
        conn.execute_batch("ALTER TABLE tasks ADD COLUMN category TEXT DEFAULT NULL;")?;
    }
    Ok(())
}

fn add_position_column(conn: &Connection) -> Result<()> {
    if !column_exists(conn, "tasks", "position")? {
        conn.execute_batch(
            "ALTER TABLE tasks ADD COLUMN position INTEGER NOT NULL DEFAULT 0;
             UPDATE tasks SET position = id;",
        )?;
    }
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_tasks_position ON tasks(position);
         UPDATE tasks SET status = 'pending' WHERE status = 'in_progress';
         UPDATE tasks SET status = 'completed' WHERE status = 'cancelled';
         UPDATE tasks SET description = NULL WHERE description = '';",
    )?;
    Ok(())
}

fn add_completed_at_column(conn: &Connection) -> Result<()> {
    if !column_exists(conn, "tasks", "completed_at")? {
        conn.execute_batch(
            "ALTER TABLE tasks ADD COLUMN completed_at TEXT;
             UPDATE tasks SET completed_at = updated_at WHERE status = 'completed';",
        )?;
    }
    Ok(())
}
