use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params, params_from_iter};

use crate::error::{Result, TaskNerdError};
use crate::model::{self, Status, Task, TaskPatch};
use crate::store::migration;

const TASK_COLUMNS: &str =
    "id, title, description, status, category, created_at, updated_at, completed_at";

/// Structured filter for `Store::list_tasks`. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<Status>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Insert directly after this task instead of at the end.
    pub after: Option<u64>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open an existing database, migrating it to the current schema.
    /// Never creates the file.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TaskNerdError::StoreNotFound(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        configure(&conn)?;

        match migration::table_exists(&conn, "tasks") {
            Ok(true) => {}
            Ok(false) | Err(TaskNerdError::Db(_)) => {
                return Err(TaskNerdError::InvalidDatabase(path.to_path_buf()));
            }
            Err(other) => return Err(other),
        }

        let applied = migration::migrate(&conn)?;
        if !applied.is_empty() {
            log::info!(
                "migrated {} to schema v{}",
                path.display(),
                migration::CURRENT_SCHEMA_VERSION
            );
        }
        log::debug!("opened task store at {}", path.display());

        Ok(Self { conn })
    }

    /// Create a new database file with the current schema.
    pub fn initialize(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(TaskNerdError::StoreExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        configure(&conn)?;
        migration::create_schema(&conn)?;
        log::info!("created task store at {}", path.display());

        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migration::create_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> Result<Option<i64>> {
        migration::stored_version(&self.conn)
    }

    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut clauses = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(status) = filter.status {
            values.push(status.to_string());
            clauses.push(format!("status = ?{}", values.len()));
        }
        if let Some(category) = &filter.category {
            values.push(category.clone());
            clauses.push(format!("category = ?{}", values.len()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks {where_clause} ORDER BY position, id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), task_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn get_task(&self, id: u64) -> Result<Task> {
        self.conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                task_from_row,
            )
            .optional()?
            .ok_or(TaskNerdError::TaskNotFound(id))
    }

    pub fn insert_task(&self, new: NewTask) -> Result<Task> {
        let title = model::validate_title(&new.title)?;
        let description = model::non_blank(new.description.as_deref());
        let category = model::non_blank(new.category.as_deref());
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.unchecked_transaction()?;

        let position: i64 = match new.after {
            Some(after) => {
                let anchor: i64 = tx
                    .query_row(
                        "SELECT position FROM tasks WHERE id = ?1",
                        params![after],
                        |row| row.get(0),
                    )
                    .optional()?
                    .ok_or(TaskNerdError::TaskNotFound(after))?;
                tx.execute(
                    "UPDATE tasks SET position = position + 1 WHERE position > ?1",
                    params![anchor],
                )?;
                anchor + 1
            }
            None => tx.query_row(
                "SELECT COALESCE(MAX(position), 0) + 1 FROM tasks",
                [],
                |row| row.get(0),
            )?,
        };

        tx.execute(
            "INSERT INTO tasks (title, description, status, category, position, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                title,
                description,
                Status::Pending.as_str(),
                category,
                position,
                &now
            ],
        )?;
        let id = tx.last_insert_rowid() as u64;
        tx.commit()?;

        log::debug!("inserted task {id} at position {position}");
        self.get_task(id)
    }

    /// Apply only the fields present in `patch`.
    pub fn update_task(&self, id: u64, patch: &TaskPatch) -> Result<Task> {
        let next = self.modify_task(id, |current| model::apply_patch(current, patch, Utc::now()))?;
        log::debug!("updated task {id}");
        Ok(next)
    }

    /// Flip pending/completed.
    pub fn toggle_task(&self, id: u64) -> Result<Task> {
        let next = self.modify_task(id, |current| Ok(model::toggle_status(current, Utc::now())))?;
        log::debug!("toggled task {id} to {}", next.status);
        Ok(next)
    }

    /// Read, transform and write back one row inside a transaction.
    fn modify_task(&self, id: u64, change: impl FnOnce(&Task) -> Result<Task>) -> Result<Task> {
        let tx = self.conn.unchecked_transaction()?;

        let current = tx
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                task_from_row,
            )
            .optional()?
            .ok_or(TaskNerdError::TaskNotFound(id))?;
        let next = change(&current)?;

        tx.execute(
            "UPDATE tasks
             SET title = ?2, description = ?3, status = ?4, category = ?5, updated_at = ?6, completed_at = ?7
             WHERE id = ?1",
            params![
                id,
                next.title,
                next.description,
                next.status.as_str(),
                next.category,
                next.updated_at.to_rfc3339(),
                next.completed_at.map(|at| at.to_rfc3339())
            ],
        )?;
        tx.commit()?;
        Ok(next)
    }

    pub fn delete_task(&self, id: u64) -> Result<()> {
        let changes = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if changes == 0 {
            return Err(TaskNerdError::TaskNotFound(id));
        }
        log::debug!("deleted task {id}");
        Ok(())
    }

    pub fn set_status(&self, id: u64, status: Status) -> Result<Task> {
        let patch = TaskPatch {
            status: Some(status),
            ..TaskPatch::default()
        };
        let next = self.modify_task(id, |current| model::apply_patch(current, &patch, Utc::now()))?;
        log::debug!("set task {id} to {status}");
        Ok(next)
    }
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA busy_timeout=5000;")?;
    Ok(())
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(3)?;
    let status = status
        .parse::<Status>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(err)))?;
    let description: Option<String> = row.get(2)?;
    let category: Option<String> = row.get(4)?;

    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: model::non_blank(description.as_deref()),
        status,
        category: model::non_blank(category.as_deref()),
        created_at: parse_timestamp(row, 5)?,
        updated_at: parse_timestamp(row, 6)?,
        completed_at: row
            .get::<_, Option<String>>(7)?
            .map(|raw| parse_raw_timestamp(&raw, 7))
            .transpose()?,
    })
}

/// Accepts RFC 3339 and SQLite's `datetime('now')` layout, which older
/// databases used for their defaults.
fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_raw_timestamp(&raw, idx)
}

fn parse_raw_timestamp(raw: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn seeded() -> Store {
        let store = Store::open_memory().unwrap();
        store.insert_task(NewTask::titled("first")).unwrap();
        store.insert_task(NewTask::titled("second")).unwrap();
        store.insert_task(NewTask::titled("third")).unwrap();
        store
    }

    fn titles(store: &Store) -> Vec<String> {
        store
            .list_tasks(&TaskFilter::default())
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect()
    }

    #[test]
    fn insert_then_read_back_round_trips() {
        let store = Store::open_memory().unwrap();
        let created = store
            .insert_task(NewTask {
                title: "  fix login bug ".into(),
                description: Some("users get logged out".into()),
                category: Some("auth".into()),
                after: None,
            })
            .unwrap();

        let read = store.get_task(created.id).unwrap();
        assert_eq!(read, created);
        assert_eq!(read.title, "fix login bug");
        assert_eq!(read.description.as_deref(), Some("users get logged out"));
        assert_eq!(read.status, Status::Pending);
        assert_eq!(read.category.as_deref(), Some("auth"));
    }

    #[test]
    fn insert_rejects_blank_title() {
        let store = Store::open_memory().unwrap();
        let err = store.insert_task(NewTask::titled("   ")).unwrap_err();
        assert!(matches!(err, TaskNerdError::Validation(_)));
        assert_eq!(titles(&store).len(), 0);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let store = seeded();
        assert_eq!(titles(&store), vec!["first", "second", "third"]);
        assert_eq!(titles(&store), titles(&store));
    }

    #[test]
    fn insert_after_shifts_later_rows() {
        let store = seeded();
        let first = store.list_tasks(&TaskFilter::default()).unwrap()[0].clone();

        store
            .insert_task(NewTask {
                after: Some(first.id),
                ..NewTask::titled("between")
            })
            .unwrap();

        assert_eq!(titles(&store), vec!["first", "between", "second", "third"]);
    }

    #[test]
    fn insert_after_missing_task_fails() {
        let store = seeded();
        let err = store
            .insert_task(NewTask {
                after: Some(99),
                ..NewTask::titled("orphan")
            })
            .unwrap_err();
        assert!(matches!(err, TaskNerdError::TaskNotFound(99)));
        assert_eq!(titles(&store).len(), 3);
    }

    #[test]
    fn update_applies_only_given_fields() {
        let store = seeded();
        let before = store.get_task(2).unwrap();

        let after = store
            .update_task(
                2,
                &TaskPatch {
                    category: Some("home".into()),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        assert_eq!(after.title, before.title);
        assert_eq!(after.description, before.description);
        assert_eq!(after.status, before.status);
        assert_eq!(after.category.as_deref(), Some("home"));
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(store.get_task(2).unwrap(), after);
    }

    #[test]
    fn update_missing_task_is_not_found() {
        let store = seeded();
        let err = store
            .update_task(
                42,
                &TaskPatch {
                    title: Some("x".into()),
                    ..TaskPatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, TaskNerdError::TaskNotFound(42)));
    }

    #[test]
    fn update_with_blank_title_leaves_row_untouched() {
        let store = seeded();
        let before = store.get_task(1).unwrap();
        let err = store
            .update_task(
                1,
                &TaskPatch {
                    title: Some(" ".into()),
                    ..TaskPatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, TaskNerdError::Validation(_)));
        assert_eq!(store.get_task(1).unwrap(), before);
    }

    #[test]
    fn delete_missing_id_is_not_found_twice() {
        let store = seeded();
        store.delete_task(2).unwrap();

        let err = store.delete_task(2).unwrap_err();
        assert!(matches!(err, TaskNerdError::TaskNotFound(2)));
        let err = store.delete_task(77).unwrap_err();
        assert!(matches!(err, TaskNerdError::TaskNotFound(77)));
        assert_eq!(titles(&store).len(), 2);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let store = seeded();
        store.delete_task(3).unwrap();
        let next = store.insert_task(NewTask::titled("fourth")).unwrap();
        assert_eq!(next.id, 4);
    }

    #[test]
    fn set_status_and_filter_by_status() {
        let store = seeded();
        let done = store.set_status(1, Status::Completed).unwrap();
        assert_eq!(done.status, Status::Completed);

        let completed = store
            .list_tasks(&TaskFilter {
                status: Some(Status::Completed),
                ..TaskFilter::default()
            })
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, 1);

        let err = store.set_status(9, Status::Pending).unwrap_err();
        assert!(matches!(err, TaskNerdError::TaskNotFound(9)));
    }

    #[test]
    fn toggle_stamps_completion_and_edits_keep_it() {
        let store = seeded();

        let done = store.toggle_task(2).unwrap();
        assert_eq!(done.status, Status::Completed);
        let stamped = done.completed_at.unwrap();
        assert_eq!(store.get_task(2).unwrap(), done);

        let renamed = store
            .update_task(
                2,
                &TaskPatch {
                    title: Some("second, renamed".into()),
                    ..TaskPatch::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.completed_at, Some(stamped));

        let reopened = store.toggle_task(2).unwrap();
        assert_eq!(reopened.status, Status::Pending);
        assert_eq!(store.get_task(2).unwrap().completed_at, None);

        let err = store.toggle_task(99).unwrap_err();
        assert!(matches!(err, TaskNerdError::TaskNotFound(99)));
    }

    #[test]
    fn write_blocked_by_another_connection_is_locked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        let store = Store::initialize(&path).unwrap();
        store.insert_task(NewTask::titled("contended")).unwrap();
        store.conn.busy_timeout(Duration::from_millis(50)).unwrap();

        let other = Connection::open(&path).unwrap();
        other.execute_batch("BEGIN IMMEDIATE;").unwrap();

        let err = store.delete_task(1).unwrap_err();
        assert!(matches!(err, TaskNerdError::Locked(_)), "got {err:?}");
        assert_eq!(err.code(), "storage_locked");
        let err = store.insert_task(NewTask::titled("blocked")).unwrap_err();
        assert!(matches!(err, TaskNerdError::Locked(_)), "got {err:?}");

        other.execute_batch("ROLLBACK;").unwrap();
        store.delete_task(1).unwrap();
        assert_eq!(titles(&store).len(), 0);
    }

    #[test]
    fn open_recovers_from_empty_version_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        {
            let store = Store::initialize(&path).unwrap();
            store.insert_task(NewTask::titled("survivor")).unwrap();
            store.conn.execute("DELETE FROM schema_version", []).unwrap();
        }

        let store = Store::open(&path).unwrap();
        assert_eq!(store.schema_version().unwrap(), Some(migration::CURRENT_SCHEMA_VERSION));
        assert_eq!(titles(&store), vec!["survivor"]);
    }

    #[test]
    fn filter_by_category() {
        let store = seeded();
        store
            .insert_task(NewTask {
                category: Some("auth".into()),
                ..NewTask::titled("rotate keys")
            })
            .unwrap();

        let auth = store
            .list_tasks(&TaskFilter {
                category: Some("auth".into()),
                ..TaskFilter::default()
            })
            .unwrap();
        assert_eq!(auth.len(), 1);
        assert_eq!(auth[0].title, "rotate keys");
    }

    #[test]
    fn open_missing_file_is_store_not_found_and_creates_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.db");

        let err = Store::open(&path).err().unwrap();
        assert!(matches!(err, TaskNerdError::StoreNotFound(_)));
        assert!(!path.exists());
    }

    #[test]
    fn open_garbage_file_is_invalid_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        std::fs::write(&path, "definitely not sqlite, just some text padding it out").unwrap();

        let err = Store::open(&path).err().unwrap();
        assert!(matches!(err, TaskNerdError::InvalidDatabase(_)));
    }

    #[test]
    fn open_foreign_sqlite_file_is_invalid_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("other.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY);")
            .unwrap();

        let err = Store::open(&path).err().unwrap();
        assert!(matches!(err, TaskNerdError::InvalidDatabase(_)));
    }

    #[test]
    fn initialize_refuses_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        Store::initialize(&path).unwrap();

        let err = Store::initialize(&path).err().unwrap();
        assert!(matches!(err, TaskNerdError::StoreExists(_)));
    }

    #[test]
    fn reopen_sees_writes_from_earlier_connection() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.db");

        let created = {
            let store = Store::initialize(&path).unwrap();
            store.insert_task(NewTask::titled("persisted")).unwrap()
        };

        let store = Store::open(&path).unwrap();
        assert_eq!(store.schema_version().unwrap(), Some(migration::CURRENT_SCHEMA_VERSION));
        assert_eq!(store.get_task(created.id).unwrap(), created);
    }

    #[test]
    fn open_rejects_newer_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        Store::initialize(&path).unwrap();
        Connection::open(&path)
            .unwrap()
            .execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (99, 'later')",
                [],
            )
            .unwrap();

        let err = Store::open(&path).err().unwrap();
        assert!(matches!(err, TaskNerdError::SchemaIncompatible { found: 99, .. }));
    }

    #[test]
    fn legacy_timestamps_are_readable() {
        let store = Store::open_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO tasks (title, status, position, created_at, updated_at)
                 VALUES ('old', 'pending', 1, '2024-03-01 09:30:00', '2024-03-01 09:30:00')",
                [],
            )
            .unwrap();

        let task = store.get_task(1).unwrap();
        assert_eq!(task.created_at.to_rfc3339(), "2024-03-01T09:30:00+00:00");
    }
}
