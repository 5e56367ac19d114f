use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskNerdError {
    #[error(
        "no task database found at {} (run `task-nerd init` or launch the TUI to create one)",
        .0.display()
    )]
    StoreNotFound(PathBuf),

    #[error("a task database already exists at {}", .0.display())]
    StoreExists(PathBuf),

    #[error("{} is not a task-nerd database", .0.display())]
    InvalidDatabase(PathBuf),

    #[error(
        "database schema version {found} is newer than the supported version {supported}; upgrade task-nerd"
    )]
    SchemaIncompatible { found: i64, supported: i64 },

    #[error("task {0} not found")]
    TaskNotFound(u64),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("database is busy (another process may be writing): {0}")]
    Locked(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Db(#[source] rusqlite::Error),
}

impl From<rusqlite::Error> for TaskNerdError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
                Self::Locked(err.to_string())
            }
            _ => Self::Db(err),
        }
    }
}

impl TaskNerdError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::StoreNotFound(_) => "store_not_found",
            Self::StoreExists(_) => "store_exists",
            Self::InvalidDatabase(_) => "invalid_database",
            Self::SchemaIncompatible { .. } => "schema_incompatible",
            Self::TaskNotFound(_) => "task_not_found",
            Self::Validation(_) => "validation_error",
            Self::Locked(_) => "storage_locked",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Db(_) => "db_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskNerdError>;
