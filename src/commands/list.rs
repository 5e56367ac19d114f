use std::path::Path;

use crate::error::Result;
use crate::model::Status;
use crate::output;
use crate::query::{self, Query};
use crate::store::{Store, TaskFilter};

/// Print tasks in display order: uncategorized first, then by category.
pub fn run(db_path: &Path, status: Option<Status>, json: bool) -> Result<()> {
    let store = Store::open(db_path)?;
    let tasks = store.list_tasks(&TaskFilter {
        status,
        ..TaskFilter::default()
    })?;

    let view = query::filter_tasks(&tasks, &Query::default());
    output::print_tasks(view.tasks().map(|m| m.task), json)
}
