use std::path::Path;

use crate::error::{Result, TaskNerdError};
use crate::model::TaskPatch;
use crate::store::Store;

pub fn run(
    db_path: &Path,
    id: u64,
    name: Option<String>,
    description: Option<String>,
    category: Option<String>,
) -> Result<()> {
    let patch = TaskPatch {
        title: name,
        description,
        category,
        status: None,
    };
    if patch.is_empty() {
        return Err(TaskNerdError::Validation(
            "at least one of --name, --description or --category is required".into(),
        ));
    }

    let store = Store::open(db_path)?;
    store.update_task(id, &patch)?;

    println!("Updated task {id}.");
    Ok(())
}
