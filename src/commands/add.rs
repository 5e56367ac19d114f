use std::path::Path;

use crate::error::Result;
use crate::model;
use crate::output;
use crate::store::{NewTask, Store};

pub fn run(db_path: &Path, title: String, description: Option<String>) -> Result<()> {
    let store = Store::open(db_path)?;
    let (title, category) = model::extract_category(&title);

    let task = store.insert_task(NewTask {
        title,
        description,
        category,
        after: None,
    })?;

    output::print_task(&task);
    Ok(())
}
