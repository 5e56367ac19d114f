use std::path::Path;

use crate::error::Result;
use crate::model::Status;
use crate::store::Store;

pub fn run(db_path: &Path, id: u64, status: Status) -> Result<()> {
    let store = Store::open(db_path)?;
    let task = store.set_status(id, status)?;

    println!("Marked task {} as {}.", task.id, task.status);
    Ok(())
}
