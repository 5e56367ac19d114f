use std::path::Path;

use crate::error::Result;
use crate::store::Store;

pub fn run(db_path: &Path, id: u64) -> Result<()> {
    let store = Store::open(db_path)?;
    store.delete_task(id)?;

    println!("Deleted task {id}.");
    Ok(())
}
