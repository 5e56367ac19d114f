use std::path::Path;

use crate::error::Result;
use crate::store::Store;

pub fn run(db_path: &Path) -> Result<()> {
    Store::initialize(db_path)?;
    eprintln!("Created task database at {}", db_path.display());
    Ok(())
}
