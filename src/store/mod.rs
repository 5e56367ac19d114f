pub mod migration;
pub mod tasks;

pub use migration::CURRENT_SCHEMA_VERSION;
pub use tasks::{NewTask, Store, TaskFilter};
