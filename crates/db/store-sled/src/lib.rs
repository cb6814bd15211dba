//! Sled-backed storage engine for the proof task scheduler.

mod config;
mod init;
pub mod macros;
pub mod task;
mod utils;

pub use config::SledDbConfig;
pub use init::open_task_database;
pub use task::db::TaskDBSled;
