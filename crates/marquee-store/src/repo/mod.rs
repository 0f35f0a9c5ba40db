//! Repository implementations backed by SQLite

mod rows;
pub mod sqlite_repo;

pub use sqlite_repo::SqliteStore;
