//! Marquee Store - SQLite persistence for displays, device codes and rules
//!
//! - Connection helpers (`db`)
//! - Embedded, checksummed migrations
//! - `SqliteStore`, implementing every `marquee_core` repository trait

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

pub use errors::Result;
pub use repo::SqliteStore;
