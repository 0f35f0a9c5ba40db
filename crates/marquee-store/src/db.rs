//! Connection management

use std::path::Path;

use rusqlite::Connection;

use crate::errors::{sqlite, Result};

pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(sqlite("open"))
}

pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(sqlite("open"))
}

/// Foreign keys on, WAL journal, and a busy timeout so a second process
/// waits for the writer instead of failing immediately
pub fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(sqlite("configure"))?;
    // journal_mode returns a row, so it cannot go through execute()
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .map_err(sqlite("configure"))?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(sqlite("configure"))?;
    Ok(())
}
