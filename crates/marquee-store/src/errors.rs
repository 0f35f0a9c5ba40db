//! Translation of SQLite failures into `MarqueeError`

use marquee_core::errors::MarqueeError;
use rusqlite::ffi;

pub type Result<T> = std::result::Result<T, MarqueeError>;

/// Map a rusqlite error raised while running `op`
///
/// UNIQUE / PRIMARY KEY violations become `AlreadyExists`; everything else
/// is `Persistence` with the driver message preserved.
pub fn from_rusqlite(op: &str, err: rusqlite::Error) -> MarqueeError {
    if let rusqlite::Error::SqliteFailure(code, message) = &err {
        if matches!(
            code.extended_code,
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        ) {
            return MarqueeError::AlreadyExists {
                entity_id: message.clone().unwrap_or_else(|| op.to_string()),
            };
        }
    }
    MarqueeError::Persistence {
        op: op.to_string(),
        message: err.to_string(),
    }
}

/// `map_err` adapter: `.map_err(sqlite("save_display"))`
pub fn sqlite(op: &'static str) -> impl Fn(rusqlite::Error) -> MarqueeError {
    move |err| from_rusqlite(op, err)
}

pub fn migration_error(migration_id: &str, reason: &str) -> MarqueeError {
    MarqueeError::Persistence {
        op: "migration".to_string(),
        message: format!("Migration {} failed: {}", migration_id, reason),
    }
}

pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> MarqueeError {
    MarqueeError::Persistence {
        op: "migration_checksum".to_string(),
        message: format!(
            "Checksum mismatch for migration {}: recorded {}, embedded {}",
            migration_id, expected, actual
        ),
    }
}

/// A stored row that no longer decodes into a domain value
pub fn corrupt_row(table: &str, reason: impl std::fmt::Display) -> MarqueeError {
    MarqueeError::Serialization {
        message: format!("corrupt row in {}: {}", table, reason),
    }
}
