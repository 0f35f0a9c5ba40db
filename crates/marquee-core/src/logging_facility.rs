//! Structured logging facility
//!
//! - One initialization point, `init(profile)`
//! - `log_op_start!`, `log_op_end!`, `log_op_error!` emit the canonical
//!   fields from `marquee_core_types::schema`
//! - `init_test_capture()` records events in memory for assertions
//!
//! ```rust
//! use marquee_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
