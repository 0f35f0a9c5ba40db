//! Core types shared across Marquee crates
//!
//! - **Correlation types**: `RequestId`, `TraceId` carried by operation contexts
//! - **Sensitive data**: `Sensitive<T>` marker for secrets such as device codes
//! - **Schema constants**: canonical log field keys and event names

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::{RequestId, TraceId};
pub use sensitive::Sensitive;
