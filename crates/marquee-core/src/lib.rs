//! Marquee Core - display lifecycle and content-redirect resolution kernel
//!
//! This crate holds everything that does not touch a database:
//! - Display, DeviceCode and RedirectRule models
//! - Pure state-machine transitions for displays
//! - Device-flow code generation and redemption checks
//! - Priority reorder planning for redirect rules
//! - The resolution engine (selector + schedule evaluation)
//! - Repository and event-publisher seams, plus an in-memory store
//! - Error taxonomy and the structured logging facility

pub mod context;
pub mod errors;
pub mod events;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod repository;
pub mod rules;

#[doc(hidden)]
pub use marquee_core_types;

pub use context::{CancellationFlag, OpContext};
pub use errors::{ExError, ExErrorKind, MarqueeError, Result};
pub use events::{EventPublisher, LifecycleEvent, LifecycleEventKind};
pub use model::{
    ContentTarget, DeviceCode, Display, DisplaySelector, DisplayState, Location, RedirectRule,
    ReorderPosition, RuleChanges, Schedule, TimeWindow,
};
pub use ops::resolve::{resolve, Resolution, ResolvedTarget};
pub use ops::store::MemoryStore;
pub use ops::{plan_reorder, PriorityChange, ReorderPlan};
pub use repository::{DeviceCodeRepository, DisplayRepository, Repository, RuleRepository};
