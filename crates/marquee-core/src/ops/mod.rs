pub mod activation_ops;
pub mod display_ops;
pub mod ordering;
pub mod resolve;
pub mod schedule;
pub mod store;

pub use ordering::{
    plan_reorder, snapshot_drift, PriorityChange, ReorderPlan, DEFAULT_PRIORITY_STEP,
};
pub use store::MemoryStore;
