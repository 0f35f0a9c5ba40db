pub mod device_code;
pub mod display;
pub mod rule;
pub mod schedule;

pub use device_code::DeviceCode;
pub use display::{Display, DisplayState, Location};
pub use rule::{ContentTarget, DisplaySelector, RedirectRule, ReorderPosition, RuleChanges};
pub use schedule::{Schedule, TimeWindow};
