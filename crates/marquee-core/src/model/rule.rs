use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::display::Location;
use super::schedule::Schedule;
use crate::errors::MarqueeError;

/// Partial-match filter over a display's location
///
/// An empty field is a wildcard; a non-empty field must equal the display's
/// value exactly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplaySelector {
    #[serde(default)]
    pub site_id: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub position: String,
}

impl DisplaySelector {
    /// Selector that matches every display
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(
        site_id: impl Into<String>,
        zone: impl Into<String>,
        position: impl Into<String>,
    ) -> Self {
        Self {
            site_id: site_id.into(),
            zone: zone.into(),
            position: position.into(),
        }
    }

    pub fn zone(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            ..Self::default()
        }
    }

    pub fn matches(&self, location: &Location) -> bool {
        field_matches(&self.site_id, &location.site_id)
            && field_matches(&self.zone, &location.zone)
            && field_matches(&self.position, &location.position)
    }

    pub fn is_wildcard(&self) -> bool {
        self.site_id.is_empty() && self.zone.is_empty() && self.position.is_empty()
    }
}

fn field_matches(selector: &str, value: &str) -> bool {
    selector.is_empty() || selector == value
}

impl fmt::Display for DisplaySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |s: &str| if s.is_empty() { "*" } else { s }.to_string();
        write!(
            f,
            "{}/{}/{}",
            part(&self.site_id),
            part(&self.zone),
            part(&self.position)
        )
    }
}

/// Opaque reference into the external content catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentTarget {
    pub content_type: String,
    pub version: String,
    pub hash: String,
}

impl ContentTarget {
    pub fn new(
        content_type: impl Into<String>,
        version: impl Into<String>,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            version: version.into(),
            hash: hash.into(),
        }
    }
}

/// Prioritized mapping from a location selector to a content target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectRule {
    /// Unique name, used for update/delete/reorder targeting
    pub name: String,

    /// Higher value is evaluated first; unique across all rules
    pub priority: i64,

    #[serde(default)]
    pub selector: DisplaySelector,

    pub target: ContentTarget,

    /// `None` means always active
    #[serde(default)]
    pub schedule: Option<Schedule>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl RedirectRule {
    pub fn new(
        name: impl Into<String>,
        priority: i64,
        selector: DisplaySelector,
        target: ContentTarget,
    ) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            priority,
            selector,
            target,
            schedule: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }
}

/// Partial update for a rule; absent fields are left unchanged
///
/// `schedule: Some(None)` clears the schedule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleChanges {
    pub priority: Option<i64>,
    pub selector: Option<DisplaySelector>,
    pub target: Option<ContentTarget>,
    pub schedule: Option<Option<Schedule>>,
}

impl RuleChanges {
    pub fn is_empty(&self) -> bool {
        self.priority.is_none()
            && self.selector.is_none()
            && self.target.is_none()
            && self.schedule.is_none()
    }

    /// Apply the present fields onto `rule`
    pub fn apply_to(&self, rule: &mut RedirectRule, now: DateTime<Utc>) {
        if let Some(priority) = self.priority {
            rule.priority = priority;
        }
        if let Some(selector) = &self.selector {
            rule.selector = selector.clone();
        }
        if let Some(target) = &self.target {
            rule.target = target.clone();
        }
        if let Some(schedule) = &self.schedule {
            rule.schedule = schedule.clone();
        }
        rule.updated_at = now;
    }
}

/// Where to move a rule in descending-priority order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderPosition {
    /// Evaluated immediately before (higher priority than) the named rule
    Before(String),
    /// Evaluated immediately after (lower priority than) the named rule
    After(String),
    /// Evaluated first
    Start,
    /// Evaluated last
    End,
}

impl ReorderPosition {
    /// Build from the wire pair `(position, relative_to)`
    ///
    /// # Errors
    /// `InvalidInput` for an unknown position, or when `before`/`after` lacks
    /// a reference rule.
    pub fn from_parts(position: &str, relative_to: Option<&str>) -> Result<Self, MarqueeError> {
        let reference = || {
            relative_to
                .filter(|name| !name.trim().is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    MarqueeError::invalid_input(format!(
                        "position '{}' requires a reference rule",
                        position
                    ))
                })
        };
        match position.trim().to_ascii_lowercase().as_str() {
            "before" => Ok(ReorderPosition::Before(reference()?)),
            "after" => Ok(ReorderPosition::After(reference()?)),
            "start" | "to-start" => Ok(ReorderPosition::Start),
            "end" | "to-end" => Ok(ReorderPosition::End),
            other => Err(MarqueeError::invalid_input(format!(
                "unknown reorder position '{}'",
                other
            ))),
        }
    }
}

impl FromStr for ReorderPosition {
    type Err = MarqueeError;

    /// Accepts `start`, `end`, `before:<rule>` and `after:<rule>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((position, reference)) => Self::from_parts(position, Some(reference)),
            None => Self::from_parts(s, None),
        }
    }
}
