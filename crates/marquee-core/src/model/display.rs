use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::MarqueeError;

/// Lifecycle state of a display
///
/// `Unregistered → Active → {Offline, Disabled}`, `Offline → Active` on
/// re-contact. `Disabled` is sticky and only left through a forced
/// reactivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    Unregistered,
    Active,
    Offline,
    Disabled,
}

impl DisplayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayState::Unregistered => "unregistered",
            DisplayState::Active => "active",
            DisplayState::Offline => "offline",
            DisplayState::Disabled => "disabled",
        }
    }

    /// Whether a display in this state may be handed content
    pub fn is_servable(&self) -> bool {
        matches!(self, DisplayState::Active | DisplayState::Offline)
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayState {
    type Err = MarqueeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unregistered" => Ok(DisplayState::Unregistered),
            "active" => Ok(DisplayState::Active),
            "offline" => Ok(DisplayState::Offline),
            "disabled" => Ok(DisplayState::Disabled),
            other => Err(MarqueeError::invalid_input(format!(
                "unknown display state '{}'",
                other
            ))),
        }
    }
}

/// Physical placement of a display
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    pub site_id: String,
    pub zone: String,
    pub position: String,
}

impl Location {
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
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.site_id, self.zone, self.position)
    }
}

/// A managed remote screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Display {
    /// Opaque unique id (UUID v7), immutable
    pub id: String,

    /// Operator label, unique across the fleet
    pub name: String,

    pub location: Location,

    pub state: DisplayState,

    /// Most recent heartbeat, if the display ever checked in
    pub last_seen: Option<DateTime<Utc>>,

    /// Optimistic-concurrency token; 0 at creation, +1 per persisted write
    pub version: u64,

    /// Free-form operator metadata
    pub properties: BTreeMap<String, String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Display {
    /// Create a freshly registered display in `Unregistered` state
    pub fn new(id: String, name: String, location: Location, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            location,
            state: DisplayState::Unregistered,
            last_seen: None,
            version: 0,
            properties: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// State as observed at `now`
    ///
    /// A stored `Active` display whose last contact (or creation, if it never
    /// checked in) is older than `offline_after` reads as `Offline`. Nothing
    /// is written; the stored state only changes through explicit transitions.
    pub fn effective_state(&self, now: DateTime<Utc>, offline_after: Duration) -> DisplayState {
        if self.state != DisplayState::Active {
            return self.state;
        }
        let reference = self.last_seen.unwrap_or(self.created_at);
        if now - reference > offline_after {
            DisplayState::Offline
        } else {
            DisplayState::Active
        }
    }
}
