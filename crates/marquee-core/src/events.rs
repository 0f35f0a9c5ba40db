//! Lifecycle notifications for displays
//!
//! The engine publishes one event per successful display transition. A
//! failing publisher is logged and otherwise ignored: notification delivery
//! never decides whether a transition happened.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Display, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventKind {
    Registered,
    Activated,
    Reactivated,
    Disabled,
    LocationChanged,
    WentOffline,
    Reconnected,
    Deleted,
}

impl LifecycleEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEventKind::Registered => "registered",
            LifecycleEventKind::Activated => "activated",
            LifecycleEventKind::Reactivated => "reactivated",
            LifecycleEventKind::Disabled => "disabled",
            LifecycleEventKind::LocationChanged => "location_changed",
            LifecycleEventKind::WentOffline => "went_offline",
            LifecycleEventKind::Reconnected => "reconnected",
            LifecycleEventKind::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: LifecycleEventKind,
    pub display_id: String,
    pub display_name: String,
    pub location: Location,
    /// Display version after the transition was persisted
    pub version: u64,
    pub occurred_at: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn for_display(kind: LifecycleEventKind, display: &Display, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            display_id: display.id.clone(),
            display_name: display.name.clone(),
            location: display.location.clone(),
            version: display.version,
            occurred_at: at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("event publish failed: {0}")]
pub struct PublishError(pub String);

/// Sink for lifecycle events (message bus, webhook fan-out, push channel)
pub trait EventPublisher: Send + Sync {
    /// Deliver one event
    ///
    /// # Errors
    /// Any delivery failure; callers log it and carry on.
    fn publish(&self, event: &LifecycleEvent) -> Result<(), PublishError>;
}

/// Drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: &LifecycleEvent) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Writes each event as an `info` log line
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPublisher;

impl EventPublisher for TracingPublisher {
    fn publish(&self, event: &LifecycleEvent) -> Result<(), PublishError> {
        tracing::info!(
            component = module_path!(),
            event = "lifecycle",
            kind = event.kind.as_str(),
            display_id = %event.display_id,
            display_version = event.version,
        );
        Ok(())
    }
}

/// Keeps events in memory; used by tests and embedding callers that poll
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<LifecycleEventKind> {
        self.events().iter().map(|e| e.kind).collect()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: &LifecycleEvent) -> Result<(), PublishError> {
        self.events
            .lock()
            .map(|mut events| events.push(event.clone()))
            .map_err(|_| PublishError("recording publisher lock poisoned".into()))
    }
}
