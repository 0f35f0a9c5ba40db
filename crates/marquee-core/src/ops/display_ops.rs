//! Display state machine
//!
//! Each transition mutates a display in memory and reports the lifecycle
//! event it implies. Persistence (and the version bump that comes with it)
//! is the caller's job.

use chrono::{DateTime, Utc};

use crate::errors::{MarqueeError, Result};
use crate::events::LifecycleEventKind;
use crate::model::{Display, DisplayState, Location};
use crate::rules::validation::{validate_location, validate_property_key};

fn invalid_transition(display: &Display, operation: &str) -> MarqueeError {
    MarqueeError::InvalidTransition {
        display_id: display.id.clone(),
        from: display.state,
        operation: operation.to_string(),
    }
}

/// Move to `Active` from `Unregistered`, `Active` or `Offline`
///
/// Activation counts as contact, so `last_seen` restarts at `now`.
///
/// # Errors
/// * `InvalidTransition` - the display is `Disabled`; use [`force_reactivate`]
pub fn activate(display: &mut Display, now: DateTime<Utc>) -> Result<LifecycleEventKind> {
    if display.state == DisplayState::Disabled {
        return Err(invalid_transition(display, "activate"));
    }
    display.state = DisplayState::Active;
    display.last_seen = Some(now);
    display.updated_at = now;
    Ok(LifecycleEventKind::Activated)
}

/// Move to `Active` from any state, including `Disabled`
pub fn force_reactivate(display: &mut Display, now: DateTime<Utc>) -> LifecycleEventKind {
    display.state = DisplayState::Active;
    display.last_seen = Some(now);
    display.updated_at = now;
    LifecycleEventKind::Reactivated
}

/// Move to `Disabled`; valid from every state
pub fn disable(display: &mut Display, now: DateTime<Utc>) -> LifecycleEventKind {
    display.state = DisplayState::Disabled;
    display.updated_at = now;
    LifecycleEventKind::Disabled
}

/// # Errors
/// * `InvalidTransition` - the display is not `Active`
pub fn mark_offline(display: &mut Display, now: DateTime<Utc>) -> Result<LifecycleEventKind> {
    if display.state != DisplayState::Active {
        return Err(invalid_transition(display, "mark offline"));
    }
    display.state = DisplayState::Offline;
    display.updated_at = now;
    Ok(LifecycleEventKind::WentOffline)
}

/// # Errors
/// * `InvalidLocation` - any location field is blank
pub fn update_location(
    display: &mut Display,
    location: Location,
    now: DateTime<Utc>,
) -> Result<LifecycleEventKind> {
    validate_location(&location)?;
    display.location = location;
    display.updated_at = now;
    Ok(LifecycleEventKind::LocationChanged)
}

/// Record a heartbeat; an `Offline` display comes back `Active`
pub fn touch(display: &mut Display, now: DateTime<Utc>) -> Option<LifecycleEventKind> {
    display.last_seen = Some(now);
    display.updated_at = now;
    if display.state == DisplayState::Offline {
        display.state = DisplayState::Active;
        Some(LifecycleEventKind::Reconnected)
    } else {
        None
    }
}

/// # Errors
/// * `InvalidInput` - empty key
pub fn set_property(
    display: &mut Display,
    key: &str,
    value: impl Into<String>,
    now: DateTime<Utc>,
) -> Result<()> {
    validate_property_key(key)?;
    display.properties.insert(key.to_string(), value.into());
    display.updated_at = now;
    Ok(())
}

/// # Errors
/// * `InvalidInput` - empty key, or no such property
pub fn remove_property(display: &mut Display, key: &str, now: DateTime<Utc>) -> Result<String> {
    validate_property_key(key)?;
    let removed = display.properties.remove(key).ok_or_else(|| {
        MarqueeError::invalid_input(format!(
            "display {} has no property '{}'",
            display.id, key
        ))
    })?;
    display.updated_at = now;
    Ok(removed)
}
