//! Input validation shared by services and stores

use chrono_tz::Tz;

use crate::errors::{MarqueeError, Result};
use crate::model::{Location, RedirectRule, Schedule};

/// # Errors
/// `InvalidInput` if the name is empty or whitespace-only.
pub fn validate_display_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MarqueeError::invalid_input(
            "display name cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

/// A registered display needs all three location fields
///
/// # Errors
/// `InvalidLocation` naming every blank field.
pub fn validate_location(location: &Location) -> Result<()> {
    let blank: Vec<&str> = [
        ("site_id", &location.site_id),
        ("zone", &location.zone),
        ("position", &location.position),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| field)
    .collect();

    if blank.is_empty() {
        Ok(())
    } else {
        Err(MarqueeError::InvalidLocation {
            reason: format!("empty {}", blank.join(", ")),
        })
    }
}

/// # Errors
/// `InvalidInput` if the key is empty.
pub fn validate_property_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(MarqueeError::invalid_input("property key cannot be empty"));
    }
    Ok(())
}

/// # Errors
/// `InvalidInput` for an empty name, `InvalidSchedule` for a malformed
/// schedule.
pub fn validate_rule(rule: &RedirectRule) -> Result<()> {
    if rule.name.trim().is_empty() {
        return Err(MarqueeError::invalid_input("rule name cannot be empty"));
    }
    if let Some(schedule) = &rule.schedule {
        validate_schedule(&rule.name, schedule)?;
    }
    Ok(())
}

/// # Errors
/// `InvalidSchedule` when the active range is empty or inverted, the daily
/// window has equal bounds, or the timezone is unknown.
pub fn validate_schedule(rule_name: &str, schedule: &Schedule) -> Result<()> {
    let invalid = |reason: String| MarqueeError::InvalidSchedule {
        rule_name: rule_name.to_string(),
        reason,
    };

    if let (Some(from), Some(until)) = (schedule.active_from, schedule.active_until) {
        if from >= until {
            return Err(invalid(format!(
                "active_from {} is not before active_until {}",
                from, until
            )));
        }
    }
    if let Some(window) = &schedule.time_of_day {
        if window.start == window.end {
            return Err(invalid("time_of_day start and end must differ".into()));
        }
    }
    if let Some(tz) = &schedule.timezone {
        parse_timezone(tz).map_err(|_| invalid(format!("unknown timezone '{}'", tz)))?;
    }
    Ok(())
}

/// # Errors
/// `InvalidInput` for names outside the IANA database.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| MarqueeError::invalid_input(format!("unknown timezone '{}'", name)))
}
