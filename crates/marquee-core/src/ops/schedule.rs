//! Schedule evaluation
//!
//! Instant bounds (`active_from`, `active_until`) compare in UTC. Weekday
//! and time-of-day checks use the wall clock of the evaluation timezone:
//! the schedule's own timezone when it names one, otherwise the site's.

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;

use crate::model::Schedule;

/// Timezone whose wall clock drives weekday and time-of-day checks
pub fn evaluation_timezone(schedule: &Schedule, site_tz: Tz) -> Tz {
    match schedule.timezone.as_deref() {
        None => site_tz,
        Some(name) => match name.trim().parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!(
                    component = module_path!(),
                    timezone = name,
                    fallback = %site_tz,
                    "unknown schedule timezone"
                );
                site_tz
            }
        },
    }
}

/// Whether every constraint in `schedule` holds at `now`
pub fn is_active(schedule: &Schedule, now: DateTime<Utc>, site_tz: Tz) -> bool {
    if let Some(from) = schedule.active_from {
        if now < from {
            return false;
        }
    }
    if let Some(until) = schedule.active_until {
        if now >= until {
            return false;
        }
    }
    if schedule.days_of_week.is_empty() && schedule.time_of_day.is_none() {
        return true;
    }

    let local = now.with_timezone(&evaluation_timezone(schedule, site_tz));
    if !schedule.days_of_week.is_empty() && !schedule.days_of_week.contains(&local.weekday()) {
        return false;
    }
    match &schedule.time_of_day {
        Some(window) => window.contains(local.time()),
        None => true,
    }
}
