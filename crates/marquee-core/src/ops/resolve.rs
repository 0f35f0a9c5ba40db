//! The resolution engine
//!
//! A pure function of (rule snapshot, location, instant, site timezone):
//! rules are walked in descending priority and the first one whose selector
//! and schedule both match supplies the content target.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::schedule::is_active;
use crate::model::{ContentTarget, Location, RedirectRule};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub rule_name: String,
    pub priority: i64,
    pub target: ContentTarget,
}

/// Outcome of a resolution; `NoMatch` is a normal result, not an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Matched(ResolvedTarget),
    NoMatch,
}

impl Resolution {
    pub fn target(&self) -> Option<&ContentTarget> {
        match self {
            Resolution::Matched(resolved) => Some(&resolved.target),
            Resolution::NoMatch => None,
        }
    }

    pub fn rule_name(&self) -> Option<&str> {
        match self {
            Resolution::Matched(resolved) => Some(&resolved.rule_name),
            Resolution::NoMatch => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Resolution::Matched(_))
    }
}

/// Rules in evaluation order: priority desc, name asc on (invalid) ties
pub fn rank(rules: &[RedirectRule]) -> Vec<&RedirectRule> {
    let mut ranked: Vec<&RedirectRule> = rules.iter().collect();
    ranked.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked
}

/// Whether `rule` applies to `location` at `now`
pub fn rule_matches(rule: &RedirectRule, location: &Location, now: DateTime<Utc>, tz: Tz) -> bool {
    rule.selector.matches(location)
        && rule
            .schedule
            .as_ref()
            .map_or(true, |schedule| is_active(schedule, now, tz))
}

/// Pick the content target for a display at `location`
///
/// `tz` is the site timezone, used for schedules that do not name their own.
pub fn resolve(rules: &[RedirectRule], location: &Location, now: DateTime<Utc>, tz: Tz) -> Resolution {
    rank(rules)
        .into_iter()
        .find(|rule| rule_matches(rule, location, now, tz))
        .map_or(Resolution::NoMatch, |rule| {
            Resolution::Matched(ResolvedTarget {
                rule_name: rule.name.clone(),
                priority: rule.priority,
                target: rule.target.clone(),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DisplaySelector, Schedule};
    use chrono::{Duration, TimeZone};

    fn rule(name: &str, priority: i64, selector: DisplaySelector) -> RedirectRule {
        RedirectRule::new(name, priority, selector, ContentTarget::new("page", "1", name))
    }

    fn lobby() -> Location {
        Location::new("hq", "lobby", "north")
    }

    #[test]
    fn test_highest_matching_priority_wins() {
        let rules = vec![
            rule("lobby-welcome", 500, DisplaySelector::zone("lobby")),
            rule("emergency", 1000, DisplaySelector::any()),
        ];
        let resolution = resolve(&rules, &lobby(), Utc::now(), Tz::UTC);
        assert_eq!(resolution.rule_name(), Some("emergency"));
    }

    #[test]
    fn test_non_matching_selector_is_skipped() {
        let rules = vec![
            rule("cafeteria", 900, DisplaySelector::zone("cafeteria")),
            rule("lobby-welcome", 500, DisplaySelector::zone("lobby")),
        ];
        let resolution = resolve(&rules, &lobby(), Utc::now(), Tz::UTC);
        assert_eq!(resolution.rule_name(), Some("lobby-welcome"));
    }

    #[test]
    fn test_no_rules_is_no_match() {
        assert_eq!(resolve(&[], &lobby(), Utc::now(), Tz::UTC), Resolution::NoMatch);
    }

    #[test]
    fn test_expired_schedule_falls_through() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let expired = rule("promo", 800, DisplaySelector::any()).with_schedule(Schedule {
            active_until: Some(now - Duration::hours(1)),
            ..Schedule::default()
        });
        let fallback = rule("default", 1, DisplaySelector::any());
        let resolution = resolve(&[expired, fallback], &lobby(), now, Tz::UTC);
        assert_eq!(resolution.rule_name(), Some("default"));
    }

    #[test]
    fn test_resolution_serializes_with_outcome_tag() {
        let json = serde_json::to_value(Resolution::NoMatch).unwrap();
        assert_eq!(json["outcome"], "no_match");
    }
}
