use chrono::{DateTime, TimeZone, Utc};
use marquee_core::{ContentTarget, DisplaySelector, Location, RedirectRule};

#[allow(dead_code)]
pub fn lobby_north() -> Location {
    Location::new("hq", "lobby", "north")
}

/// Rule whose target hash is its own name, so results are easy to read
#[allow(dead_code)]
pub fn rule(name: &str, priority: i64, selector: DisplaySelector) -> RedirectRule {
    RedirectRule::new(name, priority, selector, ContentTarget::new("page", "1", name))
}

#[allow(dead_code)]
pub fn rules_with_priorities(priorities: &[i64]) -> Vec<RedirectRule> {
    priorities
        .iter()
        .enumerate()
        .map(|(i, p)| rule(&format!("r{}", i), *p, DisplaySelector::any()))
        .collect()
}

#[allow(dead_code)]
pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}
