use chrono::{DateTime, TimeZone, Utc};
use marquee_core::{ContentTarget, Display, DisplaySelector, Location, RedirectRule};
use marquee_store::SqliteStore;

#[allow(dead_code)]
pub fn store() -> SqliteStore {
    SqliteStore::open_in_memory().expect("in-memory store")
}

/// Whole-second timestamps survive the millisecond column round trip
#[allow(dead_code)]
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

#[allow(dead_code)]
pub fn display(id: &str, name: &str) -> Display {
    Display::new(
        id.to_string(),
        name.to_string(),
        Location::new("hq", "lobby", "north"),
        at(0),
    )
}

#[allow(dead_code)]
pub fn rule(name: &str, priority: i64) -> RedirectRule {
    let mut rule = RedirectRule::new(
        name,
        priority,
        DisplaySelector::zone("lobby"),
        ContentTarget::new("page", "3", format!("sha256:{}", name)),
    );
    rule.created_at = at(0);
    rule.updated_at = at(0);
    rule
}
