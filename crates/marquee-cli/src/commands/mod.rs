pub mod code;
pub mod display;
pub mod resolve;
pub mod rule;

use chrono::{DateTime, Utc};
use clap::Args;
use marquee_core::{Display, Location};

/// The three coordinates that place a display
#[derive(Debug, Clone, Args)]
pub struct LocationArgs {
    #[arg(long)]
    pub site: String,
    #[arg(long)]
    pub zone: String,
    #[arg(long)]
    pub position: String,
}

impl From<LocationArgs> for Location {
    fn from(args: LocationArgs) -> Self {
        Location::new(args.site, args.zone, args.position)
    }
}

pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("'{}' is not an RFC 3339 timestamp: {}", raw, e))
}

pub fn print_display(display: &Display) {
    println!("{}", display.id);
    println!("  name: {}", display.name);
    println!("  location: {}", display.location);
    println!("  state: {}", display.state);
    println!("  version: {}", display.version);
    if let Some(seen) = display.last_seen {
        println!("  last_seen: {}", seen.to_rfc3339());
    }
    for (key, value) in &display.properties {
        println!("  property {}: {}", key, value);
    }
}
