//! Content resolution

use chrono::{DateTime, Utc};
use clap::Args;
use marquee_core::{Location, OpContext, Resolution};
use marquee_engine::Engine;

use super::parse_instant;

/// Resolve for a display id, or for a bare site/zone/position
#[derive(Debug, Args)]
pub struct ResolveArgs {
    #[arg(long, conflicts_with_all = ["site", "zone", "position"])]
    pub display: Option<String>,
    #[arg(long, requires_all = ["zone", "position"])]
    pub site: Option<String>,
    #[arg(long, requires = "site")]
    pub zone: Option<String>,
    #[arg(long, requires = "site")]
    pub position: Option<String>,
    /// Evaluate at this RFC 3339 instant instead of now
    #[arg(long, value_parser = parse_instant)]
    pub at: Option<DateTime<Utc>>,
    /// Print the resolution as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(
    args: ResolveArgs,
    engine: &Engine,
    ctx: &OpContext,
) -> Result<(), Box<dyn std::error::Error>> {
    let now = args.at.unwrap_or_else(Utc::now);
    let resolution = match (args.display, args.site, args.zone, args.position) {
        (Some(display_id), _, _, _) => engine.resolver.resolve_display(ctx, &display_id, now)?,
        (None, Some(site), Some(zone), Some(position)) => {
            let location = Location::new(site, zone, position);
            engine.resolver.resolve_location(ctx, &location, now)?
        }
        _ => return Err("pass --display or all of --site, --zone and --position".into()),
    };

    if args.json {
        println!("{}", serde_json::to_string(&resolution)?);
        return Ok(());
    }
    match resolution {
        Resolution::Matched(resolved) => {
            println!("rule: {} (priority {})", resolved.rule_name, resolved.priority);
            println!("  content_type: {}", resolved.target.content_type);
            println!("  version: {}", resolved.target.version);
            println!("  hash: {}", resolved.target.hash);
        }
        Resolution::NoMatch => println!("no match"),
    }
    Ok(())
}
