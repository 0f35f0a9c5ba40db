//! Device-flow pairing commands

use chrono::Utc;
use clap::{Args, Subcommand};
use marquee_core::OpContext;
use marquee_engine::Engine;

use super::{parse_instant, print_display, LocationArgs};

#[derive(Debug, Args)]
pub struct CodeArgs {
    #[command(subcommand)]
    pub command: CodeCommand,
}

#[derive(Debug, Subcommand)]
pub enum CodeCommand {
    /// Mint a code pair for a display to show
    Generate,
    /// Redeem a user code
    ///
    /// With --name and a location the display is also registered and
    /// activated in one step.
    Activate {
        user_code: String,
        #[arg(long, requires = "site")]
        name: Option<String>,
        #[arg(long, requires = "name")]
        site: Option<String>,
        #[arg(long, requires = "site")]
        zone: Option<String>,
        #[arg(long, requires = "site")]
        position: Option<String>,
    },
    /// Poll with a device code
    Poll { device_code: String },
    /// Delete expired codes
    Purge {
        /// Purge as of this RFC 3339 instant instead of now
        #[arg(long, value_parser = parse_instant)]
        at: Option<chrono::DateTime<Utc>>,
    },
}

pub fn execute(
    args: CodeArgs,
    engine: &Engine,
    ctx: &OpContext,
) -> Result<(), Box<dyn std::error::Error>> {
    let activation = &engine.activation;
    match args.command {
        CodeCommand::Generate => {
            let code = activation.generate_code(ctx)?;
            println!("Code generated:");
            println!("  user_code: {}", code.user_code);
            println!("  device_code: {}", code.device_code);
            println!("  expires_at: {}", code.expires_at.to_rfc3339());
            println!("  poll_interval_secs: {}", code.poll_interval_secs);
        }
        CodeCommand::Activate {
            user_code,
            name,
            site,
            zone,
            position,
        } => match (name, site, zone, position) {
            (Some(name), Some(site), Some(zone), Some(position)) => {
                let location = LocationArgs {
                    site,
                    zone,
                    position,
                };
                let display =
                    activation.complete_pairing(ctx, &user_code, &name, location.into())?;
                println!("Display paired:");
                print_display(&display);
            }
            (None, None, None, None) => {
                let display_id = activation.activate_code(ctx, &user_code)?;
                println!("Code activated:");
                println!("  display_id: {}", display_id);
            }
            _ => return Err("pairing needs --name, --site, --zone and --position".into()),
        },
        CodeCommand::Poll { device_code } => {
            let code = activation.validate_code(ctx, &device_code)?;
            match code.display_id {
                Some(display_id) if code.activated => {
                    println!("activated");
                    println!("  display_id: {}", display_id);
                }
                _ => {
                    println!("pending");
                    println!("  expires_in_secs: {}", code.expires_in_secs(Utc::now()));
                }
            }
        }
        CodeCommand::Purge { at } => {
            let purged = activation.purge_expired(ctx, at.unwrap_or_else(Utc::now))?;
            println!("Purged {} expired code(s)", purged);
        }
    }
    Ok(())
}
