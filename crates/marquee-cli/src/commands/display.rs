//! Display lifecycle commands

use clap::{Args, Subcommand};
use marquee_core::OpContext;
use marquee_engine::Engine;

use super::{print_display, LocationArgs};

#[derive(Debug, Args)]
pub struct DisplayArgs {
    #[command(subcommand)]
    pub command: DisplayCommand,
}

#[derive(Debug, Subcommand)]
pub enum DisplayCommand {
    /// Register a new display (starts unregistered)
    Register {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Activate a display that is not disabled
    Activate { id: String },
    /// Disable a display
    Disable { id: String },
    /// Bring any display, including a disabled one, back to active
    Reactivate { id: String },
    /// Record a heartbeat
    Heartbeat { id: String },
    /// Move a display
    Relocate {
        id: String,
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Set a free-form property
    SetProperty { id: String, key: String, value: String },
    /// Remove a property
    RemoveProperty { id: String, key: String },
    /// Show one display with its observed state
    Show { id: String },
    /// List every display
    List,
    /// Delete a display
    Delete { id: String },
}

pub fn execute(
    args: DisplayArgs,
    engine: &Engine,
    ctx: &OpContext,
) -> Result<(), Box<dyn std::error::Error>> {
    let displays = &engine.displays;
    match args.command {
        DisplayCommand::Register { name, location } => {
            let display = displays.register(ctx, &name, location.into())?;
            println!("Display registered:");
            print_display(&display);
        }
        DisplayCommand::Activate { id } => print_display(&displays.activate(ctx, &id)?),
        DisplayCommand::Disable { id } => print_display(&displays.disable(ctx, &id)?),
        DisplayCommand::Reactivate { id } => print_display(&displays.force_reactivate(ctx, &id)?),
        DisplayCommand::Heartbeat { id } => print_display(&displays.update_last_seen(ctx, &id)?),
        DisplayCommand::Relocate { id, location } => {
            print_display(&displays.update_location(ctx, &id, location.into())?)
        }
        DisplayCommand::SetProperty { id, key, value } => {
            print_display(&displays.set_property(ctx, &id, &key, &value)?)
        }
        DisplayCommand::RemoveProperty { id, key } => {
            print_display(&displays.remove_property(ctx, &id, &key)?)
        }
        DisplayCommand::Show { id } => {
            let display = displays.get(ctx, &id)?;
            print_display(&display);
            println!("  observed: {}", displays.effective_state(ctx, &id)?);
        }
        DisplayCommand::List => {
            let all = displays.list(ctx)?;
            if all.is_empty() {
                println!("No displays");
            }
            for display in all {
                println!(
                    "{}\t{}\t{}\t{}",
                    display.id, display.name, display.location, display.state
                );
            }
        }
        DisplayCommand::Delete { id } => {
            displays.delete(ctx, &id)?;
            println!("Display deleted: {}", id);
        }
    }
    Ok(())
}
