//! Marquee CLI
//!
//! Command-line interface for display pairing, redirect rules and content
//! resolution

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use marquee_core::logging_facility::{self, Profile};
use marquee_core::OpContext;
use marquee_engine::{Engine, MarqueeConfig};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "marquee")]
#[command(about = "Marquee - display lifecycle and content redirects", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides configuration)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log profile: dev or prod (logs go to stderr)
    #[arg(long, global = true, env = "MARQUEE_LOG_PROFILE")]
    log: Option<Profile>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Display lifecycle operations
    Display(commands::display::DisplayArgs),
    /// Device-flow pairing codes
    Code(commands::code::CodeArgs),
    /// Redirect rule administration
    Rule(commands::rule::RuleArgs),
    /// Resolve content for a display or a location
    Resolve(commands::resolve::ResolveArgs),
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Some(profile) = cli.log {
        logging_facility::init(profile);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => MarqueeConfig::load(path)?,
        None => MarqueeConfig::from_env()?,
    };
    if let Some(db) = cli.db {
        config.storage.database_path = db;
    }

    let engine = Engine::open(config)?;
    let ctx = OpContext::new();

    match cli.command {
        Commands::Display(args) => commands::display::execute(args, &engine, &ctx),
        Commands::Code(args) => commands::code::execute(args, &engine, &ctx),
        Commands::Rule(args) => commands::rule::execute(args, &engine, &ctx),
        Commands::Resolve(args) => commands::resolve::execute(args, &engine, &ctx),
    }
}
