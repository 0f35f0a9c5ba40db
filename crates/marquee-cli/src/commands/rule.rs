//! Redirect rule administration

use chrono::{DateTime, Utc, Weekday};
use clap::{Args, Subcommand};
use marquee_core::{
    ContentTarget, DisplaySelector, OpContext, RedirectRule, ReorderPosition, RuleChanges,
    Schedule, TimeWindow,
};
use marquee_engine::Engine;

use super::parse_instant;

#[derive(Debug, Args)]
pub struct RuleArgs {
    #[command(subcommand)]
    pub command: RuleCommand,
}

#[derive(Debug, Subcommand)]
pub enum RuleCommand {
    /// Add a rule; priorities must be unique
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, allow_hyphen_values = true)]
        priority: i64,
        #[command(flatten)]
        selector: SelectorArgs,
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        schedule: ScheduleArgs,
    },
    /// Change a rule's priority or target
    Update {
        name: String,
        #[arg(long, allow_hyphen_values = true)]
        priority: Option<i64>,
        /// Content type, version and hash, all three required together
        #[arg(long, num_args = 3, value_names = ["TYPE", "VERSION", "HASH"])]
        target: Option<Vec<String>>,
        /// Drop the rule's schedule
        #[arg(long)]
        clear_schedule: bool,
    },
    /// Remove a rule
    Remove { name: String },
    /// Move a rule: start, end, before:<rule> or after:<rule>
    Reorder { name: String, position: ReorderPosition },
    /// Show one rule as JSON
    Show { name: String },
    /// List rules in evaluation order
    List,
}

/// Selector fields; an omitted field matches anything
#[derive(Debug, Args)]
pub struct SelectorArgs {
    #[arg(long, default_value = "")]
    pub site: String,
    #[arg(long, default_value = "")]
    pub zone: String,
    #[arg(long, default_value = "")]
    pub position: String,
}

#[derive(Debug, Args)]
pub struct TargetArgs {
    #[arg(long)]
    pub content_type: String,
    #[arg(long)]
    pub version: String,
    #[arg(long)]
    pub hash: String,
}

#[derive(Debug, Args)]
pub struct ScheduleArgs {
    /// Comma-separated weekdays, e.g. mon,tue,fri
    #[arg(long, value_delimiter = ',')]
    pub days: Vec<Weekday>,
    /// Daily window HH:MM-HH:MM; may wrap past midnight
    #[arg(long)]
    pub window: Option<String>,
    /// IANA timezone for days and window
    #[arg(long)]
    pub timezone: Option<String>,
    #[arg(long, value_parser = parse_instant)]
    pub from: Option<DateTime<Utc>>,
    #[arg(long, value_parser = parse_instant)]
    pub until: Option<DateTime<Utc>>,
}

impl ScheduleArgs {
    fn into_schedule(self) -> Result<Option<Schedule>, Box<dyn std::error::Error>> {
        let time_of_day = match self.window.as_deref() {
            Some(raw) => {
                let (start, end) = raw
                    .split_once('-')
                    .ok_or_else(|| format!("window '{}' must look like HH:MM-HH:MM", raw))?;
                Some(TimeWindow::parse(start, end)?)
            }
            None => None,
        };
        let schedule = Schedule {
            active_from: self.from,
            active_until: self.until,
            days_of_week: self.days,
            time_of_day,
            timezone: self.timezone,
        };
        if schedule.is_unconstrained() && schedule.timezone.is_none() {
            Ok(None)
        } else {
            Ok(Some(schedule))
        }
    }
}

pub fn execute(
    args: RuleArgs,
    engine: &Engine,
    ctx: &OpContext,
) -> Result<(), Box<dyn std::error::Error>> {
    let rules = &engine.rules;
    match args.command {
        RuleCommand::Add {
            name,
            priority,
            selector,
            target,
            schedule,
        } => {
            let mut rule = RedirectRule::new(
                name,
                priority,
                DisplaySelector::new(selector.site, selector.zone, selector.position),
                ContentTarget::new(target.content_type, target.version, target.hash),
            );
            rule.schedule = schedule.into_schedule()?;
            let rule = rules.add(ctx, rule)?;
            println!("Rule added: {} (priority {})", rule.name, rule.priority);
        }
        RuleCommand::Update {
            name,
            priority,
            target,
            clear_schedule,
        } => {
            let target = match target.as_deref() {
                Some([content_type, version, hash]) => {
                    Some(ContentTarget::new(content_type, version, hash))
                }
                Some(_) => return Err("--target takes TYPE VERSION HASH".into()),
                None => None,
            };
            let changes = RuleChanges {
                priority,
                target,
                schedule: clear_schedule.then_some(None),
                ..RuleChanges::default()
            };
            let rule = rules.update(ctx, &name, changes)?;
            println!("Rule updated: {} (priority {})", rule.name, rule.priority);
        }
        RuleCommand::Remove { name } => {
            rules.remove(ctx, &name)?;
            println!("Rule removed: {}", name);
        }
        RuleCommand::Reorder { name, position } => {
            let plan = rules.reorder(ctx, &name, &position)?;
            if plan.is_noop() {
                println!("Rule {} already in place", name);
            } else {
                println!(
                    "Rule moved: {} ({} priority change(s){})",
                    name,
                    plan.changes.len(),
                    if plan.renumbered { ", renumbered" } else { "" }
                );
            }
        }
        RuleCommand::Show { name } => {
            let rule = rules.get(ctx, &name)?;
            println!("{}", serde_json::to_string_pretty(&rule)?);
        }
        RuleCommand::List => {
            let all = rules.list(ctx)?;
            if all.is_empty() {
                println!("No rules");
            }
            for rule in all {
                println!(
                    "{}\t{}\t{}\t{}@{}",
                    rule.priority,
                    rule.name,
                    rule.selector,
                    rule.target.content_type,
                    rule.target.version
                );
            }
        }
    }
    Ok(())
}
