use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Args;
use dayplan_core::{validate, DailyPlanner, RawParams};

use super::{load_config, parse_instant, read_events};

#[derive(Args)]
pub struct PlanArgs {
    /// JSON file with the day's calendar events
    #[arg(long)]
    events: Option<PathBuf>,
    /// Date to plan (YYYY-MM-DD, default today)
    #[arg(long)]
    date: Option<String>,
    /// Wake time (RFC 3339)
    #[arg(long)]
    wake: Option<String>,
    /// Sleep time (RFC 3339)
    #[arg(long)]
    sleep: Option<String>,
    /// Energy level: low, medium or high
    #[arg(long)]
    energy: Option<String>,
    /// Plan as if this were the current instant (RFC 3339)
    #[arg(long)]
    now: Option<String>,
    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

pub fn run(args: PlanArgs, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let now = match args.now.as_deref() {
        Some(value) => parse_instant("now", value)?,
        None => Utc::now(),
    };

    let raw = RawParams {
        date: args.date,
        wake_time: args.wake,
        sleep_time: args.sleep,
        energy: args.energy,
    };
    let params = validate(&raw, &config.day, now)?;
    let events = read_events(args.events.as_deref())?;

    let planner = DailyPlanner::new(&config)?;
    let plan = planner.plan(&params, &events, now)?;

    if args.pretty {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("{}", serde_json::to_string(&plan)?);
    }
    Ok(())
}
