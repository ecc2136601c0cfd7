use std::path::{Path, PathBuf};

use clap::Args;
use dayplan_core::anchor::anchors_from_events;
use dayplan_core::{compute_home_intervals, wake_ramp};

use super::{load_config, parse_instant, read_events};

#[derive(Args)]
pub struct IntervalsArgs {
    /// Wake time (RFC 3339)
    #[arg(long)]
    wake: String,
    /// Sleep time (RFC 3339)
    #[arg(long)]
    sleep: String,
    /// JSON file with the day's calendar events
    #[arg(long)]
    events: Option<PathBuf>,
}

pub fn run(args: IntervalsArgs, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let wake = parse_instant("wake", &args.wake)?;
    let sleep = parse_instant("sleep", &args.sleep)?;
    let anchors = anchors_from_events(&read_events(args.events.as_deref())?);

    let intervals = compute_home_intervals(wake, sleep, &anchors)?;
    let ramp = wake_ramp(wake, &intervals, config.day.wake_ramp_minutes);

    let out = serde_json::json!({
        "home_intervals": intervals,
        "wake_ramp": ramp,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
