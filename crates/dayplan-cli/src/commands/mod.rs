pub mod classify;
pub mod config;
pub mod intervals;
pub mod plan;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dayplan_core::calendar::parse_events;
use dayplan_core::{CalendarEvent, Config};

pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Config::path()?),
    }
}

pub fn load_config(explicit: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    Ok(Config::load_from(&config_path(explicit)?)?)
}

/// Read events from a JSON file. No file means an empty day.
pub fn read_events(path: Option<&Path>) -> Result<Vec<CalendarEvent>, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(parse_events(&content)?)
}

pub fn parse_instant(flag: &str, value: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("--{flag}: {value:?} is not an RFC 3339 instant: {e}").into())
}
