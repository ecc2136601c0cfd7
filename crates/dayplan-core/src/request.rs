//! Request parameter validation.
//!
//! Turns raw query parameters into a concrete scheduling window before any
//! scheduling runs. Identity is checked by the caller, not here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::DayConfig;
use crate::error::{CoreError, Result, ValidationError};

/// Energy level reported for the day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl EnergyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for EnergyLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ValidationError::invalid_parameter(
                "energy",
                format!("expected one of low, medium, high; got {s:?}"),
            )),
        }
    }
}

impl std::fmt::Display for EnergyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParams {
    pub date: Option<String>,
    pub wake_time: Option<String>,
    pub sleep_time: Option<String>,
    pub energy: Option<String>,
}

/// Parameters after validation, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedParams {
    pub date: NaiveDate,
    pub wake_time: DateTime<Utc>,
    pub sleep_time: DateTime<Utc>,
    pub energy: EnergyLevel,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_instant(field: &str, value: &str) -> std::result::Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            ValidationError::invalid_parameter(field, format!("{value:?} is not an ISO instant: {e}"))
        })
}

/// Validate raw parameters.
///
/// `now` decides the default date in the user's local time.
///
/// # Errors
/// `InvalidParameter` naming the field for an unparseable date, instant or
/// energy level; `InvalidWindow` when wake is not before sleep.
pub fn validate(raw: &RawParams, day: &DayConfig, now: DateTime<Utc>) -> Result<ValidatedParams> {
    let offset = day.local_offset()?;

    let date = match present(&raw.date) {
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
            ValidationError::invalid_parameter("date", format!("{value:?} is not a YYYY-MM-DD date: {e}"))
        })?,
        None => now.with_timezone(&offset).date_naive(),
    };

    let energy = match present(&raw.energy) {
        Some(value) => value.parse::<EnergyLevel>()?,
        None => EnergyLevel::default(),
    };

    let explicit_wake = present(&raw.wake_time)
        .map(|v| parse_instant("wakeTime", v))
        .transpose()?;
    let explicit_sleep = present(&raw.sleep_time)
        .map(|v| parse_instant("sleepTime", v))
        .transpose()?;

    let (wake_time, sleep_time) = match (explicit_wake, explicit_sleep) {
        (Some(wake), Some(sleep)) => (wake, sleep),
        (wake, sleep) => {
            let (default_wake, default_sleep) = day.default_window(date)?;
            (wake.unwrap_or(default_wake), sleep.unwrap_or(default_sleep))
        }
    };

    if wake_time >= sleep_time {
        return Err(CoreError::Validation(ValidationError::InvalidWindow {
            wake: wake_time,
            sleep: sleep_time,
        }));
    }

    Ok(ValidatedParams {
        date,
        wake_time,
        sleep_time,
        energy,
    })
}
