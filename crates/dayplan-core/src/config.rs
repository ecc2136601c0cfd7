//! TOML-based application configuration.
//!
//! Stores:
//! - Default wake/sleep times and the user's UTC offset
//! - Chain policy and step durations
//! - Evening-routine placement rules
//! - Calendar source and server settings
//!
//! Configuration is stored at `~/.config/dayplan/config.toml`.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::request::EnergyLevel;

/// Upper bound for any configured step or routine length: one day.
pub const MAX_STEP_MINUTES: i64 = 24 * 60;

/// Upper bound for an energy buffer multiplier.
pub const MAX_ENERGY_SCALE: f64 = 10.0;

/// Returns `~/.config/dayplan[-dev]/` based on DAYPLAN_ENV.
///
/// Set DAYPLAN_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("DAYPLAN_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("dayplan-dev")
    } else {
        base_dir.join("dayplan")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DirUnavailable(e.to_string()))?;
    Ok(dir)
}

/// Day window defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayConfig {
    /// Default wake time, HH:mm local
    #[serde(default = "default_wake_up")]
    pub wake_up: String,
    /// Default sleep time, HH:mm local
    #[serde(default = "default_sleep")]
    pub sleep: String,
    /// Offset of the user's local time from UTC
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_wake_ramp_minutes")]
    pub wake_ramp_minutes: i64,
}

/// Which anchors get a preparation chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainPolicy {
    /// Only anchors with a physical location
    #[default]
    MustAttend,
    /// Every anchor of the day
    AllAnchors,
}

/// Buffer multipliers per energy level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyScale {
    #[serde(default = "default_low_scale")]
    pub low: f64,
    #[serde(default = "default_unit_scale")]
    pub medium: f64,
    #[serde(default = "default_unit_scale")]
    pub high: f64,
}

impl EnergyScale {
    pub fn factor(&self, energy: EnergyLevel) -> f64 {
        match energy {
            EnergyLevel::Low => self.low,
            EnergyLevel::Medium => self.medium,
            EnergyLevel::High => self.high,
        }
    }
}

/// Chain step configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(default)]
    pub policy: ChainPolicy,
    #[serde(default = "default_prep_minutes")]
    pub prep_minutes: i64,
    #[serde(default = "default_commute_minutes")]
    pub commute_minutes: i64,
    #[serde(default = "default_buffer_minutes")]
    pub buffer_minutes: i64,
    #[serde(default)]
    pub energy_buffer_scale: EnergyScale,
}

/// Evening routine placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EveningRoutineConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Earliest local hour the routine may start
    #[serde(default = "default_evening_hour")]
    pub earliest_hour: u32,
    #[serde(default = "default_evening_minutes")]
    pub duration_minutes: i64,
}

/// Where calendar events come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarSourceKind {
    #[default]
    File,
    Http,
}

/// Calendar collaborator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub source: CalendarSourceKind,
    /// Root of `<user>/<date>.json` files; defaults to `<data_dir>/events`
    #[serde(default)]
    pub events_dir: Option<PathBuf>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
}

impl CalendarConfig {
    /// Resolved events directory for the file source.
    pub fn events_dir(&self) -> Result<PathBuf, ConfigError> {
        match self.events_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => Ok(data_dir()?.join("events")),
        }
    }
}

/// A bearer token accepted by the server and the user it identifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiToken {
    pub token: String,
    pub user_id: String,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub tokens: Vec<ApiToken>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/dayplan/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub day: DayConfig,
    #[serde(default)]
    pub chains: ChainConfig,
    #[serde(default)]
    pub evening_routine: EveningRoutineConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

// Default functions
fn default_wake_up() -> String {
    "07:00".into()
}
fn default_sleep() -> String {
    "23:00".into()
}
fn default_wake_ramp_minutes() -> i64 {
    30
}
fn default_low_scale() -> f64 {
    2.0
}
fn default_unit_scale() -> f64 {
    1.0
}
fn default_prep_minutes() -> i64 {
    15
}
fn default_commute_minutes() -> i64 {
    20
}
fn default_buffer_minutes() -> i64 {
    10
}
fn default_true() -> bool {
    true
}
fn default_evening_hour() -> u32 {
    18
}
fn default_evening_minutes() -> i64 {
    20
}
fn default_bind() -> String {
    "127.0.0.1:8787".into()
}

impl Default for DayConfig {
    fn default() -> Self {
        Self {
            wake_up: default_wake_up(),
            sleep: default_sleep(),
            utc_offset_minutes: 0,
            wake_ramp_minutes: default_wake_ramp_minutes(),
        }
    }
}

impl Default for EnergyScale {
    fn default() -> Self {
        Self {
            low: default_low_scale(),
            medium: default_unit_scale(),
            high: default_unit_scale(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            policy: ChainPolicy::default(),
            prep_minutes: default_prep_minutes(),
            commute_minutes: default_commute_minutes(),
            buffer_minutes: default_buffer_minutes(),
            energy_buffer_scale: EnergyScale::default(),
        }
    }
}

impl Default for EveningRoutineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            earliest_hour: default_evening_hour(),
            duration_minutes: default_evening_minutes(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            tokens: Vec::new(),
        }
    }
}

/// Parse an `HH:mm` clock time.
pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

impl DayConfig {
    /// The user's local offset.
    pub fn local_offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "day.utc_offset_minutes".into(),
                message: format!("{} is out of range", self.utc_offset_minutes),
            }
        })
    }

    /// Default wake and sleep instants for a local date.
    ///
    /// Sleep at or before the wake clock time falls on the following day.
    pub fn default_window(
        &self,
        date: NaiveDate,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), ConfigError> {
        let offset = self.local_offset()?;
        let wake = parse_hhmm(&self.wake_up).ok_or_else(|| ConfigError::InvalidValue {
            key: "day.wake_up".into(),
            message: format!("expected HH:mm, got {:?}", self.wake_up),
        })?;
        let sleep = parse_hhmm(&self.sleep).ok_or_else(|| ConfigError::InvalidValue {
            key: "day.sleep".into(),
            message: format!("expected HH:mm, got {:?}", self.sleep),
        })?;

        let to_utc = |time: NaiveTime, date: NaiveDate| -> Result<DateTime<Utc>, ConfigError> {
            offset
                .from_local_datetime(&date.and_time(time))
                .single()
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "day".into(),
                    message: format!("{date} {time} is not a valid local time"),
                })
        };

        let wake_at = to_utc(wake, date)?;
        let mut sleep_at = to_utc(sleep, date)?;
        if sleep <= wake {
            sleep_at = sleep_at + Duration::days(1);
        }
        Ok((wake_at, sleep_at))
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".into(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default config file location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from a specific file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or if the parsed values are invalid.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let cfg = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str::<Config>(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Persist to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            key: key.into(),
            message,
        };

        self.day.local_offset()?;
        if parse_hhmm(&self.day.wake_up).is_none() {
            return Err(invalid("day.wake_up", format!("expected HH:mm, got {:?}", self.day.wake_up)));
        }
        if parse_hhmm(&self.day.sleep).is_none() {
            return Err(invalid("day.sleep", format!("expected HH:mm, got {:?}", self.day.sleep)));
        }
        if self.evening_routine.earliest_hour > 23 {
            return Err(invalid(
                "evening_routine.earliest_hour",
                format!("{} is not an hour of the day", self.evening_routine.earliest_hour),
            ));
        }

        let minutes = [
            ("day.wake_ramp_minutes", self.day.wake_ramp_minutes),
            ("chains.prep_minutes", self.chains.prep_minutes),
            ("chains.commute_minutes", self.chains.commute_minutes),
            ("chains.buffer_minutes", self.chains.buffer_minutes),
            ("evening_routine.duration_minutes", self.evening_routine.duration_minutes),
        ];
        if let Some((key, value)) = minutes
            .iter()
            .find(|(_, v)| !(0..=MAX_STEP_MINUTES).contains(v))
        {
            return Err(invalid(
                *key,
                format!("{value} must be between 0 and {MAX_STEP_MINUTES} minutes"),
            ));
        }

        let scale = &self.chains.energy_buffer_scale;
        for (key, factor) in [
            ("chains.energy_buffer_scale.low", scale.low),
            ("chains.energy_buffer_scale.medium", scale.medium),
            ("chains.energy_buffer_scale.high", scale.high),
        ] {
            if !(0.0..=MAX_ENERGY_SCALE).contains(&factor) {
                return Err(invalid(
                    key,
                    format!("{factor} must be between 0 and {MAX_ENERGY_SCALE}"),
                ));
            }
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. Returns error if key is unknown or the
    /// resulting configuration is invalid. Does not persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}
