use std::path::Path;

use clap::Subcommand;
use dayplan_core::Config;

use super::{config_path, load_config};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "day.wake_up", "chains.policy")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// Show the whole configuration as JSON
    Show,
    /// Print the config file location
    Path,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction, explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = load_config(explicit)?;
            let value = config
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = load_config(explicit)?;
            config.set(&key, &value)?;
            config.save_to(&config_path(explicit)?)?;
            println!("{key} = {value}");
        }
        ConfigAction::Show => {
            let config = load_config(explicit)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", config_path(explicit)?.display());
        }
        ConfigAction::Reset => {
            Config::default().save_to(&config_path(explicit)?)?;
            println!("Config reset to defaults");
        }
    }
    Ok(())
}
