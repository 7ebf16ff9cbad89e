//! Configuration view and validation commands: `lessongate config`.

use std::path::Path;

use anyhow::{Context, Result};
use lessongate::config::GateConfig;

use super::super::ConfigCommands;

/// `effective` is the loaded file with environment and CLI overrides applied.
pub fn cmd_config(
    config_path: &Path,
    effective: &GateConfig,
    command: Option<ConfigCommands>,
) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No lessongate.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();
            println!("Effective values (with env/CLI overrides):");
            println!();
            let rendered =
                toml::to_string_pretty(effective).context("Failed to render configuration")?;
            println!("{}", rendered);
        }
        Some(ConfigCommands::Validate) => {
            if !config_path.exists() {
                println!("No lessongate.toml found. Using defaults (valid).");
                return Ok(());
            }
            GateConfig::load(config_path)?;
            println!("Configuration is valid.");
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("lessongate.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            GateConfig::default().save(config_path)?;
            println!("Created lessongate.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] host, port, dev_mode");
            println!("  - [database] path");
            println!("  - [routing] landing_path, location_prefix");
            println!("  - [identity] learner_header");
            println!("  - [progress] clear_completed_on_regress");
            println!("  - [logging] level, json");
        }
    }

    Ok(())
}
