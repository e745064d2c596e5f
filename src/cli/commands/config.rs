//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(
    action: &ConfigAction,
    config_path: Option<&str>,
    settings: Settings,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            let mut settings = settings;
            settings.set_value(key, value)?;

            let path = resolve_config_path(config_path);
            settings.save_to(&path)?;

            Output::success(&format!("Set {} = {}", key, value));
            Output::info(&format!("Saved to {}", path.display()));
        }

        ConfigAction::Path => {
            println!("{}", resolve_config_path(config_path).display());
        }
    }

    Ok(())
}

fn resolve_config_path(config_path: Option<&str>) -> PathBuf {
    match config_path {
        Some(p) => PathBuf::from(p),
        None => Settings::default_config_path(),
    }
}
