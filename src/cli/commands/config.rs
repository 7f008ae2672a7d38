//! Config command: inspect configuration.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use crate::error::{Result, SvarError};

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: &Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let rendered = toml::to_string_pretty(settings)
                .map_err(|e| SvarError::Config(e.to_string()))?;
            println!("{}", rendered);
        }
        ConfigAction::Path => {
            Output::kv(
                "config",
                &Settings::default_config_path().display().to_string(),
            );
        }
        ConfigAction::Init => {
            let path = Settings::default_config_path();
            if path.exists() {
                Output::warning(&format!(
                    "Config file already exists at {}, leaving it untouched",
                    path.display()
                ));
            } else {
                settings.save()?;
                Output::success(&format!("Config written to {}", path.display()));
            }
        }
    }

    Ok(())
}
