// ============================================================================
// splatseq-cli/src/commands/settings.rs
// ============================================================================
//
// SETTINGS COMMAND: Show, reset or edit the settings document

use crate::cli::{SettingsAction, SettingsArgs};
use crate::error::CliResult;
use log::info;
use serde_json::Value;
use splatseq_core::reporting::Reporter;
use splatseq_core::{CoreError, Settings};

/// Runs one settings action and returns the resulting settings.
pub fn run_settings(args: &SettingsArgs, reporter: &dyn Reporter) -> CliResult<Settings> {
    let loaded = Settings::load(&args.settings)?;
    for warning in &loaded.warnings {
        reporter.warning(&warning.to_string());
    }
    let mut settings = loaded.settings;

    match &args.action {
        SettingsAction::Show => {
            let document = serde_json::to_string_pretty(&settings)?;
            println!("{document}");
        }
        SettingsAction::Reset => {
            settings.reset_to_defaults();
            settings.save(&args.settings)?;
            info!("Reset settings in {}", args.settings.display());
            println!("Settings reset to defaults: {}", args.settings.display());
        }
        SettingsAction::Set { key, value } => {
            let parsed = parse_value(value);
            settings.set(key, parsed)?;
            settings.validate()?;
            for deviation in settings.checkpoint_deviations() {
                if deviation.key == key.as_str() {
                    reporter.warning(&format!(
                        "'{}' is tied to the model checkpoint (default {}, now {})",
                        deviation.key, deviation.default, deviation.current
                    ));
                }
            }
            settings.save(&args.settings)?;
            info!("Set {key} in {}", args.settings.display());
            let shown = settings
                .get(key)
                .ok_or_else(|| CoreError::Settings(format!("Unknown setting: {key}")))?;
            println!("{key} = {shown}");
        }
    }
    Ok(settings)
}

/// Parses a command-line value as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
