//! Lenient loading and pretty-printed saving of the settings document.
//!
//! A missing file yields defaults. Unknown keys are ignored and mistyped
//! values keep their default; both are returned as [`SettingsWarning`]s so
//! callers can surface them.

use super::{AssignError, Settings};
use crate::error::{CoreError, CoreResult, write_error};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// A key that was skipped while merging a document into the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsWarning {
    UnknownKey(String),
    InvalidType(String),
}

impl fmt::Display for SettingsWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsWarning::UnknownKey(key) => write!(f, "Unknown setting '{key}' ignored"),
            SettingsWarning::InvalidType(key) => {
                write!(f, "Invalid type for '{key}', using default")
            }
        }
    }
}

/// Settings plus whatever was skipped while reading them.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub warnings: Vec<SettingsWarning>,
    /// False when no file existed and defaults were used.
    pub from_file: bool,
}

impl Settings {
    /// Reads `path` and merges it over the defaults.
    pub fn load(path: &Path) -> CoreResult<LoadedSettings> {
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(LoadedSettings {
                settings: Settings::default(),
                warnings: Vec::new(),
                from_file: false,
            });
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Settings(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let document: Value = serde_json::from_str(&text).map_err(|e| {
            CoreError::Settings(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        let Value::Object(entries) = document else {
            return Err(CoreError::Settings(format!(
                "{} does not contain a JSON object",
                path.display()
            )));
        };

        let mut settings = Settings::default();
        let warnings = settings.update(entries);
        Ok(LoadedSettings {
            settings,
            warnings,
            from_file: true,
        })
    }

    /// Merges several keys at once, skipping (and reporting) the ones that do not fit.
    pub fn update(&mut self, entries: Map<String, Value>) -> Vec<SettingsWarning> {
        let mut warnings = Vec::new();
        for (key, value) in entries {
            match self.assign(&key, value) {
                Ok(()) => {}
                Err(AssignError::UnknownKey) => {
                    warn!("Unknown setting '{}' ignored", key);
                    warnings.push(SettingsWarning::UnknownKey(key));
                }
                Err(AssignError::InvalidType) => {
                    warn!("Invalid type for '{}', using default", key);
                    warnings.push(SettingsWarning::InvalidType(key));
                }
            }
        }
        warnings
    }

    /// Writes the full document as indented JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text + "\n").map_err(|e| write_error(path, e))?;
        debug!("Saved {} settings to {}", Settings::KEYS.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Device;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let loaded = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert_eq!(loaded.settings, Settings::default());
        assert!(loaded.warnings.is_empty());
        assert!(!loaded.from_file);
    }

    #[test]
    fn unknown_and_mistyped_keys_become_warnings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            json!({
                "device": "cpu",
                "max_scale": 4,
                "processing_resolution": "huge",
                "hyperdrive": true
            })
            .to_string(),
        )
        .unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.settings.device, Device::Cpu);
        assert_eq!(loaded.settings.max_scale, 4.0);
        assert_eq!(loaded.settings.processing_resolution, 1536);
        assert_eq!(loaded.warnings.len(), 2);
        assert!(loaded
            .warnings
            .contains(&SettingsWarning::InvalidType("processing_resolution".into())));
        assert!(loaded
            .warnings
            .contains(&SettingsWarning::UnknownKey("hyperdrive".into())));
    }

    #[test]
    fn non_object_document_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(Settings::load(&path), Err(CoreError::Settings(_))));
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings::default();
        settings.low_pass_filter_eps = 0.01;
        settings.last_video_path = Some("/videos/clip.mp4".into());
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert!(loaded.warnings.is_empty());
        assert_eq!(loaded.settings, settings);
    }
}
