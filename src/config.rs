use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::date_parser::{DateLayout, DateParser, default_layouts};
use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_tasks_path")]
    pub tasks_path: String,
    #[serde(default = "default_notes_path")]
    pub notes_path: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
    /// Tried in order when reading deadline and event dates
    #[serde(default = "default_layouts")]
    pub date_layouts: Vec<DateLayout>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tasks_path: default_tasks_path(),
            notes_path: default_notes_path(),
            log_level: default_log_level(),
            config_version: Some(CURRENT_CONFIG_VERSION),
            date_layouts: default_layouts(),
        }
    }
}

// Default value functions
fn default_tasks_path() -> String {
    default_data_file(utils::Profile::Prod, "tasks.txt")
}

fn default_notes_path() -> String {
    default_data_file(utils::Profile::Prod, "notes.txt")
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

/// Path of a data file for a profile, falling back to ~/.local/share
fn default_data_file(profile: utils::Profile, file_name: &str) -> String {
    if let Some(data_dir) = utils::get_data_dir(profile) {
        data_dir.join(file_name).to_string_lossy().to_string()
    } else {
        format!("~/.local/share/{}/{}", profile.app_name(), file_name)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
}

impl Config {
    /// Load configuration from file, or create default if missing
    /// Uses the provided profile to determine config and data paths
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            let mut config = Self::default_for_profile(profile);
            config.save_to_path(&config_path)?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file, e.g. from `--config`.
    /// Missing keys fall back to their defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Default configuration with data files placed in the profile's data dir
    pub fn default_for_profile(profile: utils::Profile) -> Self {
        Self {
            tasks_path: default_data_file(profile, "tasks.txt"),
            notes_path: default_data_file(profile, "notes.txt"),
            ..Self::default()
        }
    }

    /// Save configuration to the profile's config file
    pub fn save_with_profile(&mut self, profile: utils::Profile) -> Result<(), ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to an explicit file
    pub fn save_to_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get the expanded tasks file path (with ~ expansion)
    pub fn get_tasks_path(&self) -> PathBuf {
        utils::expand_path(&self.tasks_path)
    }

    /// Get the expanded notes file path (with ~ expansion)
    pub fn get_notes_path(&self) -> PathBuf {
        utils::expand_path(&self.notes_path)
    }

    /// Build the date parser from the configured layouts
    pub fn date_parser(&self) -> DateParser {
        DateParser::new(self.date_layouts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_use_defaults() {
        let config = Config::from_toml("log_level = \"debug\"\n").unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.date_layouts, default_layouts());
        assert_eq!(config.config_version, Some(CURRENT_CONFIG_VERSION));
    }

    #[test]
    fn custom_layouts_replace_the_defaults() {
        let config = Config::from_toml(
            r#"
            tasks_path = "/tmp/t.txt"

            [[date_layouts]]
            pattern = "%d.%m.%Y"
            has_time = false
            "#,
        )
        .unwrap();
        assert_eq!(config.get_tasks_path(), PathBuf::from("/tmp/t.txt"));

        let parser = config.date_parser();
        assert!(parser.parse("15.01.2024").is_some());
        assert!(parser.parse("2024-01-15").is_none());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let result = Config::from_toml("date_layouts = 3");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.log_level = "info".to_string();
        config.save_to_path(&path).unwrap();

        assert_eq!(Config::load_from_path(&path).unwrap(), config);
    }
}
