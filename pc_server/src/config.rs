//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use party_cards::game::{GameSettings, SettingsError};
use std::path::PathBuf;

/// Where packs are looked for when nothing else is configured.
const DEFAULT_PACKS_DIR: &str = "packs";

/// Complete server configuration loaded from CLI arguments and environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Settings file; built-in defaults when absent
    pub settings_path: Option<PathBuf>,
    /// Directory searched recursively for `*.json` packs
    pub packs_dir: PathBuf,
    /// Whether `packs_dir` was configured explicitly
    pub packs_dir_explicit: bool,
    /// Events buffered for the event log before new ones are dropped
    pub event_buffer: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `settings_override` - Optional settings file (from CLI args)
    /// * `packs_override` - Optional packs directory (from CLI args)
    ///
    /// # Returns
    ///
    /// * `ServerConfig` - Loaded configuration, not yet validated
    pub fn from_env(settings_override: Option<PathBuf>, packs_override: Option<PathBuf>) -> Self {
        let settings_path = settings_override.or_else(|| std::env::var_os("PC_SETTINGS").map(PathBuf::from));

        let packs_dir = packs_override.or_else(|| std::env::var_os("PC_PACKS_DIR").map(PathBuf::from));
        let packs_dir_explicit = packs_dir.is_some();

        Self {
            settings_path,
            packs_dir: packs_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_PACKS_DIR)),
            packs_dir_explicit,
            event_buffer: parse_env_or("PC_EVENT_BUFFER", 256),
        }
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.packs_dir.is_dir() {
            if !self.packs_dir_explicit {
                return Err(ConfigError::MissingRequired {
                    var: "PC_PACKS_DIR".to_string(),
                    hint: format!(
                        "no ./{DEFAULT_PACKS_DIR} directory; pass --packs DIR or set PC_PACKS_DIR"
                    ),
                });
            }
            return Err(ConfigError::Invalid {
                var: "PC_PACKS_DIR".to_string(),
                reason: format!("{} is not a directory", self.packs_dir.display()),
            });
        }

        if let Some(path) = &self.settings_path
            && !path.is_file()
        {
            return Err(ConfigError::Invalid {
                var: "PC_SETTINGS".to_string(),
                reason: format!("{} is not a file", path.display()),
            });
        }

        if self.event_buffer == 0 {
            return Err(ConfigError::Invalid {
                var: "PC_EVENT_BUFFER".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Reads the settings file, or falls back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read, parsed or validated.
    pub fn load_settings(&self) -> Result<GameSettings, SettingsError> {
        match &self.settings_path {
            Some(path) => GameSettings::from_file(path),
            None => Ok(GameSettings::default()),
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
