//! Configuration file support for the workout tracker.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/workout/config.toml`.

use crate::engine::{EngineOptions, NavigationRest};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub wake_lock: WakeLockConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Session engine behaviour
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub navigation_rest: NavigationRest,

    #[serde(default = "default_rest_extend_seconds")]
    pub rest_extend_seconds: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            navigation_rest: NavigationRest::default(),
            rest_extend_seconds: default_rest_extend_seconds(),
        }
    }
}

/// Wake lock configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WakeLockConfig {
    #[serde(default = "default_wake_lock_enabled")]
    pub enabled: bool,

    /// Inhibitor command line; `systemd-inhibit` when unset
    #[serde(default)]
    pub command: Option<String>,
}

impl Default for WakeLockConfig {
    fn default() -> Self {
        Self {
            enabled: default_wake_lock_enabled(),
            command: None,
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    base.join("workout")
}

fn default_rest_extend_seconds() -> u32 {
    15
}

fn default_wake_lock_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("workout").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.session.rest_extend_seconds == 0 {
            return Err(Error::Config("session.rest_extend_seconds must be positive".into()));
        }
        if let Some(command) = &self.wake_lock.command {
            if command.trim().is_empty() {
                return Err(Error::Config("wake_lock.command is empty".into()));
            }
        }
        Ok(())
    }

    /// Engine options derived from the `[session]` table
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            navigation_rest: self.session.navigation_rest,
        }
    }

    // Data layout under the data directory

    pub fn progress_path(data_dir: &Path) -> PathBuf {
        data_dir.join("progress").join("active_session.json")
    }

    pub fn wal_dir(data_dir: &Path) -> PathBuf {
        data_dir.join("wal")
    }

    pub fn wal_path(data_dir: &Path) -> PathBuf {
        Self::wal_dir(data_dir).join("completed_sessions.wal")
    }

    pub fn csv_path(data_dir: &Path) -> PathBuf {
        data_dir.join("sessions.csv")
    }

    pub fn catalog_path(data_dir: &Path) -> PathBuf {
        data_dir.join("workouts.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session.rest_extend_seconds, 15);
        assert_eq!(config.session.navigation_rest, NavigationRest::StartPaused);
        assert!(config.wake_lock.enabled);
        assert!(config.wake_lock.command.is_none());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.session.navigation_rest = NavigationRest::Inactive;
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.session.navigation_rest, NavigationRest::Inactive);
        assert_eq!(parsed.data.data_dir, config.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[session]
navigation_rest = "inactive"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session.navigation_rest, NavigationRest::Inactive);
        assert_eq!(config.session.rest_extend_seconds, 15); // default
        assert!(config.wake_lock.enabled);
    }

    #[test]
    fn test_zero_extend_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nrest_extend_seconds = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
