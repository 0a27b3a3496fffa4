//! Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// File holding the per-rule gesture settings.
    pub settings_path: PathBuf,

    /// Gesture evaluation parameters.
    pub engine: EngineConfig,

    /// Stale-input watchdog parameters.
    pub timeout: TimeoutConfig,

    /// Sample listener parameters.
    pub listener: ListenerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Gesture engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Samples evaluated after the first frame before auto-calibration.
    pub warmup_samples: u32,

    /// Delay before an edge-triggered key press is released automatically.
    pub discrete_release_ms: u64,

    /// Roll/rotation cross-suppression constants.
    pub suppression: SuppressionConfig,
}

/// Cross-suppression between head roll and head rotation.
///
/// Magnitudes are raw landmark differences (eye-corner Y for roll, ear Z
/// for rotation), not the derived angles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SuppressionConfig {
    /// Below this competing magnitude both axes report at full strength.
    pub low: f64,

    /// Above this competing magnitude the other axis is forced to zero.
    pub high: f64,

    /// Factor applied between `low` and `high`.
    pub attenuation: f64,
}

/// Watchdog and background tick intervals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Input is considered stale after this long without a sample.
    pub input_timeout_ms: u64,

    /// How often the watchdog checks for stale input.
    pub poll_interval_ms: u64,

    /// How often scheduled key releases are flushed.
    pub release_tick_ms: u64,
}

/// TCP sample listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address the capture process connects to.
    pub bind_addr: String,

    /// Rate of channel diagnostics emitted at debug level.
    pub diagnostics_hz: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "headput_gesture_engine=trace,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            engine: EngineConfig::default(),
            timeout: TimeoutConfig::default(),
            listener: ListenerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            warmup_samples: 10,
            discrete_release_ms: 50,
            suppression: SuppressionConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn discrete_release(&self) -> Duration {
        Duration::from_millis(self.discrete_release_ms)
    }
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            low: 0.15,
            high: 0.6,
            attenuation: 0.5,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            input_timeout_ms: 1500,
            poll_interval_ms: 100,
            release_tick_ms: 10,
        }
    }
}

impl TimeoutConfig {
    pub fn input_timeout(&self) -> Duration {
        Duration::from_millis(self.input_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn release_tick(&self) -> Duration {
        Duration::from_millis(self.release_tick_ms.max(1))
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5005".to_string(),
            diagnostics_hz: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from `path`, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Per-user configuration directory (`$XDG_CONFIG_HOME/headput`).
pub fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("headput")
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Default gesture settings file.
fn default_settings_path() -> PathBuf {
    config_dir().join("UserSettings.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.engine.warmup_samples, 10);
        assert_eq!(config.engine.discrete_release(), Duration::from_millis(50));
        assert_eq!(config.timeout.input_timeout(), Duration::from_millis(1500));
        assert_eq!(config.engine.suppression.low, 0.15);
        assert_eq!(config.engine.suppression.high, 0.6);
        assert_eq!(config.listener.bind_addr, "127.0.0.1:5005");
        assert!(config.settings_path.ends_with("headput/UserSettings.json"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let raw = r#"{ "engine": { "warmup_samples": 3, "suppression": { "low": 0.1 } } }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.engine.warmup_samples, 3);
        assert_eq!(config.engine.discrete_release_ms, 50);
        assert_eq!(config.engine.suppression.low, 0.1);
        assert_eq!(config.engine.suppression.high, 0.6);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.timeout.input_timeout_ms = 900;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.timeout.input_timeout_ms, 900);
    }

    #[test]
    fn test_unparsable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.engine, EngineConfig::default());
    }

    #[test]
    fn test_zero_intervals_are_clamped() {
        let timeout = TimeoutConfig {
            input_timeout_ms: 0,
            poll_interval_ms: 0,
            release_tick_ms: 0,
        };
        assert_eq!(timeout.poll_interval(), Duration::from_millis(1));
        assert_eq!(timeout.release_tick(), Duration::from_millis(1));
    }
}
