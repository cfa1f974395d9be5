//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default composition settings.
    pub compose: ComposeDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default composition parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeDefaults {
    /// Fraction of the output height given to the main clip.
    /// The overlay clip receives the remainder.
    pub main_height_fraction: f64,

    /// Video codec passed to the encoder.
    pub video_codec: String,

    /// Encoder speed preset.
    pub video_preset: String,

    /// Constant rate factor (quality knob, lower = better).
    pub video_crf: u32,

    /// Audio codec passed to the encoder.
    pub audio_codec: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "clipstack=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            compose: ComposeDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ComposeDefaults {
    fn default() -> Self {
        Self {
            main_height_fraction: 0.7,
            video_codec: "libx264".to_string(),
            video_preset: "ultrafast".to_string(),
            video_crf: 28,
            audio_codec: "aac".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("clipstack").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_defaults() {
        let defaults = ComposeDefaults::default();
        assert!((defaults.main_height_fraction - 0.7).abs() < 1e-9);
        assert_eq!(defaults.video_codec, "libx264");
        assert_eq!(defaults.video_preset, "ultrafast");
        assert_eq!(defaults.video_crf, 28);
        assert_eq!(defaults.audio_codec, "aac");
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.compose.main_height_fraction,
            config.compose.main_height_fraction
        );
        assert_eq!(parsed.logging.level, config.logging.level);
    }
}
