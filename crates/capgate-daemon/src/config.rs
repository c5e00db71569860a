//! Configuration loading and validation

use anyhow::Result;
use capgate_core::{ManifestFormat, PinId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Output #{0} has an empty name")]
    EmptyOutputName(usize),
    #[error("Sensor #{0} has an empty name")]
    EmptySensorName(usize),
    #[error("Output '{name}' has min {min} greater than max {max}")]
    InvertedRange { name: String, min: i32, max: i32 },
    #[error("Sensor '{0}' has a non-positive sine period")]
    InvalidPeriod(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub manifest: ManifestConfig,
    #[serde(default, rename = "output")]
    pub outputs: Vec<OutputConfig>,
    #[serde(default, rename = "sensor")]
    pub sensors: Vec<SensorConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for web server
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// `json` (strict) or `legacy` (single-quoted, unescaped)
    #[serde(default)]
    pub format: ManifestFormat,
}

/// One `[[output]]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub pin: PinId,
    #[serde(default)]
    pub min: i32,
    #[serde(default = "default_max")]
    pub max: i32,
    /// On/off only, no set-value route
    #[serde(default)]
    pub binary: bool,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

fn default_max() -> i32 {
    255
}

/// One `[[sensor]]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub source: SensorSource,
}

/// Where a sensor's readings come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SensorSource {
    /// Always the same value
    Constant { value: f32 },
    /// `start`, `start + step`, ... one step per read
    Counter {
        #[serde(default)]
        start: f32,
        #[serde(default = "default_step")]
        step: f32,
    },
    /// `offset + amplitude * sin(2π t / period)` over daemon uptime
    Sine {
        amplitude: f32,
        #[serde(default)]
        offset: f32,
        period_secs: f32,
    },
    /// Numeric text file re-read on every request (e.g. an IIO sysfs node)
    File {
        path: PathBuf,
        #[serde(default = "default_scale")]
        scale: f32,
    },
}

fn default_step() -> f32 {
    1.0
}

fn default_scale() -> f32 {
    1.0
}

impl Config {
    /// Check descriptor tables for values the registry cannot use
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, output) in self.outputs.iter().enumerate() {
            if output.name.trim().is_empty() {
                return Err(ConfigError::EmptyOutputName(i));
            }
            if output.min > output.max {
                return Err(ConfigError::InvertedRange {
                    name: output.name.clone(),
                    min: output.min,
                    max: output.max,
                });
            }
        }

        for (i, sensor) in self.sensors.iter().enumerate() {
            if sensor.name.trim().is_empty() {
                return Err(ConfigError::EmptySensorName(i));
            }
            if let SensorSource::Sine { period_secs, .. } = sensor.source {
                if !(period_secs > 0.0) {
                    return Err(ConfigError::InvalidPeriod(sensor.name.clone()));
                }
            }
        }

        Ok(())
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(
            path = %path.display(),
            outputs = config.outputs.len(),
            sensors = config.sensors.len(),
            "Loaded configuration"
        );
        config
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

/// Sample configuration: one dimmable bulb and one light sensor
pub fn default_board_config() -> Config {
    Config {
        daemon: DaemonConfig::default(),
        manifest: ManifestConfig::default(),
        outputs: vec![OutputConfig {
            pin: PinId(13),
            min: 0,
            max: 255,
            binary: false,
            name: "Zarowka".to_string(),
            description: "To jest zarowka.".to_string(),
        }],
        sensors: vec![SensorConfig {
            name: "Czujnik swiatla".to_string(),
            description: "To jest czujnik swiatla o zakresie x-y.".to_string(),
            source: SensorSource::Sine {
                amplitude: 200.0,
                offset: 300.0,
                period_secs: 60.0,
            },
        }],
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&default_board_config())?;
    std::fs::write(path, content)?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [daemon]
            bind = "127.0.0.1:9000"

            [manifest]
            format = "legacy"

            [[output]]
            pin = 13
            name = "Bulb"
            description = "Dimmable bulb"

            [[output]]
            pin = 4
            binary = true
            name = "Relay"

            [[sensor]]
            name = "Lux"
            source = { kind = "file", path = "/sys/bus/iio/devices/iio:device0/in_illuminance_raw" }

            [[sensor]]
            name = "Ticks"
            source = { kind = "counter", step = 2.0 }
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.daemon.bind, "127.0.0.1:9000");
        assert_eq!(config.manifest.format, ManifestFormat::Legacy);
        assert_eq!(config.outputs.len(), 2);
        assert_eq!(config.outputs[0].pin, PinId(13));
        assert_eq!(config.outputs[0].max, 255);
        assert!(!config.outputs[0].binary);
        assert!(config.outputs[1].binary);
        assert_eq!(config.outputs[1].description, "");
        assert!(matches!(config.sensors[0].source, SensorSource::File { scale, .. } if scale == 1.0));
        assert_eq!(
            config.sensors[1].source,
            SensorSource::Counter { start: 0.0, step: 2.0 }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut config = default_board_config();
        config.outputs[0].min = 10;
        config.outputs[0].max = 5;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedRange {
                name: "Zarowka".to_string(),
                min: 10,
                max: 5
            })
        );
    }

    #[test]
    fn test_validate_rejects_bad_sensor() {
        let mut config = default_board_config();
        config.sensors[0].source = SensorSource::Sine {
            amplitude: 1.0,
            offset: 0.0,
            period_secs: 0.0,
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPeriod(_))));

        config.sensors[0].name = " ".to_string();
        assert_eq!(config.validate(), Err(ConfigError::EmptySensorName(0)));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.daemon.bind, "0.0.0.0:8080");
        assert!(config.outputs.is_empty());
        assert_eq!(config.manifest.format, ManifestFormat::Json);
    }

    #[test]
    fn test_default_config_round_trips_through_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("capgate.toml");
        save_default_config(&path).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.outputs[0].name, "Zarowka");
        assert_eq!(config.outputs[0].pin, PinId(13));
        assert_eq!(config.sensors[0].name, "Czujnik swiatla");
    }
}
