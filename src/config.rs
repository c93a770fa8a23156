use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::motion::{MotionParams, ParameterSource, SessionOptions, UploadPolicy, UserInput};
use crate::types::GradeLevel;

/// Application configuration, loaded from `config.toml`.
/// Every section falls back to its defaults when missing.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub database: DatabaseConfig,
    pub mqtt: MqttConfig,
    pub sensor: SensorConfig,
    pub calibration: CalibrationConfig,
    pub measurement: MeasurementConfig,
    pub plot: PlotConfig,
    pub capture: CaptureConfig,
    pub channels: ChannelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
    pub title: String,
    pub resizable: bool,
    pub vsync: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    /// Keep calibration and history in memory only
    pub in_memory: bool,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub client_id: String,
    pub topics: MqttTopics,
    pub qos: u8,
    pub keep_alive: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MqttTopics {
    pub accelerometer: String,
    pub gyroscope: String,
    /// Interval changes are published here for the device
    pub control: String,
    /// Uploaded results go to `{results}/{grade}/{flail}`
    pub results: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SensorBackend {
    Mqtt,
    Simulator,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SensorConfig {
    pub backend: SensorBackend,
    pub update_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalibrationConfig {
    pub settle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeasurementConfig {
    pub parameter_source: ParameterSource,
    pub fixed_mass: f64,
    pub fixed_length: f64,
    pub default_mass: String,
    pub default_length: String,
    pub grade_level: GradeLevel,
    pub upload_enabled: bool,
    pub upload_policy: UploadPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlotConfig {
    pub history_len: usize,
    pub plot_height: f32,
    pub allow_drag: bool,
    pub allow_zoom: bool,
    pub colors: PlotColors,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlotColors {
    pub magnitude: [u8; 3],
    pub energy: [u8; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    pub directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChannelConfig {
    pub sensor_channel_capacity: usize,
    pub store_task_channel_capacity: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 720.0,
            title: "FlailMeter".to_string(),
            resizable: true,
            vsync: true,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/flail_meter.db".to_string(),
            in_memory: false,
            request_timeout_ms: 2000,
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "localhost".to_string(),
            port: 1883,
            client_id: "flail_meter".to_string(),
            topics: MqttTopics::default(),
            qos: 1,
            keep_alive: 5,
        }
    }
}

impl Default for MqttTopics {
    fn default() -> Self {
        Self {
            accelerometer: "sensor/accelerometer".to_string(),
            gyroscope: "sensor/gyroscope".to_string(),
            control: "sensor/control".to_string(),
            results: "measurements".to_string(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            backend: SensorBackend::Mqtt,
            update_interval_ms: 100,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self { settle_ms: 3000 }
    }
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        let form = UserInput::default();
        Self {
            parameter_source: ParameterSource::Preset,
            fixed_mass: 0.5,
            fixed_length: 0.3,
            default_mass: form.mass,
            default_length: form.total_length,
            grade_level: GradeLevel::Secondary,
            upload_enabled: true,
            upload_policy: UploadPolicy::PerMeasurement,
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            history_len: 50,
            plot_height: 180.0,
            allow_drag: false,
            allow_zoom: false,
            colors: PlotColors::default(),
        }
    }
}

impl Default for PlotColors {
    fn default() -> Self {
        Self {
            magnitude: [0, 122, 255],
            energy: [255, 149, 0],
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            directory: "captures".to_string(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            sensor_channel_capacity: 1000,
            store_task_channel_capacity: 100,
        }
    }
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;
        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        std::fs::write(path, content).map_err(ConfigError::IoError)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width <= 0.0 || self.window.height <= 0.0 {
            return Err(ConfigError::ValidationError("Window dimensions must be positive".to_string()));
        }

        if self.sensor.update_interval_ms == 0 {
            return Err(ConfigError::ValidationError("Sensor update interval must be positive".to_string()));
        }

        if self.measurement.fixed_mass <= 0.0 || self.measurement.fixed_length <= 0.0 {
            return Err(ConfigError::ValidationError(
                "Fixed mass and length must be positive".to_string(),
            ));
        }

        if self.mqtt.qos > 2 {
            return Err(ConfigError::ValidationError("MQTT QoS must be 0, 1 or 2".to_string()));
        }

        if self.channels.sensor_channel_capacity == 0 || self.channels.store_task_channel_capacity == 0 {
            return Err(ConfigError::ValidationError("Channel capacities must be positive".to_string()));
        }

        if self.plot.history_len == 0 {
            return Err(ConfigError::ValidationError("Plot history length must be positive".to_string()));
        }

        Ok(())
    }

    pub fn get_database_path(&self) -> PathBuf {
        PathBuf::from(&self.database.path)
    }

    pub fn get_capture_directory(&self) -> PathBuf {
        PathBuf::from(&self.capture.directory)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.sensor.update_interval_ms)
    }

    pub fn settle_duration(&self) -> Duration {
        Duration::from_millis(self.calibration.settle_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.database.request_timeout_ms)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            parameter_source: self.measurement.parameter_source,
            fixed_params: MotionParams::new(self.measurement.fixed_mass, self.measurement.fixed_length),
            grade_level: self.measurement.grade_level,
            upload_policy: self.measurement.upload_policy,
            update_interval: self.update_interval(),
            history_len: self.plot.history_len,
        }
    }

    pub fn default_user_input(&self) -> UserInput {
        UserInput::new(&self.measurement.default_mass, &self.measurement.default_length)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(toml::de::Error),
    #[error("Serialize error: {0}")]
    SerializeError(toml::ser::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub struct ConfigManager {
    config: AppConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            config_path: None,
        }
    }

    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let config = AppConfig::load_from_file(&path)?;
        Ok(Self {
            config,
            config_path: Some(path.as_ref().to_path_buf()),
        })
    }

    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    pub fn get_config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.config_path {
            self.config.save_to_file(path)?;
        }
        Ok(())
    }

    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.config.save_to_file(path)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.settle_duration(), Duration::from_millis(3000));
        assert_eq!(config.update_interval(), Duration::from_millis(100));
        assert_eq!(config.default_user_input().parse().unwrap(), MotionParams::new(0.5, 0.3));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut manager = ConfigManager::new();
        manager.get_config_mut().sensor.backend = SensorBackend::Simulator;
        manager.get_config_mut().measurement.upload_policy = UploadPolicy::OnFinalize;
        manager.save_to_file(&path).unwrap();

        let loaded = ConfigManager::load_from_file(&path).unwrap();
        assert_eq!(loaded.get_config(), manager.get_config());
    }

    #[test]
    fn partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [sensor]
            backend = "simulator"

            [measurement]
            parameter_source = "user_input"
            grade_level = "elementary"
            "#,
        )
        .unwrap();

        assert_eq!(config.sensor.backend, SensorBackend::Simulator);
        assert_eq!(config.sensor.update_interval_ms, 100);
        assert_eq!(config.measurement.parameter_source, ParameterSource::UserInput);
        assert_eq!(config.session_options().grade_level, GradeLevel::Elementary);
        assert_eq!(config.calibration.settle_ms, 3000);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = AppConfig::default();
        config.measurement.fixed_mass = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = AppConfig::default();
        config.sensor.update_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
