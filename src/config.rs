use crate::models::CalibrationConfig;
use crate::services::DEFAULT_WORKERS;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use validator::Validate;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    pub detector: DetectorSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PipelineSettings {
    /// Size of the estimation worker pool
    #[serde(default = "default_pipeline_workers")]
    #[validate(range(min = 1, max = 256))]
    pub workers: usize,
    /// Resize every frame to this height before detection
    #[serde(default)]
    #[validate(range(min = 1))]
    pub target_reference_height: Option<u32>,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_true")]
    pub keep_uploads: bool,
    #[serde(default = "default_max_upload_bytes")]
    #[validate(range(min = 1))]
    pub max_upload_bytes: usize,
    /// Write keypoint overlays here when set
    #[serde(default)]
    pub annotate_dir: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: default_pipeline_workers(),
            target_reference_height: None,
            upload_dir: default_upload_dir(),
            keep_uploads: true,
            max_upload_bytes: default_max_upload_bytes(),
            annotate_dir: None,
        }
    }
}

fn default_pipeline_workers() -> usize { DEFAULT_WORKERS }
fn default_upload_dir() -> PathBuf { PathBuf::from("uploads") }
fn default_true() -> bool { true }
fn default_max_upload_bytes() -> usize { 20 * 1024 * 1024 }

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DetectorSettings {
    /// Pose-estimation sidecar URL
    #[validate(url)]
    pub endpoint: String,
    #[serde(default = "default_detector_timeout")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

fn default_detector_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with STATURE__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., STATURE__CALIBRATION__PIXEL_TO_PHYSICAL_UNIT -> calibration.pixel_to_physical_unit
            .add_source(env_source())
            .build()?;

        Self::from_config(settings)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        Self::from_config(settings)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges the type system cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.calibration
            .validate()
            .map_err(|e| ConfigError::Message(format!("calibration: {}", e)))?;
        self.pipeline
            .validate()
            .map_err(|e| ConfigError::Message(format!("pipeline: {}", e)))?;
        self.detector
            .validate()
            .map_err(|e| ConfigError::Message(format!("detector: {}", e)))?;
        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("STATURE")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
