//! Configuration management for the calorie predictor

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the optional configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/predictor.toml";

/// Default location of the model artifact, relative to the working directory
pub const DEFAULT_MODEL_PATH: &str = "xgb_calories_model.json";

/// Serialization format of the model artifact
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    /// Pick the format from the file extension
    #[default]
    Auto,
    /// XGBoost `save_model` JSON document
    XgboostJson,
    /// ONNX graph evaluated through ONNX Runtime
    Onnx,
}

impl ModelFormat {
    /// Resolve `Auto` against a model path; explicit formats are returned as-is.
    pub fn resolve(self, path: &Path) -> ModelFormat {
        match self {
            ModelFormat::Auto => {
                let is_onnx = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("onnx"));
                if is_onnx {
                    ModelFormat::Onnx
                } else {
                    ModelFormat::XgboostJson
                }
            }
            explicit => explicit,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the serialized model
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
    /// Artifact format: "auto", "xgboost_json" or "onnx"
    #[serde(default)]
    pub format: ModelFormat,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_PATH)
}

fn default_onnx_threads() -> usize {
    1
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            format: ModelFormat::Auto,
            onnx_threads: default_onnx_threads(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file, falling back to built-in defaults
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH, false)
    }

    /// Load configuration from a specific path
    ///
    /// When `required` is false a missing file yields the defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P, required: bool) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(required))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
