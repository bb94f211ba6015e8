//! Configuration management for the housing analysis pipeline

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// How a failed market-segment prediction affects the other two models
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatingPolicy {
    /// Every model is attempted regardless of the others
    #[default]
    Isolated,
    /// Price level and unit price are skipped unless the market segment succeeded.
    ///
    /// Only the market outcome gates; a failed price level prediction does not
    /// block the unit price model.
    Gated,
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub artifacts: ArtifactsConfig,
    pub reference: ReferenceConfig,
    pub inference: InferenceConfig,
    pub logging: LoggingConfig,
}

/// Locations of the model artifact store and reference data store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory containing every artifact file
    pub dir: String,
    /// Market segment classifier (ONNX)
    pub market_model: String,
    /// Price level classifier (ONNX)
    pub price_level_model: String,
    /// Unit price regressor (ONNX)
    pub regression_model: String,
    /// Regression scaler parameters (JSON: mean, scale)
    pub scaler: String,
    /// Per-model feature lists (JSON)
    pub feature_names: String,
    /// Categorical and output mappings (JSON)
    pub mappings: String,
    /// Number of intra-op threads per ONNX session (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

impl ArtifactsConfig {
    pub fn path_of(&self, file: &str) -> PathBuf {
        Path::new(&self.dir).join(file)
    }
}

/// Names of the mappings the pipeline depends on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Categorical input dimensions
    pub categorical: Vec<String>,
    /// Output mapping of the market segment classifier
    pub market_labels: String,
    /// Output mapping of the price level classifier
    pub price_level_labels: String,
    /// Preferred pre-selected code per categorical dimension
    #[serde(default)]
    pub preferred_defaults: HashMap<String, i64>,
}

impl ReferenceConfig {
    /// Categorical dimensions followed by both output mappings.
    pub fn required_mappings(&self) -> Vec<String> {
        let mut names = self.categorical.clone();
        names.push(self.market_labels.clone());
        names.push(self.price_level_labels.clone());
        names
    }
}

/// Inference configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default)]
    pub policy: GatingPolicy,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from `config/housing.toml` when present, over the defaults
    pub fn load() -> Result<Self> {
        Self::build(File::with_name("config/housing").required(false))
    }

    /// Load configuration from a specific path, over the defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(File::from(path.as_ref()))
    }

    fn build<S>(file: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let defaults = Config::try_from(&AppConfig::default())
            .context("Failed to serialize default configuration")?;

        let config = Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(Environment::with_prefix("HOUSING").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut preferred_defaults = HashMap::new();
        preferred_defaults.insert("楼层".to_string(), 1);
        preferred_defaults.insert("房龄".to_string(), 2);

        Self {
            artifacts: ArtifactsConfig {
                dir: "artifacts".to_string(),
                market_model: "market_segment_model.onnx".to_string(),
                price_level_model: "price_level_model.onnx".to_string(),
                regression_model: "unit_price_model.onnx".to_string(),
                scaler: "regression_scaler.json".to_string(),
                feature_names: "feature_names.json".to_string(),
                mappings: "mappings.json".to_string(),
                onnx_threads: 1,
            },
            reference: ReferenceConfig {
                categorical: ["方位", "楼层", "所属区域", "房龄"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                market_labels: "市场类别".to_string(),
                price_level_labels: "是否高于区域均价".to_string(),
                preferred_defaults,
            },
            inference: InferenceConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.inference.policy, GatingPolicy::Isolated);
        assert_eq!(config.artifacts.path_of("mappings.json"), PathBuf::from("artifacts/mappings.json"));
        assert_eq!(
            config.reference.required_mappings(),
            vec!["方位", "楼层", "所属区域", "房龄", "市场类别", "是否高于区域均价"]
        );
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[inference]\npolicy = \"gated\"\n\n[artifacts]\ndir = \"/srv/models\"\nonnx_threads = 2"
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.inference.policy, GatingPolicy::Gated);
        assert_eq!(config.artifacts.dir, "/srv/models");
        assert_eq!(config.artifacts.onnx_threads, 2);
        assert_eq!(config.artifacts.scaler, "regression_scaler.json");
        assert_eq!(config.logging.level, "info");
    }
}
