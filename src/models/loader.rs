//! Artifact and reference data loading
//!
//! Every problem found while loading is collected and returned together in a
//! single [`InitError`], so an operator can fix all of them in one pass.

use crate::config::AppConfig;
use crate::error::{InitError, InitIssue};
use crate::models::onnx::OnnxPredictor;
use crate::models::predictor::{Predictor, Scaler, StandardScaler};
use crate::types::mapping::MappingTable;
use crate::types::schema::FeatureSchema;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Read-only reference data: mappings and per-model feature lists.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceData {
    pub mappings: MappingTable,
    pub schema: FeatureSchema,
}

impl ReferenceData {
    pub fn new(mappings: MappingTable, schema: FeatureSchema) -> Self {
        Self { mappings, schema }
    }

    /// Validate already-parsed documents, reporting problems from both.
    pub fn from_json(mappings: &Value, feature_names: &Value, required: &[String]) -> Result<Self, InitError> {
        let mut issues = Vec::new();

        let mappings = MappingTable::from_json(mappings, required).map_err(|mut found| issues.append(&mut found));
        let schema = FeatureSchema::from_json(feature_names).map_err(|mut found| issues.append(&mut found));

        match (mappings, schema) {
            (Ok(mappings), Ok(schema)) => Ok(Self::new(mappings, schema)),
            _ => Err(InitError::new(issues)),
        }
    }
}

/// The three model handles and the regression scaler.
pub struct ModelSet {
    pub market: Box<dyn Predictor>,
    pub price_level: Box<dyn Predictor>,
    pub regression: Box<dyn Predictor>,
    pub scaler: Box<dyn Scaler>,
}

impl ModelSet {
    pub fn new(
        market: Box<dyn Predictor>,
        price_level: Box<dyn Predictor>,
        regression: Box<dyn Predictor>,
        scaler: Box<dyn Scaler>,
    ) -> Self {
        Self {
            market,
            price_level,
            regression,
            scaler,
        }
    }
}

/// Loader for the model artifact store and reference data store
pub struct ArtifactLoader {
    market_model: PathBuf,
    price_level_model: PathBuf,
    regression_model: PathBuf,
    scaler: PathBuf,
    feature_names: PathBuf,
    mappings: PathBuf,
    required_mappings: Vec<String>,
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ArtifactLoader {
    pub fn from_config(config: &AppConfig) -> Self {
        let artifacts = &config.artifacts;
        Self {
            market_model: artifacts.path_of(&artifacts.market_model),
            price_level_model: artifacts.path_of(&artifacts.price_level_model),
            regression_model: artifacts.path_of(&artifacts.regression_model),
            scaler: artifacts.path_of(&artifacts.scaler),
            feature_names: artifacts.path_of(&artifacts.feature_names),
            mappings: artifacts.path_of(&artifacts.mappings),
            required_mappings: config.reference.required_mappings(),
            onnx_threads: artifacts.onnx_threads,
        }
    }

    fn all_paths(&self) -> [&Path; 6] {
        [
            &self.market_model,
            &self.price_level_model,
            &self.regression_model,
            &self.scaler,
            &self.feature_names,
            &self.mappings,
        ]
        .map(PathBuf::as_path)
    }

    /// Issues for every configured artifact that does not exist.
    pub fn missing_artifacts(&self) -> Vec<InitIssue> {
        self.all_paths()
            .into_iter()
            .filter(|path| !path.exists())
            .map(|path| InitIssue::MissingArtifact {
                path: path.display().to_string(),
            })
            .collect()
    }

    /// Load and validate the mappings and feature lists.
    pub fn load_reference(&self) -> Result<ReferenceData, InitError> {
        let mut issues = Vec::new();

        let mappings = read_json(&self.mappings)
            .map_err(|issue| issues.push(issue))
            .ok()
            .and_then(|doc| {
                MappingTable::from_json(&doc, &self.required_mappings)
                    .map_err(|mut found| issues.append(&mut found))
                    .ok()
            });
        let schema = read_json(&self.feature_names)
            .map_err(|issue| issues.push(issue))
            .ok()
            .and_then(|doc| {
                FeatureSchema::from_json(&doc)
                    .map_err(|mut found| issues.append(&mut found))
                    .ok()
            });

        match (mappings, schema) {
            (Some(mappings), Some(schema)) => {
                info!(
                    mappings = mappings.len(),
                    path = %self.mappings.display(),
                    "Reference data loaded"
                );
                Ok(ReferenceData::new(mappings, schema))
            }
            _ => Err(InitError::new(issues)),
        }
    }

    /// Load the three models and the scaler.
    pub fn load_models(&self) -> Result<ModelSet, InitError> {
        let mut issues = Vec::new();

        let market = self.load_onnx(&self.market_model, "market").map_err(|issue| issues.push(issue));
        let price_level = self
            .load_onnx(&self.price_level_model, "price_level")
            .map_err(|issue| issues.push(issue));
        let regression = self
            .load_onnx(&self.regression_model, "regression")
            .map_err(|issue| issues.push(issue));
        let scaler = StandardScaler::from_json_file(&self.scaler).map_err(|e| {
            issues.push(InitIssue::InvalidArtifact {
                path: self.scaler.display().to_string(),
                reason: format!("{e:#}"),
            })
        });

        match (market, price_level, regression, scaler) {
            (Ok(market), Ok(price_level), Ok(regression), Ok(scaler)) => Ok(ModelSet::new(
                Box::new(market),
                Box::new(price_level),
                Box::new(regression),
                Box::new(scaler),
            )),
            _ => Err(InitError::new(issues)),
        }
    }

    /// Check presence of every artifact, then load all of them.
    ///
    /// When files are missing nothing is parsed and only the missing files are
    /// reported; otherwise problems from reference data and models are combined.
    pub fn load_all(&self) -> Result<(ReferenceData, ModelSet), InitError> {
        InitError::check(self.missing_artifacts()).map_err(log_failure)?;

        let reference = self.load_reference();
        let models = self.load_models();

        match (reference, models) {
            (Ok(reference), Ok(models)) => {
                info!("All artifacts loaded");
                Ok((reference, models))
            }
            (reference, models) => {
                let mut issues = Vec::new();
                if let Err(e) = reference {
                    issues.extend(e.into_issues());
                }
                if let Err(e) = models {
                    issues.extend(e.into_issues());
                }
                Err(log_failure(InitError::new(issues)))
            }
        }
    }

    fn load_onnx(&self, path: &Path, name: &str) -> Result<OnnxPredictor, InitIssue> {
        OnnxPredictor::load(path, name, self.onnx_threads).map_err(|e| InitIssue::InvalidArtifact {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

fn read_json(path: &Path) -> Result<Value, InitIssue> {
    let bytes = std::fs::read(path).map_err(|e| InitIssue::InvalidArtifact {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| InitIssue::InvalidArtifact {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn log_failure(err: InitError) -> InitError {
    for issue in err.issues() {
        error!(issue = %issue, "Initialization problem");
    }
    err
}
