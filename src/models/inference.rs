//! Three-model inference engine
//!
//! For each model, in order market segment, price level, unit price:
//! resolve the required features, stop with `InsufficientInput` if any are
//! missing, build the row in schema order, scale it (regressor only), predict,
//! then decode (classifiers) or clamp at zero (regressor). Errors and panics
//! inside one model become that model's `Failure` and never reach the others.

use crate::config::{AppConfig, GatingPolicy};
use crate::error::InferenceError;
use crate::models::decoder::LabelDecoder;
use crate::models::loader::{ModelSet, ReferenceData};
use crate::models::predictor::Predictor;
use crate::types::input::NamedValues;
use crate::types::outcome::{AnalysisReport, ModelReport, Prediction, PredictionOutcome};
use crate::types::schema::ModelKind;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Runs the market segment, price level and unit price models for one input snapshot.
pub struct InferenceEngine {
    models: ModelSet,
    policy: GatingPolicy,
    /// Output mapping of the market segment classifier
    market_labels: String,
    /// Output mapping of the price level classifier
    price_level_labels: String,
}

impl InferenceEngine {
    pub fn new(
        models: ModelSet,
        policy: GatingPolicy,
        market_labels: impl Into<String>,
        price_level_labels: impl Into<String>,
    ) -> Self {
        Self {
            models,
            policy,
            market_labels: market_labels.into(),
            price_level_labels: price_level_labels.into(),
        }
    }

    /// Create an inference engine from configuration
    pub fn from_config(models: ModelSet, config: &AppConfig) -> Self {
        info!(policy = ?config.inference.policy, "Inference engine initialized");
        Self::new(
            models,
            config.inference.policy,
            config.reference.market_labels.clone(),
            config.reference.price_level_labels.clone(),
        )
    }

    pub fn policy(&self) -> GatingPolicy {
        self.policy
    }

    /// Attempt all three models and collect their outcomes.
    pub fn analyze(&self, inputs: &NamedValues, reference: &ReferenceData) -> AnalysisReport {
        let market = self.run_model(ModelKind::Market, inputs, reference);

        let gate_open = self.policy == GatingPolicy::Isolated || market.outcome.is_success();
        let [price_level, regression] = [ModelKind::PriceLevel, ModelKind::Regression].map(|kind| {
            if gate_open {
                self.run_model(kind, inputs, reference)
            } else {
                debug!(model = %kind, "Skipped, market segment did not succeed");
                ModelReport {
                    model: kind,
                    features: reference.schema.features(kind).to_vec(),
                    outcome: PredictionOutcome::Skipped {
                        blocked_by: ModelKind::Market,
                    },
                    elapsed_us: 0,
                }
            }
        });

        AnalysisReport::new(market, price_level, regression)
    }

    /// Attempt one model.
    pub fn run_model(&self, kind: ModelKind, inputs: &NamedValues, reference: &ReferenceData) -> ModelReport {
        let start = Instant::now();
        let required = reference.schema.features(kind);

        let missing = missing_features(required, inputs);
        let outcome = if !missing.is_empty() {
            warn!(model = %kind, missing = ?missing, "Insufficient input");
            PredictionOutcome::InsufficientInput { missing }
        } else {
            match catch_panic(|| self.infer(kind, required, inputs, reference)) {
                Ok(prediction) => {
                    debug!(model = %kind, prediction = ?prediction, "Prediction complete");
                    PredictionOutcome::Success { prediction }
                }
                Err(e) => {
                    error!(model = %kind, error = %e, "Model inference failed");
                    PredictionOutcome::Failure {
                        detail: format!("{kind} model: {e}"),
                    }
                }
            }
        };

        ModelReport {
            model: kind,
            features: required.to_vec(),
            outcome,
            elapsed_us: start.elapsed().as_micros() as u64,
        }
    }

    fn infer(
        &self,
        kind: ModelKind,
        required: &[String],
        inputs: &NamedValues,
        reference: &ReferenceData,
    ) -> Result<Prediction, InferenceError> {
        let row = build_row(required, inputs)?;

        let row = if kind.requires_scaling() {
            let scaled = self.models.scaler.transform(&row)?;
            if scaled.len() != row.len() {
                return Err(InferenceError::ShapeMismatch {
                    expected: row.len(),
                    actual: scaled.len(),
                });
            }
            scaled
        } else {
            row
        };

        let raw = self.predictor(kind).predict(&row)?;

        match kind {
            ModelKind::Market | ModelKind::PriceLevel => {
                let name = if kind == ModelKind::Market {
                    &self.market_labels
                } else {
                    &self.price_level_labels
                };
                let mapping = reference
                    .mappings
                    .get(name)
                    .ok_or_else(|| InferenceError::MissingOutputMapping { name: name.clone() })?;

                let decoded = LabelDecoder::new(mapping).decode(raw);
                if !decoded.known {
                    warn!(model = %kind, raw = raw, "Model returned a code absent from its output mapping");
                }
                Ok(Prediction::Label(decoded))
            }
            ModelKind::Regression => {
                if !raw.is_finite() {
                    return Err(InferenceError::NonFiniteOutput { value: raw });
                }
                Ok(Prediction::Value { value: raw.max(0.0) })
            }
        }
    }

    fn predictor(&self, kind: ModelKind) -> &dyn Predictor {
        match kind {
            ModelKind::Market => self.models.market.as_ref(),
            ModelKind::PriceLevel => self.models.price_level.as_ref(),
            ModelKind::Regression => self.models.regression.as_ref(),
        }
    }
}

/// Required features that are absent or left unset, in schema order.
pub fn missing_features(required: &[String], inputs: &NamedValues) -> Vec<String> {
    let mut seen = HashSet::new();
    required
        .iter()
        .filter(|name| inputs.value(name).is_none())
        .filter(|name| seen.insert(*name))
        .cloned()
        .collect()
}

/// Read each required feature in schema order into a single row.
pub fn build_row(required: &[String], inputs: &NamedValues) -> Result<Vec<f64>, InferenceError> {
    required
        .iter()
        .map(|name| {
            let value = inputs
                .value(name)
                .ok_or_else(|| InferenceError::Runtime(format!("feature '{name}' not available")))?
                .as_f64();
            if value.is_finite() {
                Ok(value)
            } else {
                Err(InferenceError::NonFiniteFeature {
                    name: name.clone(),
                    value,
                })
            }
        })
        .collect()
}

fn catch_panic<T>(f: impl FnOnce() -> Result<T, InferenceError>) -> Result<T, InferenceError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(InferenceError::Panicked(message))
        }
    }
}
