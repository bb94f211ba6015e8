//! Process-wide analysis context: reference data, models and the request path.

use crate::config::AppConfig;
use crate::error::{InitError, RequestError};
use crate::input_aggregator::InputAggregator;
use crate::models::inference::InferenceEngine;
use crate::models::loader::{ArtifactLoader, ModelSet, ReferenceData};
use crate::types::input::AnalysisRequest;
use crate::types::outcome::AnalysisReport;
use std::sync::{Mutex, OnceLock};
use tracing::{debug, info, warn};

/// Everything needed to serve analysis requests. Immutable once built.
pub struct AnalysisContext {
    reference: ReferenceData,
    engine: InferenceEngine,
    aggregator: InputAggregator,
}

impl AnalysisContext {
    pub fn new(reference: ReferenceData, models: ModelSet, config: &AppConfig) -> Self {
        Self {
            reference,
            engine: InferenceEngine::from_config(models, config),
            aggregator: InputAggregator::new(),
        }
    }

    /// Load all artifacts named by the configuration.
    pub fn load(config: &AppConfig) -> Result<Self, InitError> {
        let (reference, models) = ArtifactLoader::from_config(config).load_all()?;
        Ok(Self::new(reference, models, config))
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Validate and merge the request inputs, then run all three models.
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, RequestError> {
        let selections = request.selections();

        let invalid = self
            .aggregator
            .validate_selections(&selections, &self.reference.mappings);
        if !invalid.is_empty() {
            warn!(request_id = ?request.request_id, dimensions = ?invalid, "Rejected selection codes");
            return Err(RequestError::InvalidSelection { dimensions: invalid });
        }

        let inputs = self.aggregator.merge(&selections, &request.numeric_entries())?;
        let report = self
            .engine
            .analyze(&inputs, &self.reference)
            .with_request_id(request.request_id.clone());

        debug!(
            request_id = ?report.request_id,
            report_id = %report.report_id,
            status = ?report.status(),
            "Request analysed"
        );

        Ok(report)
    }
}

/// Lazily initialised [`AnalysisContext`] shared by every caller.
///
/// Initialisation runs at most once successfully; a failed attempt is not
/// cached and the next caller retries.
pub struct ContextCell {
    cell: OnceLock<AnalysisContext>,
    init_lock: Mutex<()>,
}

impl ContextCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    pub fn get(&self) -> Option<&AnalysisContext> {
        self.cell.get()
    }

    pub fn get_or_try_init<F>(&self, init: F) -> Result<&AnalysisContext, InitError>
    where
        F: FnOnce() -> Result<AnalysisContext, InitError>,
    {
        if let Some(context) = self.cell.get() {
            return Ok(context);
        }

        let _guard = self.init_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(context) = self.cell.get() {
            return Ok(context);
        }

        let context = init()?;
        info!("Analysis context initialized");
        Ok(self.cell.get_or_init(|| context))
    }
}

impl Default for ContextCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InferenceError, InitIssue};
    use crate::models::predictor::{Predictor, Scaler};
    use crate::types::mapping::{Mapping, MappingTable};
    use crate::types::schema::FeatureSchema;
    use std::collections::BTreeMap;

    fn stub_context() -> AnalysisContext {
        let mut mappings = MappingTable::new();
        mappings.insert(Mapping::from_pairs("方位", [("南", 2)]).unwrap());
        mappings.insert(Mapping::from_pairs("市场类别", [("高端", 1)]).unwrap());
        mappings.insert(Mapping::from_pairs("是否高于区域均价", [("高于", 1)]).unwrap());
        let schema = FeatureSchema::new(
            vec!["方位".to_string(), "面积(㎡)".to_string()],
            vec!["面积(㎡)".to_string()],
            vec!["面积(㎡)".to_string()],
        )
        .unwrap();

        let one: Box<dyn Predictor> = Box::new(|_: &[f64]| -> Result<f64, InferenceError> { Ok(1.0) });
        let another: Box<dyn Predictor> = Box::new(|_: &[f64]| -> Result<f64, InferenceError> { Ok(1.0) });
        let price: Box<dyn Predictor> = Box::new(|_: &[f64]| -> Result<f64, InferenceError> { Ok(9100.0) });
        let scaler: Box<dyn Scaler> = Box::new(|row: &[f64]| -> Result<Vec<f64>, InferenceError> { Ok(row.to_vec()) });

        AnalysisContext::new(
            ReferenceData::new(mappings, schema),
            ModelSet::new(one, another, price, scaler),
            &AppConfig::default(),
        )
    }

    fn request(orientation: i64) -> AnalysisRequest {
        AnalysisRequest {
            request_id: Some("r-1".to_string()),
            categorical: BTreeMap::from([("方位".to_string(), Some(orientation))]),
            numeric: BTreeMap::from([("面积(㎡)".to_string(), Some(100.0))]),
        }
    }

    #[test]
    fn test_analyze_request() {
        let report = stub_context().analyze(&request(2)).unwrap();
        assert_eq!(report.request_id.as_deref(), Some("r-1"));
        assert_eq!(report.market.outcome.decoded().unwrap().label, "高端");
        assert_eq!(report.regression.outcome.predicted_value(), Some(9100.0));
    }

    #[test]
    fn test_invalid_selection_rejected() {
        let err = stub_context().analyze(&request(9)).unwrap_err();
        assert_eq!(
            err,
            RequestError::InvalidSelection {
                dimensions: vec!["方位".to_string()]
            }
        );
    }

    #[test]
    fn test_cell_initialises_once() {
        let cell = ContextCell::new();
        let mut calls = 0;

        assert!(cell
            .get_or_try_init(|| {
                calls += 1;
                Err(InitError::new(vec![InitIssue::MissingMapping {
                    name: "方位".to_string(),
                }]))
            })
            .is_err());
        assert!(cell.get().is_none());

        cell.get_or_try_init(|| {
            calls += 1;
            Ok(stub_context())
        })
        .unwrap();
        cell.get_or_try_init(|| {
            calls += 1;
            Ok(stub_context())
        })
        .unwrap();

        assert_eq!(calls, 2);
        assert!(cell.get().is_some());
    }
}
