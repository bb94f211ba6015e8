//! Per-model prediction outcomes and the combined analysis report

use crate::types::schema::ModelKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A classifier output decoded through its output mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedLabel {
    /// Display label, or an "unknown code" placeholder
    pub label: String,
    /// Integer code returned by the model, when it was integral
    pub code: Option<i64>,
    /// False when the code has no entry in the output mapping
    pub known: bool,
}

/// Successful prediction payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Prediction {
    Label(DecodedLabel),
    Value { value: f64 },
}

/// Result of attempting one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictionOutcome {
    Success { prediction: Prediction },
    /// Required features absent or left unset, in schema order
    InsufficientInput { missing: Vec<String> },
    Failure { detail: String },
    /// Not attempted because an earlier model did not succeed (gated policy only)
    Skipped { blocked_by: ModelKind },
}

impl PredictionOutcome {
    pub fn label(label: DecodedLabel) -> Self {
        PredictionOutcome::Success {
            prediction: Prediction::Label(label),
        }
    }

    pub fn value(value: f64) -> Self {
        PredictionOutcome::Success {
            prediction: Prediction::Value { value },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PredictionOutcome::Success { .. })
    }

    /// Decoded label of a successful classifier outcome.
    pub fn decoded(&self) -> Option<&DecodedLabel> {
        match self {
            PredictionOutcome::Success {
                prediction: Prediction::Label(label),
            } => Some(label),
            _ => None,
        }
    }

    /// Value of a successful regression outcome.
    pub fn predicted_value(&self) -> Option<f64> {
        match self {
            PredictionOutcome::Success {
                prediction: Prediction::Value { value },
            } => Some(*value),
            _ => None,
        }
    }

    pub fn missing(&self) -> Option<&[String]> {
        match self {
            PredictionOutcome::InsufficientInput { missing } => Some(missing),
            _ => None,
        }
    }

    pub fn failure_detail(&self) -> Option<&str> {
        match self {
            PredictionOutcome::Failure { detail } => Some(detail),
            _ => None,
        }
    }

    /// Short status name used in logs and metrics.
    pub fn status_name(&self) -> &'static str {
        match self {
            PredictionOutcome::Success { .. } => "success",
            PredictionOutcome::InsufficientInput { .. } => "insufficient_input",
            PredictionOutcome::Failure { .. } => "failure",
            PredictionOutcome::Skipped { .. } => "skipped",
        }
    }
}

/// Outcome of one model together with the features it consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReport {
    pub model: ModelKind,
    /// Required features in schema order
    pub features: Vec<String>,
    pub outcome: PredictionOutcome,
    /// Wall time spent on this model
    pub elapsed_us: u64,
}

/// Overall state of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Every model succeeded
    Complete,
    /// Some models lacked input or were skipped, none failed
    Partial,
    /// At least one model failed at runtime
    Errors,
}

/// The three model outcomes for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Unique report identifier
    pub report_id: String,

    /// Identifier supplied with the request, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Report generation timestamp
    pub generated_at: DateTime<Utc>,

    pub market: ModelReport,
    pub price_level: ModelReport,
    pub regression: ModelReport,
}

impl AnalysisReport {
    pub fn new(market: ModelReport, price_level: ModelReport, regression: ModelReport) -> Self {
        Self {
            report_id: uuid::Uuid::new_v4().to_string(),
            request_id: None,
            generated_at: Utc::now(),
            market,
            price_level,
            regression,
        }
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn model(&self, kind: ModelKind) -> &ModelReport {
        match kind {
            ModelKind::Market => &self.market,
            ModelKind::PriceLevel => &self.price_level,
            ModelKind::Regression => &self.regression,
        }
    }

    pub fn outcome(&self, kind: ModelKind) -> &PredictionOutcome {
        &self.model(kind).outcome
    }

    pub fn models(&self) -> [&ModelReport; 3] {
        [&self.market, &self.price_level, &self.regression]
    }

    pub fn status(&self) -> ReportStatus {
        let outcomes = self.models().map(|m| &m.outcome);
        if outcomes.iter().any(|o| matches!(o, PredictionOutcome::Failure { .. })) {
            ReportStatus::Errors
        } else if outcomes.iter().all(|o| o.is_success()) {
            ReportStatus::Complete
        } else {
            ReportStatus::Partial
        }
    }

    /// Failure details, in model order.
    pub fn runtime_errors(&self) -> Vec<(ModelKind, &str)> {
        self.models()
            .into_iter()
            .filter_map(|m| m.outcome.failure_detail().map(|d| (m.model, d)))
            .collect()
    }
}
