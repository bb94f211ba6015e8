//! Housing Analysis Pipeline Library
//!
//! Assembles property attributes into per-model feature rows and runs three
//! pre-trained models (market segment, price level relative to district, and
//! unit price) with per-model outcome isolation.

pub mod config;
pub mod context;
pub mod error;
pub mod input_aggregator;
pub mod metrics;
pub mod models;
pub mod option_formatter;
pub mod sink;
pub mod source;
pub mod types;

pub use config::{AppConfig, GatingPolicy};
pub use context::{AnalysisContext, ContextCell};
pub use error::{InferenceError, InitError, InitIssue, RequestError};
pub use input_aggregator::InputAggregator;
pub use models::inference::InferenceEngine;
pub use types::{
    input::{AnalysisRequest, FeatureValue, NamedValues, NumericEntry, Selection},
    outcome::{AnalysisReport, PredictionOutcome},
    schema::{FeatureSchema, ModelKind},
};
