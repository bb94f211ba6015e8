//! Type definitions for the housing analysis pipeline

pub mod input;
pub mod mapping;
pub mod outcome;
pub mod schema;

pub use input::{AnalysisRequest, FeatureValue, NamedValues, NumericEntry, Selection, Slot};
pub use mapping::{Mapping, MappingTable};
pub use outcome::{AnalysisReport, DecodedLabel, ModelReport, Prediction, PredictionOutcome, ReportStatus};
pub use schema::{FeatureSchema, ModelKind};
