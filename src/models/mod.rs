//! Model handles, artifact loading, label decoding and inference orchestration

pub mod decoder;
pub mod inference;
pub mod loader;
pub mod onnx;
pub mod predictor;

pub use decoder::LabelDecoder;
pub use inference::InferenceEngine;
pub use loader::{ArtifactLoader, ModelSet, ReferenceData};
pub use onnx::OnnxPredictor;
pub use predictor::{Predictor, Scaler, StandardScaler};
