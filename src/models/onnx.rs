//! ONNX Runtime backed predictor

use crate::error::InferenceError;
use crate::models::predictor::Predictor;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// A loaded ONNX model exported from a scikit-learn style estimator.
///
/// The first input takes a `[1, n]` float tensor. The first non-probability
/// output holds the class label (int64) or regression value (float).
pub struct OnnxPredictor {
    /// Model name for logs
    name: String,
    /// `Session::run` needs `&mut self`
    session: Mutex<Session>,
    /// Input name for the model
    input_name: String,
}

impl OnnxPredictor {
    /// Load a model file with the given number of intra-op threads.
    pub fn load<P: AsRef<Path>>(path: P, name: &str, threads: usize) -> ort::Result<Self> {
        let path = path.as_ref();

        info!(model = %name, path = %path.display(), threads = threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(threads)?
            .commit_from_file(path)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        info!(model = %name, input = %input_name, "Model loaded successfully");

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Predictor for OnnxPredictor {
    fn predict(&self, row: &[f64]) -> Result<f64, InferenceError> {
        let features: Vec<f32> = row.iter().map(|&v| v as f32).collect();
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features))
            .map_err(|e| InferenceError::Runtime(format!("tensor creation error: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::Runtime(format!("session lock poisoned: {e}")))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;

        for (output_name, output) in outputs.iter() {
            // seq(map) probability outputs are not needed
            if output_name.contains("prob") {
                continue;
            }

            if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
                if let Some(&label) = data.first() {
                    debug!(model = %self.name, output = %output_name, label = label, "Extracted label");
                    return Ok(label as f64);
                }
            }

            if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
                if let Some(&value) = data.first() {
                    debug!(model = %self.name, output = %output_name, value = value, "Extracted value");
                    return Ok(value as f64);
                }
            }

            if let Ok((_, data)) = output.try_extract_tensor::<f64>() {
                if let Some(&value) = data.first() {
                    return Ok(value);
                }
            }
        }

        Err(InferenceError::EmptyOutput)
    }
}
