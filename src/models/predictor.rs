//! Narrow interfaces to externally trained models and the regression scaler

use crate::error::InferenceError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// A trained model: one ordered row in, one scalar out.
///
/// Classifiers return an integral class code; regressors a continuous value.
pub trait Predictor: Send + Sync {
    fn predict(&self, row: &[f64]) -> Result<f64, InferenceError>;
}

impl<F> Predictor for F
where
    F: Fn(&[f64]) -> Result<f64, InferenceError> + Send + Sync,
{
    fn predict(&self, row: &[f64]) -> Result<f64, InferenceError> {
        self(row)
    }
}

/// Feature normalization applied to the regressor's input row.
pub trait Scaler: Send + Sync {
    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError>;
}

impl<F> Scaler for F
where
    F: Fn(&[f64]) -> Result<Vec<f64>, InferenceError> + Send + Sync,
{
    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        self(row)
    }
}

/// Standardization with per-feature mean and scale, `(x - mean) / scale`.
///
/// A zero scale is treated as one, matching how constant training columns are
/// exported.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, InferenceError> {
        if mean.len() != scale.len() {
            return Err(InferenceError::ShapeMismatch {
                expected: mean.len(),
                actual: scale.len(),
            });
        }
        Ok(Self { mean, scale })
    }

    /// Load `{"mean": [...], "scale": [...]}` from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let parsed: StandardScaler =
            serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Self::new(parsed.mean, parsed.scale)?)
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

impl Scaler for StandardScaler {
    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if row.len() != self.mean.len() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.mean.len(),
                actual: row.len(),
            });
        }

        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_standard_scaler() {
        let scaler = StandardScaler::new(vec![100.0, 3.0], vec![20.0, 0.0]).unwrap();
        let scaled = scaler.transform(&[120.0, 5.0]).unwrap();
        assert_eq!(scaled, vec![1.0, 2.0]);
    }

    #[test]
    fn test_scaler_shape_mismatch() {
        let scaler = StandardScaler::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        assert_eq!(
            scaler.transform(&[1.0]),
            Err(InferenceError::ShapeMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert!(StandardScaler::new(vec![0.0], vec![]).is_err());
    }

    #[test]
    fn test_scaler_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"mean": [1.0, 2.0, 3.0], "scale": [1.0, 2.0, 3.0]}}"#).unwrap();

        let scaler = StandardScaler::from_json_file(file.path()).unwrap();
        assert_eq!(scaler.len(), 3);
        assert_eq!(scaler.transform(&[2.0, 4.0, 6.0]).unwrap(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_closures_are_predictors() {
        let model = |row: &[f64]| -> Result<f64, InferenceError> { Ok(row.iter().sum()) };
        assert_eq!(model.predict(&[1.0, 2.0]).unwrap(), 3.0);
    }
}
