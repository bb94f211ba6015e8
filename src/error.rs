//! Error taxonomy for initialization, request assembly and model inference.

use std::fmt;

/// One offending item found while loading artifacts or reference data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InitIssue {
    #[error("artifact not found: {path}")]
    MissingArtifact { path: String },

    #[error("artifact {path} could not be loaded: {reason}")]
    InvalidArtifact { path: String, reason: String },

    #[error("mapping '{name}' is missing")]
    MissingMapping { name: String },

    #[error("mapping '{name}' is malformed: {reason}")]
    InvalidMapping { name: String, reason: String },

    #[error("mapping '{name}' assigns code {code} to both '{first}' and '{second}'")]
    DuplicateCode {
        name: String,
        code: i64,
        first: String,
        second: String,
    },

    #[error("feature list '{name}' is missing")]
    MissingFeatureList { name: String },

    #[error("feature list '{name}' is malformed: {reason}")]
    InvalidFeatureList { name: String, reason: String },
}

/// Unrecoverable initialization failure listing every offending item.
#[derive(Debug, Clone, PartialEq)]
pub struct InitError {
    issues: Vec<InitIssue>,
}

impl InitError {
    pub fn new(issues: Vec<InitIssue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[InitIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<InitIssue> {
        self.issues
    }

    /// Ok when no issues were collected, otherwise an error holding all of them.
    pub fn check(issues: Vec<InitIssue>) -> Result<(), Self> {
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Self::new(issues))
        }
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "initialization failed with {} issue(s)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  - {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for InitError {}

/// Failure inside one model's row construction, scaling, prediction or decoding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("feature '{name}' has non-finite value {value}")]
    NonFiniteFeature { name: String, value: f64 },

    #[error("expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("model returned non-finite output {value}")]
    NonFiniteOutput { value: f64 },

    #[error("model produced no usable output")]
    EmptyOutput,

    #[error("output mapping '{name}' is not loaded")]
    MissingOutputMapping { name: String },

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("model panicked: {0}")]
    Panicked(String),
}

/// Rejection of a request before any model is attempted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("features supplied as both categorical and numeric: {}", keys.join(", "))]
    OverlappingKeys { keys: Vec<String> },

    #[error("selected codes not present in mapping for: {}", dimensions.join(", "))]
    InvalidSelection { dimensions: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_error_lists_every_issue() {
        let err = InitError::new(vec![
            InitIssue::MissingMapping {
                name: "方位".to_string(),
            },
            InitIssue::MissingFeatureList {
                name: "regression".to_string(),
            },
        ]);

        let text = err.to_string();
        assert!(text.contains("2 issue(s)"));
        assert!(text.contains("mapping '方位' is missing"));
        assert!(text.contains("feature list 'regression' is missing"));
    }

    #[test]
    fn test_check_passes_without_issues() {
        assert!(InitError::check(Vec::new()).is_ok());
        let err = InitError::check(vec![InitIssue::MissingArtifact {
            path: "scaler.json".to_string(),
        }])
        .unwrap_err();
        assert_eq!(err.issues().len(), 1);
    }
}
