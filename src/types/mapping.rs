//! Bidirectional name <-> code tables for categorical features and model outputs

use crate::error::InitIssue;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// A name -> code table with its precomputed inverse.
///
/// Codes are unique, so the inverse is unambiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    name: String,
    forward: BTreeMap<String, i64>,
    inverse: BTreeMap<i64, String>,
}

impl Mapping {
    /// Build a mapping from (display name, code) pairs, rejecting duplicate codes.
    pub fn from_pairs<I, S>(name: &str, pairs: I) -> Result<Self, InitIssue>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let mut forward = BTreeMap::new();
        let mut inverse: BTreeMap<i64, String> = BTreeMap::new();

        for (label, code) in pairs {
            let label = label.into();
            if let Some(existing) = inverse.get(&code) {
                return Err(InitIssue::DuplicateCode {
                    name: name.to_string(),
                    code,
                    first: existing.clone(),
                    second: label,
                });
            }
            inverse.insert(code, label.clone());
            forward.insert(label, code);
        }

        Ok(Self {
            name: name.to_string(),
            forward,
            inverse,
        })
    }

    /// Parse a JSON object of `{"<name>": <code>}`.
    ///
    /// Codes may be JSON integers or strings holding an integer.
    pub fn from_json(name: &str, value: &Value) -> Result<Self, InitIssue> {
        let object = value.as_object().ok_or_else(|| InitIssue::InvalidMapping {
            name: name.to_string(),
            reason: format!("expected an object, found {}", json_kind(value)),
        })?;

        let mut pairs = Vec::with_capacity(object.len());
        for (label, code) in object {
            let code = parse_code(code).ok_or_else(|| InitIssue::InvalidMapping {
                name: name.to_string(),
                reason: format!("code for '{label}' is not an integer: {code}"),
            })?;
            pairs.push((label.clone(), code));
        }

        Self::from_pairs(name, pairs)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code_of(&self, label: &str) -> Option<i64> {
        self.forward.get(label).copied()
    }

    pub fn label_of(&self, code: i64) -> Option<&str> {
        self.inverse.get(&code).map(String::as_str)
    }

    pub fn contains_code(&self, code: i64) -> bool {
        self.inverse.contains_key(&code)
    }

    pub fn forward(&self) -> &BTreeMap<String, i64> {
        &self.forward
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// Integer code from a JSON number or numeric string.
pub(crate) fn parse_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral_code)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Whole-number floats such as `2.0` stand for the integer code they denote.
pub(crate) fn integral_code(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64).then_some(value as i64)
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// All mappings loaded from the reference data store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTable {
    mappings: BTreeMap<String, Mapping>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mapping: Mapping) {
        self.mappings.insert(mapping.name().to_string(), mapping);
    }

    /// Parse the mappings document and validate the required entries.
    ///
    /// Required mappings that are absent or malformed are all reported. Optional
    /// mappings that fail to parse are skipped with a warning.
    pub fn from_json(value: &Value, required: &[String]) -> Result<Self, Vec<InitIssue>> {
        let Some(object) = value.as_object() else {
            return Err(vec![InitIssue::InvalidMapping {
                name: "<root>".to_string(),
                reason: format!("expected an object, found {}", json_kind(value)),
            }]);
        };

        let mut table = Self::new();
        let mut issues = Vec::new();

        for name in required {
            match object.get(name) {
                None => issues.push(InitIssue::MissingMapping { name: name.clone() }),
                Some(raw) => match Mapping::from_json(name, raw) {
                    Ok(mapping) => table.insert(mapping),
                    Err(issue) => issues.push(issue),
                },
            }
        }

        for (name, raw) in object {
            if required.contains(name) {
                continue;
            }
            match Mapping::from_json(name, raw) {
                Ok(mapping) => table.insert(mapping),
                Err(issue) => warn!(mapping = %name, issue = %issue, "Skipping optional mapping"),
            }
        }

        if issues.is_empty() {
            Ok(table)
        } else {
            Err(issues)
        }
    }

    pub fn get(&self, name: &str) -> Option<&Mapping> {
        self.mappings.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
