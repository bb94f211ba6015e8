//! Request and named-value structures fed to the inference engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A scalar feature value: a categorical code or a numeric reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Code(i64),
    Number(f64),
}

impl FeatureValue {
    pub fn as_f64(self) -> f64 {
        match self {
            FeatureValue::Code(code) => code as f64,
            FeatureValue::Number(value) => value,
        }
    }
}

/// A categorical selection as supplied by the input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Code(i64),
    /// The user left the selector empty.
    Unselected,
}

impl From<Option<i64>> for Selection {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Selection::Unselected, Selection::Code)
    }
}

/// A numeric entry as supplied by the input source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericEntry {
    Value(f64),
    /// The user opted out of this field. Distinct from a reading of zero.
    NotProvided,
}

impl From<Option<f64>> for NumericEntry {
    fn from(value: Option<f64>) -> Self {
        value.map_or(NumericEntry::NotProvided, NumericEntry::Value)
    }
}

/// A collected feature: either a value or an explicit "left unset".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    Set(FeatureValue),
    Unset,
}

/// Merged feature name -> value table for one request.
///
/// A name missing from the table was never collected; a name mapped to
/// [`Slot::Unset`] was collected but deliberately left empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedValues {
    entries: BTreeMap<String, Slot>,
}

impl NamedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, slot: Slot) -> Option<Slot> {
        self.entries.insert(name.into(), slot)
    }

    pub fn set(&mut self, name: impl Into<String>, value: FeatureValue) -> Option<Slot> {
        self.insert(name, Slot::Set(value))
    }

    pub fn set_unset(&mut self, name: impl Into<String>) -> Option<Slot> {
        self.insert(name, Slot::Unset)
    }

    pub fn slot(&self, name: &str) -> Option<Slot> {
        self.entries.get(name).copied()
    }

    /// The value for `name`, if collected and not left unset.
    pub fn value(&self, name: &str) -> Option<FeatureValue> {
        match self.entries.get(name) {
            Some(Slot::Set(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_unset(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(Slot::Unset))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Slot)> {
        self.entries.iter().map(|(name, slot)| (name.as_str(), *slot))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One analysis request as read from the input source.
///
/// A JSON `null` marks a field the user explicitly left empty; a key that is
/// absent was never collected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Caller-supplied identifier echoed in the report
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "id")]
    pub request_id: Option<String>,

    /// Categorical selections: dimension -> code
    #[serde(default)]
    pub categorical: BTreeMap<String, Option<i64>>,

    /// Numeric entries: feature -> reading
    #[serde(default)]
    pub numeric: BTreeMap<String, Option<f64>>,
}

impl AnalysisRequest {
    pub fn selections(&self) -> BTreeMap<String, Selection> {
        self.categorical
            .iter()
            .map(|(name, code)| (name.clone(), Selection::from(*code)))
            .collect()
    }

    pub fn numeric_entries(&self) -> BTreeMap<String, NumericEntry> {
        self.numeric
            .iter()
            .map(|(name, value)| (name.clone(), NumericEntry::from(*value)))
            .collect()
    }
}
