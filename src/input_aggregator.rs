//! Merges categorical selections and numeric entries into one named-value table.
//!
//! Explicit "unselected" and "not provided" entries are carried into the
//! merged table as [`Slot::Unset`] so that the inference engine reports them
//! as missing instead of reading a default code or a zero.

use crate::error::RequestError;
use crate::types::input::{AnalysisRequest, FeatureValue, NamedValues, NumericEntry, Selection, Slot};
use crate::types::mapping::MappingTable;
use std::collections::BTreeMap;
use tracing::debug;

/// Builds the per-request [`NamedValues`] table.
pub struct InputAggregator;

impl InputAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Merge two disjoint partial tables.
    ///
    /// A name present in both tables is rejected rather than resolved.
    pub fn merge(
        &self,
        selections: &BTreeMap<String, Selection>,
        numeric: &BTreeMap<String, NumericEntry>,
    ) -> Result<NamedValues, RequestError> {
        let overlapping: Vec<String> = selections
            .keys()
            .filter(|name| numeric.contains_key(*name))
            .cloned()
            .collect();
        if !overlapping.is_empty() {
            return Err(RequestError::OverlappingKeys { keys: overlapping });
        }

        let mut merged = NamedValues::new();

        for (name, selection) in selections {
            let slot = match selection {
                Selection::Code(code) => Slot::Set(FeatureValue::Code(*code)),
                Selection::Unselected => Slot::Unset,
            };
            merged.insert(name.clone(), slot);
        }

        for (name, entry) in numeric {
            let slot = match entry {
                NumericEntry::Value(value) => Slot::Set(FeatureValue::Number(*value)),
                NumericEntry::NotProvided => Slot::Unset,
            };
            merged.insert(name.clone(), slot);
        }

        debug!(
            features = merged.len(),
            unset = merged.iter().filter(|(_, slot)| *slot == Slot::Unset).count(),
            "Inputs merged"
        );

        Ok(merged)
    }

    /// Merge the two tables carried by a request.
    pub fn aggregate(&self, request: &AnalysisRequest) -> Result<NamedValues, RequestError> {
        self.merge(&request.selections(), &request.numeric_entries())
    }

    /// Dimensions whose selected code is not in that dimension's mapping.
    ///
    /// Unselected entries and dimensions without a loaded mapping are not checked.
    pub fn validate_selections(
        &self,
        selections: &BTreeMap<String, Selection>,
        mappings: &MappingTable,
    ) -> Vec<String> {
        selections
            .iter()
            .filter_map(|(name, selection)| match (selection, mappings.get(name)) {
                (Selection::Code(code), Some(mapping)) if !mapping.contains_code(*code) => {
                    Some(name.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl Default for InputAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::mapping::Mapping;

    fn selections(items: &[(&str, Selection)]) -> BTreeMap<String, Selection> {
        items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn numeric(items: &[(&str, NumericEntry)]) -> BTreeMap<String, NumericEntry> {
        items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_merge_preserves_unset_markers() {
        let aggregator = InputAggregator::new();
        let merged = aggregator
            .merge(
                &selections(&[("方位", Selection::Code(2)), ("楼层", Selection::Unselected)]),
                &numeric(&[
                    ("厅", NumericEntry::Value(0.0)),
                    ("总价(万)", NumericEntry::NotProvided),
                ]),
            )
            .unwrap();

        assert_eq!(merged.len(), 4);
        assert_eq!(merged.value("方位"), Some(FeatureValue::Code(2)));
        assert_eq!(merged.value("厅"), Some(FeatureValue::Number(0.0)));
        assert!(merged.is_unset("楼层"));
        assert!(merged.is_unset("总价(万)"));
    }

    #[test]
    fn test_overlap_rejected() {
        let aggregator = InputAggregator::new();
        let err = aggregator
            .merge(
                &selections(&[("房龄", Selection::Code(1))]),
                &numeric(&[("房龄", NumericEntry::Value(8.0))]),
            )
            .unwrap_err();

        assert_eq!(
            err,
            RequestError::OverlappingKeys {
                keys: vec!["房龄".to_string()]
            }
        );
    }

    #[test]
    fn test_validate_selections() {
        let mut mappings = MappingTable::new();
        mappings.insert(Mapping::from_pairs("方位", [("南", 2), ("北", 1)]).unwrap());

        let aggregator = InputAggregator::new();
        let invalid = aggregator.validate_selections(
            &selections(&[
                ("方位", Selection::Code(7)),
                ("楼层", Selection::Code(99)),
                ("房龄", Selection::Unselected),
            ]),
            &mappings,
        );
        assert_eq!(invalid, vec!["方位".to_string()]);
    }
}
