//! Display tables for categorical selectors.
//!
//! Turns a name -> code mapping into options ordered by code, each labelled
//! `"<name> (<code>)"`. Codes that are not all integers fall back to ordering
//! by their text.

use crate::types::mapping::{integral_code, Mapping};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

/// Key under which an option is selected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum OptionKey {
    Code(i64),
    Text(String),
}

/// One selectable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionEntry {
    pub key: OptionKey,
    pub display: String,
}

/// Format a raw JSON mapping.
///
/// Returns an empty table when `mapping` is not an object of scalar codes;
/// callers treat that as "no options available".
pub fn format_options(mapping: &Value) -> Vec<OptionEntry> {
    let Some(object) = mapping.as_object() else {
        return Vec::new();
    };

    let mut entries: Vec<(OptionKey, &str, String)> = Vec::with_capacity(object.len());
    for (name, code) in object {
        let (parsed, text) = match code {
            Value::Number(n) => (n.as_i64().or_else(|| n.as_f64().and_then(integral_code)), n.to_string()),
            Value::String(s) => (s.trim().parse().ok(), s.clone()),
            _ => return Vec::new(),
        };
        let key = parsed.map_or_else(|| OptionKey::Text(text.clone()), OptionKey::Code);
        entries.push((key, name.as_str(), text));
    }

    let numeric = entries.iter().all(|(key, _, _)| matches!(key, OptionKey::Code(_)));
    entries.sort_by(|a, b| {
        let by_code = if numeric {
            compare_codes(&a.0, &b.0)
        } else {
            a.2.cmp(&b.2)
        };
        by_code.then_with(|| a.1.cmp(&b.1))
    });

    entries
        .into_iter()
        .map(|(key, name, text)| OptionEntry {
            key,
            display: format!("{name} ({text})"),
        })
        .collect()
}

fn compare_codes(a: &OptionKey, b: &OptionKey) -> Ordering {
    match (a, b) {
        (OptionKey::Code(x), OptionKey::Code(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Format a validated mapping; its codes are always integers.
pub fn format_mapping(mapping: &Mapping) -> Vec<OptionEntry> {
    let mut entries: Vec<(i64, &String)> = mapping.forward().iter().map(|(name, code)| (*code, name)).collect();
    entries.sort();

    entries
        .into_iter()
        .map(|(code, name)| OptionEntry {
            key: OptionKey::Code(code),
            display: format!("{name} ({code})"),
        })
        .collect()
}

/// Index of the initially selected option.
///
/// The preferred code wins when present; otherwise the middle option is used
/// for tables with more than one entry, and the first for single entries.
pub fn default_option_index(options: &[OptionEntry], preferred: Option<i64>) -> Option<usize> {
    if options.is_empty() {
        return None;
    }

    if let Some(code) = preferred {
        if let Some(index) = options.iter().position(|o| o.key == OptionKey::Code(code)) {
            return Some(index);
        }
    }

    if options.len() > 1 {
        Some(options.len() / 2)
    } else {
        Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn displays(entries: &[OptionEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.display.as_str()).collect()
    }

    #[test]
    fn test_sorted_by_numeric_code() {
        let entries = format_options(&json!({"南": 2, "北": 1, "东": 0}));
        assert_eq!(displays(&entries), ["东 (0)", "北 (1)", "南 (2)"]);
        assert_eq!(entries[0].key, OptionKey::Code(0));
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        let entries = format_options(&json!({"a": 10, "b": 9, "c": "2"}));
        assert_eq!(displays(&entries), ["c (2)", "b (9)", "a (10)"]);
    }

    #[test]
    fn test_whole_float_codes_sort_numerically() {
        let entries = format_options(&json!({"高楼层": 10.0, "中楼层": 2.0, "低楼层": 1}));
        assert_eq!(displays(&entries), ["低楼层 (1)", "中楼层 (2.0)", "高楼层 (10.0)"]);
        assert_eq!(entries[2].key, OptionKey::Code(10));

        let fractional = format_options(&json!({"a": 1.5, "b": 10}));
        assert_eq!(displays(&fractional), ["a (1.5)", "b (10)"]);
    }

    #[test]
    fn test_non_integer_codes_fall_back_to_text_order() {
        let entries = format_options(&json!({"高": "h", "低": "l", "中": 10}));
        assert_eq!(displays(&entries), ["中 (10)", "高 (h)", "低 (l)"]);
        assert_eq!(entries[0].key, OptionKey::Code(10));
        assert_eq!(entries[1].key, OptionKey::Text("h".to_string()));
    }

    #[test]
    fn test_invalid_mapping_yields_empty_table() {
        assert!(format_options(&json!(["南", "北"])).is_empty());
        assert!(format_options(&json!("方位")).is_empty());
        assert!(format_options(&json!({"南": {"code": 2}})).is_empty());
        assert!(format_options(&json!({})).is_empty());
    }

    #[test]
    fn test_format_validated_mapping() {
        let mapping = Mapping::from_pairs("楼层", [("高楼层", 2), ("低楼层", 0), ("中楼层", 1)]).unwrap();
        let entries = format_mapping(&mapping);
        assert_eq!(displays(&entries), ["低楼层 (0)", "中楼层 (1)", "高楼层 (2)"]);
    }

    #[test]
    fn test_default_index() {
        let entries = format_options(&json!({"低": 0, "中": 1, "高": 2, "顶": 3}));
        assert_eq!(default_option_index(&entries, Some(1)), Some(1));
        assert_eq!(default_option_index(&entries, Some(9)), Some(2));
        assert_eq!(default_option_index(&entries, None), Some(2));
        assert_eq!(default_option_index(&entries[..1], None), Some(0));
        assert_eq!(default_option_index(&[], Some(1)), None);
    }
}
