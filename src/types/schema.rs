//! Per-model ordered feature lists

use crate::error::InitIssue;
use crate::types::mapping::json_kind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// The three models run for every request, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Market segment classifier
    Market,
    /// Above/below district average price classifier
    PriceLevel,
    /// Unit price regressor
    Regression,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Market, ModelKind::PriceLevel, ModelKind::Regression];

    /// Key of this model's list in the feature-names document.
    pub fn schema_key(self) -> &'static str {
        match self {
            ModelKind::Market => "market",
            ModelKind::PriceLevel => "price_level",
            ModelKind::Regression => "regression",
        }
    }

    /// Only the regressor consumes scaled input.
    pub fn requires_scaling(self) -> bool {
        matches!(self, ModelKind::Regression)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema_key())
    }
}

/// Feature names each model expects, in training order.
///
/// The order is never changed after loading; rows are built by walking these
/// lists front to back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSchema {
    market: Vec<String>,
    price_level: Vec<String>,
    regression: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema, validating every list and reporting all problems together.
    pub fn new(
        market: Vec<String>,
        price_level: Vec<String>,
        regression: Vec<String>,
    ) -> Result<Self, Vec<InitIssue>> {
        let mut issues = Vec::new();
        for (kind, list) in [
            (ModelKind::Market, &market),
            (ModelKind::PriceLevel, &price_level),
            (ModelKind::Regression, &regression),
        ] {
            if let Err(issue) = validate_list(kind, list) {
                issues.push(issue);
            }
        }

        if !issues.is_empty() {
            return Err(issues);
        }

        Ok(Self {
            market,
            price_level,
            regression,
        })
    }

    /// Parse `{"market": [...], "price_level": [...], "regression": [...]}`.
    pub fn from_json(value: &Value) -> Result<Self, Vec<InitIssue>> {
        let Some(object) = value.as_object() else {
            return Err(vec![InitIssue::InvalidFeatureList {
                name: "<root>".to_string(),
                reason: format!("expected an object, found {}", json_kind(value)),
            }]);
        };

        let mut issues = Vec::new();
        let mut lists: Vec<Vec<String>> = Vec::with_capacity(3);

        for kind in ModelKind::ALL {
            let name = kind.schema_key();
            let parsed = match object.get(name) {
                None => Err(InitIssue::MissingFeatureList {
                    name: name.to_string(),
                }),
                Some(raw) => parse_list(name, raw).and_then(|list| {
                    validate_list(kind, &list)?;
                    Ok(list)
                }),
            };
            match parsed {
                Ok(list) => lists.push(list),
                Err(issue) => {
                    issues.push(issue);
                    lists.push(Vec::new());
                }
            }
        }

        if !issues.is_empty() {
            return Err(issues);
        }

        let regression = lists.pop().unwrap_or_default();
        let price_level = lists.pop().unwrap_or_default();
        let market = lists.pop().unwrap_or_default();
        Ok(Self {
            market,
            price_level,
            regression,
        })
    }

    pub fn features(&self, kind: ModelKind) -> &[String] {
        match kind {
            ModelKind::Market => &self.market,
            ModelKind::PriceLevel => &self.price_level,
            ModelKind::Regression => &self.regression,
        }
    }
}

fn parse_list(name: &str, raw: &Value) -> Result<Vec<String>, InitIssue> {
    let items = raw.as_array().ok_or_else(|| InitIssue::InvalidFeatureList {
        name: name.to_string(),
        reason: format!("expected an array, found {}", json_kind(raw)),
    })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| InitIssue::InvalidFeatureList {
                    name: name.to_string(),
                    reason: format!("entry {i} is {}, not a string", json_kind(item)),
                })
        })
        .collect()
}

fn validate_list(kind: ModelKind, list: &[String]) -> Result<(), InitIssue> {
    let name = kind.schema_key();
    if list.is_empty() {
        return Err(InitIssue::InvalidFeatureList {
            name: name.to_string(),
            reason: "list is empty".to_string(),
        });
    }

    let mut seen = HashSet::with_capacity(list.len());
    for feature in list {
        if feature.trim().is_empty() {
            return Err(InitIssue::InvalidFeatureList {
                name: name.to_string(),
                reason: "blank feature name".to_string(),
            });
        }
        if !seen.insert(feature.as_str()) {
            return Err(InitIssue::InvalidFeatureList {
                name: name.to_string(),
                reason: format!("feature '{feature}' listed twice"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_is_preserved() {
        let schema = FeatureSchema::from_json(&json!({
            "market": ["面积(㎡)", "方位", "室"],
            "price_level": ["总价(万)", "所属区域"],
            "regression": ["面积(㎡)", "楼层数"],
        }))
        .unwrap();

        assert_eq!(schema.features(ModelKind::Market), ["面积(㎡)", "方位", "室"]);
        assert_eq!(schema.features(ModelKind::Regression), ["面积(㎡)", "楼层数"]);
    }

    #[test]
    fn test_all_list_problems_reported() {
        let issues = FeatureSchema::from_json(&json!({
            "market": [],
            "price_level": "总价(万)",
        }))
        .unwrap_err();

        assert_eq!(issues.len(), 3);
        assert!(issues.contains(&InitIssue::MissingFeatureList {
            name: "regression".to_string()
        }));
    }

    #[test]
    fn test_duplicate_feature_rejected() {
        let issues = FeatureSchema::new(
            vec!["方位".to_string(), "方位".to_string()],
            vec!["室".to_string()],
            vec!["厅".to_string()],
        )
        .unwrap_err();
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_model_kind_display() {
        assert_eq!(ModelKind::PriceLevel.to_string(), "price_level");
        assert!(ModelKind::Regression.requires_scaling());
        assert!(!ModelKind::Market.requires_scaling());
    }
}
