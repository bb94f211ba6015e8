//! Decoding of classifier output codes into display labels

use crate::types::mapping::Mapping;
use crate::types::outcome::DecodedLabel;

/// Maps a classifier's numeric output back to its label.
///
/// Codes absent from the mapping decode to a placeholder and are flagged
/// `known = false`; decoding never fails.
pub struct LabelDecoder<'a> {
    mapping: &'a Mapping,
}

impl<'a> LabelDecoder<'a> {
    pub fn new(mapping: &'a Mapping) -> Self {
        Self { mapping }
    }

    pub fn decode(&self, raw: f64) -> DecodedLabel {
        let code = integral_code(raw);

        match code.and_then(|c| self.mapping.label_of(c)) {
            Some(label) => DecodedLabel {
                label: label.to_string(),
                code,
                known: true,
            },
            None => DecodedLabel {
                label: match code {
                    Some(c) => unknown_label(&c.to_string()),
                    None => unknown_label(&raw.to_string()),
                },
                code,
                known: false,
            },
        }
    }
}

/// Placeholder shown for a code with no mapping entry.
pub fn unknown_label(code: &str) -> String {
    format!("unknown code ({code})")
}

fn integral_code(raw: f64) -> Option<i64> {
    if raw.is_finite() && raw.fract() == 0.0 && raw >= i64::MIN as f64 && raw <= i64::MAX as f64 {
        Some(raw as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_code() {
        let mapping = Mapping::from_pairs("市场类别", [("高端", 2)]).unwrap();
        let decoded = LabelDecoder::new(&mapping).decode(2.0);
        assert_eq!(decoded.label, "高端");
        assert_eq!(decoded.code, Some(2));
        assert!(decoded.known);
    }

    #[test]
    fn test_unknown_code_placeholder() {
        let mapping = Mapping::from_pairs("市场类别", [("高端", 2)]).unwrap();
        let decoded = LabelDecoder::new(&mapping).decode(7.0);
        assert!(decoded.label.contains('7'));
        assert_eq!(decoded.code, Some(7));
        assert!(!decoded.known);
    }

    #[test]
    fn test_every_mapped_code_round_trips() {
        let mapping =
            Mapping::from_pairs("是否高于区域均价", [("不高于", 0), ("高于", 1)]).unwrap();
        let decoder = LabelDecoder::new(&mapping);
        for (label, code) in mapping.forward() {
            assert_eq!(&decoder.decode(*code as f64).label, label);
        }
    }

    #[test]
    fn test_fractional_and_nan_outputs() {
        let mapping = Mapping::from_pairs("市场类别", [("高端", 1)]).unwrap();
        let decoder = LabelDecoder::new(&mapping);

        let fractional = decoder.decode(1.5);
        assert_eq!(fractional.code, None);
        assert_eq!(fractional.label, "unknown code (1.5)");

        assert!(!decoder.decode(f64::NAN).known);
    }
}
