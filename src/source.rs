//! Request reader for analysis input files

use crate::types::input::AnalysisRequest;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::info;

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<AnalysisRequest>),
    One(AnalysisRequest),
}

/// Parse a JSON document holding one request object or an array of them.
pub fn parse_requests(reader: impl Read) -> Result<Vec<AnalysisRequest>> {
    let parsed: OneOrMany = serde_json::from_reader(reader).context("Failed to parse analysis requests")?;
    Ok(match parsed {
        OneOrMany::Many(requests) => requests,
        OneOrMany::One(request) => vec![request],
    })
}

/// Read requests from a file, or from stdin when the path is `-`.
pub fn read_requests<P: AsRef<Path>>(path: P) -> Result<Vec<AnalysisRequest>> {
    let path = path.as_ref();
    let requests = if path == Path::new("-") {
        parse_requests(std::io::stdin().lock())?
    } else {
        let file = std::fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        parse_requests(std::io::BufReader::new(file)).with_context(|| format!("In {}", path.display()))?
    };

    info!(count = requests.len(), source = %path.display(), "Requests loaded");
    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_request() {
        let requests = parse_requests(r#"{"categorical": {"方位": 2}}"#.as_bytes()).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].categorical["方位"], Some(2));
    }

    #[test]
    fn test_request_array() {
        let requests = parse_requests(
            r#"[{"id": "a", "numeric": {"面积(㎡)": 95.0}}, {"id": "b", "numeric": {"面积(㎡)": null}}]"#.as_bytes(),
        )
        .unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].numeric["面积(㎡)"], None);
    }

    #[test]
    fn test_malformed_input() {
        assert!(parse_requests("[1, 2]".as_bytes()).is_err());
    }
}
