//! JSON-lines writer for analysis reports

use crate::error::RequestError;
use crate::option_formatter::OptionEntry;
use crate::types::input::AnalysisRequest;
use crate::types::outcome::AnalysisReport;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use tracing::debug;

#[derive(Serialize)]
struct Rejection<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
    rejected: String,
}

#[derive(Serialize)]
struct OptionTable<'a> {
    dimension: &'a str,
    options: &'a [OptionEntry],
    #[serde(skip_serializing_if = "Option::is_none")]
    default_index: Option<usize>,
}

/// Writes one JSON document per line
pub struct ReportWriter<W: Write> {
    out: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Write an analysis report
    pub fn write_report(&mut self, report: &AnalysisReport) -> Result<()> {
        self.write_line(report)?;
        debug!(report_id = %report.report_id, "Report written");
        Ok(())
    }

    /// Write a request rejected before inference
    pub fn write_rejection(&mut self, request: &AnalysisRequest, error: &RequestError) -> Result<()> {
        self.write_line(&Rejection {
            request_id: request.request_id.as_deref(),
            rejected: error.to_string(),
        })
    }

    /// Write the selectable options of one categorical dimension
    pub fn write_options(
        &mut self,
        dimension: &str,
        options: &[OptionEntry],
        default_index: Option<usize>,
    ) -> Result<()> {
        self.write_line(&OptionTable {
            dimension,
            options,
            default_index,
        })
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line<T: Serialize>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer(&mut self.out, value)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option_formatter::OptionKey;

    #[test]
    fn test_rejection_line() {
        let mut writer = ReportWriter::new(Vec::new());
        let request = AnalysisRequest {
            request_id: Some("r-9".to_string()),
            ..Default::default()
        };
        writer
            .write_rejection(
                &request,
                &RequestError::InvalidSelection {
                    dimensions: vec!["方位".to_string()],
                },
            )
            .unwrap();

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let line: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(line["request_id"], "r-9");
        assert!(line["rejected"].as_str().unwrap().contains("方位"));
    }

    #[test]
    fn test_options_line() {
        let mut writer = ReportWriter::new(Vec::new());
        let options = vec![OptionEntry {
            key: OptionKey::Code(0),
            display: "东 (0)".to_string(),
        }];
        writer.write_options("方位", &options, Some(0)).unwrap();
        writer.write_options("楼层", &[], None).unwrap();

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""key":0"#));
        assert!(!lines[1].contains("default_index"));
    }
}
