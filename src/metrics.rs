//! Run statistics for the analysis pipeline.

use crate::types::outcome::{AnalysisReport, ReportStatus};
use crate::types::schema::ModelKind;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;
use tracing::info;

/// Metrics collector for analysis runs
pub struct AnalysisMetrics {
    /// Requests analysed (including partial results)
    pub requests_analysed: AtomicU64,
    /// Requests rejected before inference
    pub requests_rejected: AtomicU64,
    /// Outcome counts keyed by (model, status name)
    outcomes: RwLock<HashMap<(ModelKind, &'static str), u64>>,
    /// Report status counts
    statuses: RwLock<HashMap<ReportStatus, u64>>,
    /// Model times (in microseconds), attempted models only
    model_times: RwLock<HashMap<ModelKind, Vec<u64>>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl AnalysisMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_analysed: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            outcomes: RwLock::new(HashMap::new()),
            statuses: RwLock::new(HashMap::new()),
            model_times: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record a finished report
    pub fn record_report(&self, report: &AnalysisReport) {
        self.requests_analysed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut statuses) = self.statuses.write() {
            *statuses.entry(report.status()).or_insert(0) += 1;
        }

        for model in report.models() {
            let status = model.outcome.status_name();
            if let Ok(mut outcomes) = self.outcomes.write() {
                *outcomes.entry((model.model, status)).or_insert(0) += 1;
            }

            if status == "skipped" || status == "insufficient_input" {
                continue;
            }
            if let Ok(mut times) = self.model_times.write() {
                let model_times = times.entry(model.model).or_default();
                model_times.push(model.elapsed_us);
                // Keep only last 1000 per model
                if model_times.len() > 1000 {
                    model_times.drain(0..500);
                }
            }
        }
    }

    /// Record a request rejected before inference
    pub fn record_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of outcomes with the given status for one model
    pub fn outcome_count(&self, model: ModelKind, status: &str) -> u64 {
        self.outcomes
            .read()
            .map(|outcomes| {
                outcomes
                    .iter()
                    .filter(|((kind, name), _)| *kind == model && *name == status)
                    .map(|(_, count)| *count)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Number of reports with the given overall status
    pub fn status_count(&self, status: ReportStatus) -> u64 {
        self.statuses
            .read()
            .map(|statuses| statuses.get(&status).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Get model performance stats
    pub fn get_model_stats(&self) -> HashMap<ModelKind, ModelStats> {
        let mut stats = HashMap::new();
        let Ok(times) = self.model_times.read() else {
            return stats;
        };

        for (model, model_times) in times.iter() {
            if model_times.is_empty() {
                continue;
            }

            let mut sorted: Vec<u64> = model_times.clone();
            sorted.sort_unstable();

            let sum: u64 = sorted.iter().sum();
            let count = sorted.len();

            stats.insert(
                *model,
                ModelStats {
                    calls: count as u64,
                    mean_us: sum / count as u64,
                    p50_us: sorted[count / 2],
                    p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
                },
            );
        }

        stats
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let analysed = self.requests_analysed.load(Ordering::Relaxed);
        let rejected = self.requests_rejected.load(Ordering::Relaxed);
        let elapsed = self.start_time.elapsed();

        info!(
            analysed = analysed,
            rejected = rejected,
            complete = self.status_count(ReportStatus::Complete),
            partial = self.status_count(ReportStatus::Partial),
            errors = self.status_count(ReportStatus::Errors),
            elapsed_ms = elapsed.as_millis() as u64,
            "Analysis run summary"
        );

        let model_stats = self.get_model_stats();
        for model in ModelKind::ALL {
            let stats = model_stats.get(&model);
            info!(
                model = %model,
                success = self.outcome_count(model, "success"),
                insufficient_input = self.outcome_count(model, "insufficient_input"),
                failure = self.outcome_count(model, "failure"),
                skipped = self.outcome_count(model, "skipped"),
                mean_us = stats.map(|s| s.mean_us),
                p50_us = stats.map(|s| s.p50_us),
                p99_us = stats.map(|s| s.p99_us),
                "Model summary"
            );
        }
    }
}

impl Default for AnalysisMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Model-specific statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ModelStats {
    pub calls: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::outcome::{ModelReport, PredictionOutcome};

    fn model(kind: ModelKind, outcome: PredictionOutcome, elapsed_us: u64) -> ModelReport {
        ModelReport {
            model: kind,
            features: Vec::new(),
            outcome,
            elapsed_us,
        }
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = AnalysisMetrics::new();

        let report = AnalysisReport::new(
            model(ModelKind::Market, PredictionOutcome::value(1.0), 100),
            model(
                ModelKind::PriceLevel,
                PredictionOutcome::InsufficientInput {
                    missing: vec!["总价(万)".to_string()],
                },
                5,
            ),
            model(ModelKind::Regression, PredictionOutcome::value(8000.0), 300),
        );
        metrics.record_report(&report);
        metrics.record_report(&report);
        metrics.record_rejected();

        assert_eq!(metrics.requests_analysed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.requests_rejected.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.status_count(ReportStatus::Partial), 2);
        assert_eq!(metrics.outcome_count(ModelKind::PriceLevel, "insufficient_input"), 2);
        assert_eq!(metrics.outcome_count(ModelKind::Market, "success"), 2);

        let stats = metrics.get_model_stats();
        assert_eq!(stats[&ModelKind::Regression].mean_us, 300);
        assert!(!stats.contains_key(&ModelKind::PriceLevel));
    }
}
