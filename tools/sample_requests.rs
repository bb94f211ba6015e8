//! Sample Request Generator
//!
//! Writes a JSON array of random analysis requests to stdout for exercising
//! the analyzer by hand.
//!
//! Usage: sample-requests [count] [unset_rate]

use housing_analysis_pipeline::AnalysisRequest;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::info;

/// Random property generator
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    request_counter: u64,
    /// Probability that any single field is left empty
    unset_rate: f64,
}

impl RequestGenerator {
    fn new(unset_rate: f64) -> Self {
        Self {
            rng: rand::thread_rng(),
            request_counter: 0,
            unset_rate,
        }
    }

    /// Generate a random property listing
    fn generate(&mut self) -> AnalysisRequest {
        self.request_counter += 1;

        let mut categorical = BTreeMap::new();
        categorical.insert("方位".to_string(), self.maybe(|rng| rng.gen_range(0..4)));
        categorical.insert("楼层".to_string(), self.maybe(|rng| rng.gen_range(0..3)));
        categorical.insert("所属区域".to_string(), self.maybe(|rng| rng.gen_range(0..6)));
        categorical.insert("房龄".to_string(), self.maybe(|rng| rng.gen_range(0..4)));

        let area: f64 = self.rng.gen_range(40.0..220.0);
        let unit_price: f64 = self.rng.gen_range(6000.0..16000.0);

        let mut numeric = BTreeMap::new();
        numeric.insert(
            "总价(万)".to_string(),
            self.maybe(|_| (area * unit_price / 10_000.0 * 10.0).round() / 10.0),
        );
        numeric.insert("面积(㎡)".to_string(), Some((area * 10.0).round() / 10.0));
        numeric.insert(
            "建造时间".to_string(),
            self.maybe(|rng| rng.gen_range(1985..=2024) as f64),
        );
        numeric.insert("楼层数".to_string(), self.maybe(|rng| rng.gen_range(2..=34) as f64));
        numeric.insert("室".to_string(), Some(self.rng.gen_range(1..=5) as f64));
        numeric.insert("厅".to_string(), self.maybe(|rng| rng.gen_range(0..=2) as f64));
        numeric.insert("卫".to_string(), self.maybe(|rng| rng.gen_range(1..=3) as f64));

        AnalysisRequest {
            request_id: Some(format!("req_{:08}", self.request_counter)),
            categorical,
            numeric,
        }
    }

    fn maybe<T>(&mut self, value: impl FnOnce(&mut rand::rngs::ThreadRng) -> T) -> Option<T> {
        if self.rng.gen_bool(self.unset_rate) {
            None
        } else {
            Some(value(&mut self.rng))
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_requests=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let count: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(10);
    let unset_rate: f64 = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.1_f64)
        .clamp(0.0, 1.0);

    info!(count = count, unset_rate = unset_rate, "Generating sample requests");

    let mut generator = RequestGenerator::new(unset_rate);
    let requests: Vec<AnalysisRequest> = (0..count).map(|_| generator.generate()).collect();

    let unset_fields: usize = requests
        .iter()
        .map(|r| {
            r.categorical.values().filter(|v| v.is_none()).count()
                + r.numeric.values().filter(|v| v.is_none()).count()
        })
        .sum();

    serde_json::to_writer_pretty(std::io::stdout().lock(), &requests)?;
    println!();

    info!(
        "Completed! Generated {} requests ({} fields left unset)",
        count, unset_fields
    );

    Ok(())
}
