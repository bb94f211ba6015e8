//! Housing Analyzer - Main Entry Point
//!
//! Loads the model artifacts once, analyses every request in the input file
//! and writes one JSON report per line to stdout.
//!
//! Usage:
//!   housing-analyzer [--config <file>] <requests.json | ->
//!   housing-analyzer [--config <file>] --options

use anyhow::{bail, Result};
use housing_analysis_pipeline::{
    config::{AppConfig, LoggingConfig},
    context::ContextCell,
    metrics::AnalysisMetrics,
    option_formatter::{default_option_index, format_mapping},
    sink::ReportWriter,
    source::read_requests,
};
use std::path::PathBuf;
use tracing::{error, info, warn, Subscriber};
use tracing_subscriber::{fmt::MakeWriter, EnvFilter};

static CONTEXT: ContextCell = ContextCell::new();

enum Command {
    Analyze(PathBuf),
    Options,
}

struct CliArgs {
    config: Option<PathBuf>,
    command: Command,
}

impl CliArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut config = None;
        let mut command = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => match args.next() {
                    Some(path) => config = Some(PathBuf::from(path)),
                    None => bail!("--config requires a file path"),
                },
                "--options" => command = Some(Command::Options),
                _ if command.is_none() => command = Some(Command::Analyze(PathBuf::from(arg))),
                _ => bail!("unexpected argument: {arg}"),
            }
        }

        match command {
            Some(command) => Ok(Self { config, command }),
            None => bail!("usage: housing-analyzer [--config <file>] <requests.json | -> | --options"),
        }
    }
}

/// Default directives when `RUST_LOG` is unset: the library and this binary
/// both log at the configured level.
fn default_directives(level: &str) -> String {
    format!("housing_analysis_pipeline={level},{}={level}", env!("CARGO_CRATE_NAME"))
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(&logging.level)))?;
    tracing::subscriber::set_global_default(build_subscriber(&logging.format, filter, std::io::stderr))?;
    Ok(())
}

fn build_subscriber<W>(format: &str, filter: EnvFilter, writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer);

    match format {
        "json" => Box::new(builder.json().finish()),
        "pretty" => Box::new(builder.pretty().finish()),
        _ => Box::new(builder.finish()),
    }
}

fn main() -> Result<()> {
    let args = CliArgs::parse(std::env::args().skip(1))?;

    // Load configuration
    let config = match &args.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    init_logging(&config.logging)?;

    info!("Starting Housing Analyzer");
    info!(
        artifacts = %config.artifacts.dir,
        policy = ?config.inference.policy,
        "Configuration loaded"
    );

    let context = CONTEXT.get_or_try_init(|| housing_analysis_pipeline::AnalysisContext::load(&config))?;

    let mut writer = ReportWriter::new(std::io::stdout().lock());

    match args.command {
        Command::Options => {
            for dimension in &config.reference.categorical {
                let Some(mapping) = context.reference().mappings.get(dimension) else {
                    warn!(dimension = %dimension, "No mapping loaded");
                    continue;
                };
                let options = format_mapping(mapping);
                let preferred = config.reference.preferred_defaults.get(dimension).copied();
                writer.write_options(dimension, &options, default_option_index(&options, preferred))?;
            }
        }
        Command::Analyze(input) => {
            let metrics = AnalysisMetrics::new();
            let requests = read_requests(&input)?;

            for request in &requests {
                match context.analyze(request) {
                    Ok(report) => {
                        metrics.record_report(&report);
                        for (model, detail) in report.runtime_errors() {
                            error!(
                                report_id = %report.report_id,
                                model = %model,
                                detail = %detail,
                                "Model failed for request"
                            );
                        }
                        writer.write_report(&report)?;
                    }
                    Err(e) => {
                        metrics.record_rejected();
                        warn!(request_id = ?request.request_id, error = %e, "Request rejected");
                        writer.write_rejection(request, &e)?;
                    }
                }
            }

            metrics.print_summary();
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs> {
        CliArgs::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_analyze() {
        let args = parse(&["-c", "housing.toml", "requests.json"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("housing.toml")));
        assert!(matches!(args.command, Command::Analyze(ref p) if p == &PathBuf::from("requests.json")));
    }

    #[test]
    fn test_parse_options() {
        let args = parse(&["--options"]).unwrap();
        assert!(args.config.is_none());
        assert!(matches!(args.command, Command::Options));
    }

    #[derive(Clone, Default)]
    struct Capture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs(format: &str, directives: &str, emit: impl FnOnce()) -> String {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = build_subscriber(format, EnvFilter::try_new(directives).unwrap(), move || writer.clone());
        tracing::subscriber::with_default(subscriber, emit);
        let bytes = capture.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_default_directives_keep_binary_events() {
        let logged = capture_logs("json", &default_directives("info"), || {
            error!("Model failed for request");
            warn!("Request rejected");
            info!(target: "housing_analysis_pipeline::metrics", "Analysis run summary");
            tracing::debug!("below the configured level");
        });

        assert!(logged.contains("Model failed for request"));
        assert!(logged.contains("Request rejected"));
        assert!(logged.contains("Analysis run summary"));
        assert!(!logged.contains("below the configured level"));
    }

    #[test]
    fn test_log_formats() {
        let emit = || info!(dimension = "楼层", "Options written");

        let json = capture_logs("json", "info", emit);
        let line: serde_json::Value = serde_json::from_str(json.lines().next().unwrap()).unwrap();
        assert_eq!(line["fields"]["message"], "Options written");

        let pretty = capture_logs("pretty", "info", emit);
        assert!(pretty.contains("Options written"));
        assert!(pretty.contains("src/main.rs"));

        let full = capture_logs("full", "info", emit);
        assert_eq!(full.lines().count(), 1);
        assert!(full.contains("Options written"));
        assert!(full.contains("楼层"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["a.json", "b.json"]).is_err());
    }
}
