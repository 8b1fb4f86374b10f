//! Creator Metrics: batch analysis of engagement, revenue, and subscriber
//! metrics for the creator dashboard.
//!
//! Reads a JSON array of metric records, prints the analysis as JSON on
//! stdout, and optionally persists the time series to ClickHouse.

use anyhow::Context;
use clap::Parser;
use creator_analytics::ClickHouseSink;
use creator_core::config::{AppConfig, MixedCurrencyPolicy};
use creator_core::types::MetricRecord;
use creator_reporting::MetricsAnalyzer;
use std::io::Read;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "creator-metrics")]
#[command(about = "Aggregate creator metrics into a dashboard analysis")]
#[command(version)]
struct Cli {
    /// JSON file holding an array of metric records (`-` for stdin)
    #[arg(long, short, default_value = "-")]
    input: String,

    /// TOML config file (environment variables still take precedence)
    #[arg(long, env = "CREATOR_METRICS_CONFIG")]
    config: Option<String>,

    /// Node identifier (overrides config)
    #[arg(long, env = "CREATOR_METRICS__NODE_ID")]
    node_id: Option<String>,

    /// Persist time-series points to ClickHouse
    #[arg(long, default_value_t = false)]
    persist: bool,

    /// Omit the time series from the output
    #[arg(long, default_value_t = false)]
    no_time_series: bool,

    /// Fail batches whose revenue spans more than one currency
    #[arg(long, default_value_t = false)]
    reject_mixed_currency: bool,

    /// Pretty-print the JSON result
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

/// Used when `RUST_LOG` is unset. Covers every workspace crate so writer
/// flush failures reach stderr.
const DEFAULT_LOG_FILTER: &str =
    "warn,creator_metrics=info,creator_reporting=info,creator_analytics=info";

fn read_batch(input: &str) -> anyhow::Result<Vec<MetricRecord>> {
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading metric records from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {}", input))?
    };
    serde_json::from_str(&raw).context("parsing metric records")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only the result.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    // An explicit config file must load; otherwise fall back to defaults.
    let mut config = match cli.config.as_deref() {
        Some(path) => AppConfig::load(Some(path))
            .with_context(|| format!("loading config from {}", path))?,
        None => AppConfig::load(None).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        }),
    };

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if cli.persist {
        config.analysis.persist_time_series = true;
    }
    if cli.no_time_series {
        config.analysis.include_time_series = false;
    }
    if cli.reject_mixed_currency {
        config.analysis.mixed_currency = MixedCurrencyPolicy::Reject;
    }

    info!(
        node_id = %config.node_id,
        persist = config.analysis.persist_time_series,
        include_time_series = config.analysis.include_time_series,
        "Configuration loaded"
    );

    let records = read_batch(&cli.input)?;

    let mut analyzer = MetricsAnalyzer::new(config.analysis.clone());
    let mut writer = None;
    if config.analysis.persist_time_series {
        match ClickHouseSink::connect(&config.clickhouse, config.node_id.clone()).await {
            Ok((sink, handle)) => {
                let sink = Arc::new(sink);
                analyzer = analyzer.with_sink(sink.clone());
                writer = Some((sink, handle));
            }
            Err(e) => {
                error!(error = %e, "Failed to connect to ClickHouse, time series will not be persisted");
            }
        }
    }

    let outcome = analyzer.analyze(&records);
    if let Some((sink, handle)) = writer {
        sink.shutdown();
        if let Err(e) = handle.await {
            error!(error = %e, "Time series writer task failed");
        }
    }

    let result = outcome?;
    let json = if cli.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);

    Ok(())
}
