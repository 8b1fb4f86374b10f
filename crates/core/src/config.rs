use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CREATOR_METRICS__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub clickhouse: ClickHouseConfig,
}

/// How a revenue partition spanning several currencies is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedCurrencyPolicy {
    /// Keep going and report a per-currency breakdown next to the totals.
    #[default]
    Breakdown,
    /// Fail the batch with a validation error on the `currency` field.
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_include_time_series")]
    pub include_time_series: bool,
    #[serde(default)]
    pub mixed_currency: MixedCurrencyPolicy,
    #[serde(default)]
    pub persist_time_series: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickHouseConfig {
    #[serde(default = "default_clickhouse_url")]
    pub url: String,
    #[serde(default = "default_clickhouse_db")]
    pub database: String,
    #[serde(default = "default_clickhouse_table")]
    pub table: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_include_time_series() -> bool {
    true
}
fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}
fn default_clickhouse_db() -> String {
    "creator_metrics".to_string()
}
fn default_clickhouse_table() -> String {
    "creator_time_series".to_string()
}
fn default_batch_size() -> usize {
    1000
}
fn default_flush_interval_ms() -> u64 {
    1000
}
fn default_queue_capacity() -> usize {
    100_000
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            include_time_series: default_include_time_series(),
            mixed_currency: MixedCurrencyPolicy::default(),
            persist_time_series: false,
        }
    }
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: default_clickhouse_url(),
            database: default_clickhouse_db(),
            table: default_clickhouse_table(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            analysis: AnalysisConfig::default(),
            clickhouse: ClickHouseConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config
    /// file. A file that is named but missing is an error.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("CREATOR_METRICS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
