//! Asynchronous time-series sink that batches points and writes to ClickHouse.
//! Uses a channel-based architecture so `insert` never blocks the analyzer.

use clickhouse::Row;
use creator_core::config::ClickHouseConfig;
use creator_core::{MetricsError, MetricsResult, TimeSeriesRow, TimeSeriesSink};
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Wire shape of one point. `timestamp` is epoch milliseconds, matching the
/// `DateTime64(3)` column.
#[derive(Debug, Clone, PartialEq, Serialize, Row)]
pub struct PointRow {
    pub source_id: String,
    pub category: String,
    pub timestamp: i64,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub sum: f64,
    pub node_id: String,
}

impl PointRow {
    pub fn new(row: TimeSeriesRow, node_id: &str) -> Self {
        Self {
            source_id: row.source_id,
            category: row.category.as_str().to_string(),
            timestamp: row.timestamp.timestamp_millis(),
            value: row.value,
            min: row.min,
            max: row.max,
            avg: row.avg,
            sum: row.sum,
            node_id: node_id.to_string(),
        }
    }
}

/// Time-series sink with a background batch writer.
///
/// [`shutdown`](Self::shutdown) (or dropping the sink) closes the queue; the
/// writer then flushes what is left and its task completes.
pub struct ClickHouseSink {
    sender: Mutex<Option<mpsc::Sender<PointRow>>>,
    node_id: String,
}

impl ClickHouseSink {
    /// Verify the schema, spawn the background writer, and return the sink
    /// together with the writer's task handle.
    pub async fn connect(
        config: &ClickHouseConfig,
        node_id: String,
    ) -> anyhow::Result<(Self, JoinHandle<()>)> {
        let (sender, receiver) = mpsc::channel::<PointRow>(config.queue_capacity.max(1));

        let store = ClickHouseStore::new(config).await?;
        let writer = BatchWriter::new(
            store,
            config.batch_size.max(1),
            Duration::from_millis(config.flush_interval_ms.max(1)),
        );

        let handle = tokio::spawn(writer.run(receiver));

        info!(table = %config.table, "Time series sink initialized with ClickHouse backend");

        Ok((Self::from_sender(sender, node_id), handle))
    }

    fn from_sender(sender: mpsc::Sender<PointRow>, node_id: impl Into<String>) -> Self {
        Self {
            sender: Mutex::new(Some(sender)),
            node_id: node_id.into(),
        }
    }

    /// Close the queue. Points already queued are still flushed; later
    /// inserts fail.
    pub fn shutdown(&self) {
        if self.sender.lock().take().is_some() {
            info!("Time series sink shut down, writer draining");
        }
    }
}

impl TimeSeriesSink for ClickHouseSink {
    fn insert(&self, row: TimeSeriesRow) -> MetricsResult<()> {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            return Err(MetricsError::Analytics(
                "time series writer has shut down".to_string(),
            ));
        };
        match sender.try_send(PointRow::new(row, &self.node_id)) {
            Ok(()) => {
                metrics::counter!("timeseries.queued").increment(1);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                Err(MetricsError::Analytics("time series queue is full".to_string()))
            }
            Err(TrySendError::Closed(_)) => Err(MetricsError::Analytics(
                "time series writer has shut down".to_string(),
            )),
        }
    }
}

/// Destination of flushed batches.
trait PointStore: Send + Sync + 'static {
    fn write_batch(&self, rows: &[PointRow]) -> impl Future<Output = anyhow::Result<()>> + Send;
}

struct ClickHouseStore {
    client: clickhouse::Client,
    table: String,
}

impl ClickHouseStore {
    async fn new(config: &ClickHouseConfig) -> anyhow::Result<Self> {
        let client = clickhouse::Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        Self::ensure_schema(&client, &config.table).await?;

        Ok(Self {
            client,
            table: config.table.clone(),
        })
    }

    async fn ensure_schema(client: &clickhouse::Client, table: &str) -> anyhow::Result<()> {
        client.query(&schema_sql(table)).execute().await?;
        info!(table = %table, "ClickHouse schema verified");
        Ok(())
    }
}

impl PointStore for ClickHouseStore {
    async fn write_batch(&self, rows: &[PointRow]) -> anyhow::Result<()> {
        let mut insert = self.client.insert::<PointRow>(&self.table)?;
        for row in rows {
            insert.write(row).await?;
        }
        insert.end().await?;
        Ok(())
    }
}

/// Background writer that batches points and flushes them to a store.
struct BatchWriter<S> {
    store: S,
    batch_size: usize,
    flush_interval: Duration,
}

impl<S: PointStore> BatchWriter<S> {
    fn new(store: S, batch_size: usize, flush_interval: Duration) -> Self {
        Self {
            store,
            batch_size,
            flush_interval,
        }
    }

    /// Runs until every sender is gone, then flushes the remainder.
    async fn run(self, mut receiver: mpsc::Receiver<PointRow>) {
        let mut buffer: Vec<PointRow> = Vec::with_capacity(self.batch_size);
        let mut interval = tokio::time::interval_at(
            Instant::now() + self.flush_interval,
            self.flush_interval,
        );

        loop {
            tokio::select! {
                received = receiver.recv() => match received {
                    Some(row) => {
                        buffer.push(row);
                        if buffer.len() >= self.batch_size {
                            self.flush(&mut buffer).await;
                        }
                    }
                    None => {
                        if !buffer.is_empty() {
                            self.flush(&mut buffer).await;
                        }
                        info!("Time series queue closed, writer stopped");
                        break;
                    }
                },
                _ = interval.tick() => {
                    if !buffer.is_empty() {
                        self.flush(&mut buffer).await;
                    }
                }
            }
        }
    }

    async fn flush(&self, buffer: &mut Vec<PointRow>) {
        let count = buffer.len();
        debug!(count = count, "Flushing time series batch");

        match self.store.write_batch(buffer).await {
            Ok(()) => {
                metrics::counter!("timeseries.flushed").increment(count as u64);
                debug!(count = count, "Time series batch flushed successfully");
            }
            Err(e) => {
                metrics::counter!("timeseries.flush_errors").increment(1);
                error!(error = %e, count = count, "Failed to flush time series batch");
            }
        }

        buffer.clear();
    }
}

fn schema_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            source_id String,
            category LowCardinality(String),
            timestamp DateTime64(3),
            value Float64,
            min Float64,
            max Float64,
            avg Float64,
            sum Float64,
            node_id String
        ) ENGINE = MergeTree()
        ORDER BY (timestamp, category, source_id)
        PARTITION BY toYYYYMM(timestamp)",
        table
    )
}
