//! Persistence port for time-series points.
//!
//! The analyzer accepts an `Arc<dyn TimeSeriesSink>` and forwards every point
//! of a synthesized summary to it. Sinks must tolerate concurrent and
//! duplicate inserts; the analyzer never retries and never lets a sink error
//! change its result.

use crate::error::MetricsResult;
use crate::types::MetricCategory;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One persisted point, denormalized with the statistics of the summary it
/// belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    pub source_id: String,
    pub category: MetricCategory,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub sum: f64,
}

pub trait TimeSeriesSink: Send + Sync {
    fn insert(&self, row: TimeSeriesRow) -> MetricsResult<()>;
}

/// Discards everything.
pub struct NoOpSink;

impl TimeSeriesSink for NoOpSink {
    fn insert(&self, _row: TimeSeriesRow) -> MetricsResult<()> {
        Ok(())
    }
}

/// In-memory sink that captures rows for testing.
#[derive(Default)]
pub struct CaptureSink {
    rows: Mutex<Vec<TimeSeriesRow>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn rows(&self) -> Vec<TimeSeriesRow> {
        self.rows.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn count_category(&self, category: MetricCategory) -> usize {
        self.rows
            .lock()
            .iter()
            .filter(|r| r.category == category)
            .count()
    }

    pub fn clear(&self) {
        self.rows.lock().clear();
    }
}

impl TimeSeriesSink for CaptureSink {
    fn insert(&self, row: TimeSeriesRow) -> MetricsResult<()> {
        self.rows.lock().push(row);
        Ok(())
    }
}

pub fn noop_sink() -> Arc<dyn TimeSeriesSink> {
    Arc::new(NoOpSink)
}

pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}
