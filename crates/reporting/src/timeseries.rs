//! Time-series synthesis: reduces each record to one scalar point, orders
//! the points by time, and computes summary statistics.
//!
//! Synthesis is soft-failing. `try_synthesize` reports a [`Diagnostic`];
//! `synthesize` logs it and falls back to an empty summary, so a problem that
//! only affects the chart never blocks totals and rates.

use chrono::{DateTime, Utc};
use creator_core::types::MetricRecord;
use creator_core::validation::validate_at;
use creator_core::{MetricCategory, TimeSeriesRow, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

// ─── Types ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub category: MetricCategory,
    pub source_id: String,
}

/// Points sorted ascending by timestamp plus their statistics. All
/// statistics are 0 when there are no points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesSummary {
    pub points: Vec<TimeSeriesPoint>,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub sum: f64,
}

impl TimeSeriesSummary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// One persistence row per point, each carrying the summary statistics.
    pub fn rows(&self) -> Vec<TimeSeriesRow> {
        self.points
            .iter()
            .map(|p| TimeSeriesRow {
                source_id: p.source_id.clone(),
                category: p.category,
                timestamp: p.timestamp,
                value: p.value,
                min: self.min,
                max: self.max,
                avg: self.avg,
                sum: self.sum,
            })
            .collect()
    }
}

/// Why a batch produced no time series. Recorded, never returned as an error
/// from the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub category: MetricCategory,
    pub source_id: String,
    pub fields: Vec<String>,
    pub reason: String,
}

impl Diagnostic {
    fn point(record: &MetricRecord, field: &str, reason: impl Into<String>) -> Self {
        Self {
            category: record.category(),
            source_id: record.source_id().to_string(),
            fields: vec![field.to_string()],
            reason: reason.into(),
        }
    }
}

impl From<ValidationError> for Diagnostic {
    fn from(err: ValidationError) -> Self {
        Self {
            category: err.category,
            source_id: err.source_id.clone(),
            fields: err.violations.iter().map(|v| v.field.clone()).collect(),
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} record '{}' [{}]: {}",
            self.category,
            self.source_id,
            self.fields.join(", "),
            self.reason
        )
    }
}

// ─── Synthesis ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct Accumulator {
    points: Vec<TimeSeriesPoint>,
    min: f64,
    max: f64,
    sum: f64,
}

impl Accumulator {
    fn push(&mut self, point: TimeSeriesPoint) {
        if self.points.is_empty() {
            self.min = point.value;
            self.max = point.value;
        } else {
            self.min = self.min.min(point.value);
            self.max = self.max.max(point.value);
        }
        self.sum += point.value;
        self.points.push(point);
    }

    fn finish(mut self) -> TimeSeriesSummary {
        let avg = if self.points.is_empty() {
            0.0
        } else {
            self.sum / self.points.len() as f64
        };
        // Stable, so equal timestamps keep their input order.
        self.points.sort_by_key(|p| p.timestamp);
        TimeSeriesSummary {
            points: self.points,
            min: self.min,
            max: self.max,
            avg,
            sum: self.sum,
        }
    }
}

fn reduce(record: &MetricRecord) -> TimeSeriesPoint {
    let value = match record {
        MetricRecord::Engagement(m) => (m.views as f64) + (m.clicks as f64) + (m.shares as f64),
        MetricRecord::Revenue(m) => m.amount,
        MetricRecord::Subscriber(m) => m.total_subscribers as f64,
    };
    TimeSeriesPoint {
        timestamp: record.timestamp(),
        value,
        category: record.category(),
        source_id: record.source_id().to_string(),
    }
}

fn check_point(record: &MetricRecord, point: &TimeSeriesPoint) -> Result<(), Diagnostic> {
    if point.timestamp.timestamp() < 0 {
        return Err(Diagnostic::point(
            record,
            "timestamp",
            format!("precedes the Unix epoch ({})", point.timestamp.to_rfc3339()),
        ));
    }
    if !point.value.is_finite() {
        return Err(Diagnostic::point(record, "value", "is not a finite number"));
    }
    Ok(())
}

pub fn try_synthesize(records: &[MetricRecord]) -> Result<TimeSeriesSummary, Diagnostic> {
    try_synthesize_at(records, Utc::now())
}

/// Build the summary, stopping at the first record that cannot become a point.
pub fn try_synthesize_at(
    records: &[MetricRecord],
    now: DateTime<Utc>,
) -> Result<TimeSeriesSummary, Diagnostic> {
    let mut acc = Accumulator::default();
    for record in records {
        validate_at(record, now)?;
        let point = reduce(record);
        check_point(record, &point)?;
        acc.push(point);
    }
    let summary = acc.finish();
    if !summary.sum.is_finite() {
        return Err(Diagnostic {
            category: summary.points[0].category,
            source_id: summary.points[0].source_id.clone(),
            fields: vec!["sum".to_string()],
            reason: "summary sum is not a finite number".to_string(),
        });
    }
    Ok(summary)
}

/// Soft-failing variant: logs the diagnostic and returns an empty summary.
pub fn synthesize(records: &[MetricRecord]) -> TimeSeriesSummary {
    synthesize_at(records, Utc::now()).0
}

/// Like [`synthesize`], with a pinned clock, also handing back the diagnostic
/// that emptied the summary.
pub fn synthesize_at(
    records: &[MetricRecord],
    now: DateTime<Utc>,
) -> (TimeSeriesSummary, Option<Diagnostic>) {
    match try_synthesize_at(records, now) {
        Ok(summary) => (summary, None),
        Err(diag) => {
            metrics::counter!("timeseries.degraded").increment(1);
            warn!(
                category = %diag.category,
                source_id = %diag.source_id,
                fields = ?diag.fields,
                reason = %diag.reason,
                "Time series unavailable for batch, returning empty summary"
            );
            (TimeSeriesSummary::empty(), Some(diag))
        }
    }
}
