//! Analysis orchestrator: composes aggregation, rate derivation, and
//! time-series synthesis into one dashboard result.
//!
//! Aggregation failures are fatal. Synthesis failures only empty the time
//! series. Sink failures are logged and counted.

use crate::aggregate::{aggregate_at, EngagementTotals, RevenueTotals, SubscriberTotals};
use crate::rates::{derive_rates, DerivedRates};
use crate::timeseries::{synthesize_at, Diagnostic, TimeSeriesSummary};
use chrono::{DateTime, Utc};
use creator_core::config::AnalysisConfig;
use creator_core::types::MetricRecord;
use creator_core::{MetricsError, MetricsResult, TimeSeriesSink};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ─── Result types ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementAnalysis {
    #[serde(flatten)]
    pub totals: EngagementTotals,
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueAnalysis {
    #[serde(flatten)]
    pub totals: RevenueTotals,
    pub average_transaction_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberAnalysis {
    #[serde(flatten)]
    pub totals: SubscriberTotals,
    pub retention_rate: f64,
}

/// The dashboard-facing result of one `analyze` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub engagement: EngagementAnalysis,
    pub revenue: RevenueAnalysis,
    pub subscribers: SubscriberAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_series: Option<TimeSeriesSummary>,
}

/// An [`AnalysisResult`] together with the synthesis diagnostic, if any.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub diagnostic: Option<Diagnostic>,
}

// ─── Analyzer ───────────────────────────────────────────────────────────────

/// Stateless between calls; safe to share across threads.
pub struct MetricsAnalyzer {
    config: AnalysisConfig,
    sink: Option<Arc<dyn TimeSeriesSink>>,
}

impl MetricsAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config, sink: None }
    }

    /// Forward every synthesized point to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn TimeSeriesSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyze(&self, records: &[MetricRecord]) -> MetricsResult<AnalysisResult> {
        self.analyze_detailed(records).map(|outcome| outcome.result)
    }

    pub fn analyze_detailed(&self, records: &[MetricRecord]) -> MetricsResult<AnalysisOutcome> {
        self.analyze_at(records, Utc::now())
    }

    /// Run the pipeline with a pinned clock.
    pub fn analyze_at(
        &self,
        records: &[MetricRecord],
        now: DateTime<Utc>,
    ) -> MetricsResult<AnalysisOutcome> {
        metrics::counter!("analysis.runs").increment(1);

        let totals = match aggregate_at(records, self.config.mixed_currency, now) {
            Ok(totals) => totals,
            Err(MetricsError::Validation(err)) => {
                metrics::counter!("analysis.validation_failures").increment(1);
                warn!(
                    category = %err.category,
                    source_id = %err.source_id,
                    fields = ?err.fields(),
                    "Batch rejected during aggregation"
                );
                return Err(MetricsError::Validation(err));
            }
            Err(MetricsError::Processing(msg)) => {
                metrics::counter!("analysis.processing_failures").increment(1);
                warn!(error = %msg, "Aggregation fault");
                return Err(MetricsError::Processing(msg));
            }
            Err(other) => {
                metrics::counter!("analysis.processing_failures").increment(1);
                warn!(error = %other, "Aggregation fault");
                return Err(MetricsError::Processing(format!("aggregation failed: {}", other)));
            }
        };

        let rates: DerivedRates = derive_rates(&totals);

        let wants_series = self.config.include_time_series || self.sink.is_some();
        let (summary, diagnostic) = if wants_series {
            let (summary, diagnostic) = synthesize_at(records, now);
            (Some(summary), diagnostic)
        } else {
            (None, None)
        };

        if let (Some(sink), Some(summary)) = (&self.sink, &summary) {
            self.persist(sink.as_ref(), summary);
        }

        let result = AnalysisResult {
            engagement: EngagementAnalysis {
                totals: totals.engagement,
                engagement_rate: rates.engagement_rate,
            },
            revenue: RevenueAnalysis {
                totals: totals.revenue,
                average_transaction_value: rates.average_transaction_value,
            },
            subscribers: SubscriberAnalysis {
                totals: totals.subscribers,
                retention_rate: rates.retention_rate,
            },
            time_series: if self.config.include_time_series {
                summary
            } else {
                None
            },
        };

        info!(
            records = records.len(),
            points = result.time_series.as_ref().map_or(0, |s| s.points.len()),
            degraded = diagnostic.is_some(),
            "Batch analyzed"
        );

        Ok(AnalysisOutcome { result, diagnostic })
    }

    fn persist(&self, sink: &dyn TimeSeriesSink, summary: &TimeSeriesSummary) {
        let mut failed = 0usize;
        for row in summary.rows() {
            let source_id = row.source_id.clone();
            if let Err(e) = sink.insert(row) {
                failed += 1;
                metrics::counter!("timeseries.sink_errors").increment(1);
                warn!(error = %e, source_id = %source_id, "Failed to persist time series point");
            }
        }
        debug!(
            points = summary.points.len(),
            failed = failed,
            "Time series forwarded to sink"
        );
    }
}

impl Default for MetricsAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use creator_core::sink::capture_sink;
    use creator_core::types::{EngagementMetric, RevenueMetric};
    use creator_core::{MetricCategory, TimeSeriesRow};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn engagement(id: &str, views: u64, clicks: u64, shares: u64) -> MetricRecord {
        MetricRecord::Engagement(EngagementMetric {
            id: id.into(),
            views,
            clicks,
            shares,
            timestamp: now() - Duration::hours(2),
        })
    }

    fn revenue(id: &str, amount: f64, at: DateTime<Utc>) -> MetricRecord {
        MetricRecord::Revenue(RevenueMetric {
            id: id.into(),
            amount,
            currency: "USD".into(),
            timestamp: at,
        })
    }

    struct FailingSink;

    impl TimeSeriesSink for FailingSink {
        fn insert(&self, _row: TimeSeriesRow) -> MetricsResult<()> {
            Err(MetricsError::Analytics("queue full".into()))
        }
    }

    #[test]
    fn test_sink_receives_every_point() {
        let sink = capture_sink();
        let analyzer = MetricsAnalyzer::default().with_sink(sink.clone());

        analyzer
            .analyze_at(
                &[engagement("post-1", 100, 10, 5), revenue("tx-1", 20.0, now())],
                now(),
            )
            .unwrap();

        assert_eq!(sink.count(), 2);
        assert_eq!(sink.count_category(MetricCategory::Revenue), 1);
        let rows = sink.rows();
        assert_eq!(rows[0].source_id, "post-1");
        assert!((rows[0].sum - 135.0).abs() < 1e-9);
    }

    #[test]
    fn test_sink_failure_does_not_change_result() {
        let records = [revenue("tx-1", 20.0, now())];
        let plain = MetricsAnalyzer::default().analyze_at(&records, now()).unwrap();
        let failing = MetricsAnalyzer::default()
            .with_sink(Arc::new(FailingSink))
            .analyze_at(&records, now())
            .unwrap();

        assert_eq!(plain.result, failing.result);
        assert!(failing.diagnostic.is_none());
    }

    #[test]
    fn test_time_series_can_be_disabled() {
        let analyzer = MetricsAnalyzer::new(AnalysisConfig {
            include_time_series: false,
            ..Default::default()
        });
        let outcome = analyzer.analyze_at(&[revenue("tx-1", 5.0, now())], now()).unwrap();
        assert!(outcome.result.time_series.is_none());

        let json = serde_json::to_value(&outcome.result).unwrap();
        assert!(json.get("timeSeries").is_none());
    }

    #[test]
    fn test_disabled_series_still_feeds_sink() {
        let sink = capture_sink();
        let analyzer = MetricsAnalyzer::new(AnalysisConfig {
            include_time_series: false,
            ..Default::default()
        })
        .with_sink(sink.clone());

        let outcome = analyzer.analyze_at(&[revenue("tx-1", 5.0, now())], now()).unwrap();
        assert!(outcome.result.time_series.is_none());
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn test_degraded_series_is_not_persisted() {
        let sink = capture_sink();
        let analyzer = MetricsAnalyzer::default().with_sink(sink.clone());
        let ancient = Utc.with_ymd_and_hms(1965, 1, 1, 0, 0, 0).unwrap();

        let outcome = analyzer
            .analyze_at(&[revenue("tx-1", 5.0, now()), revenue("tx-old", 1.0, ancient)], now())
            .unwrap();

        assert!(outcome.diagnostic.is_some());
        assert_eq!(outcome.result.time_series, Some(TimeSeriesSummary::empty()));
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_result_json_shape() {
        let outcome = MetricsAnalyzer::default()
            .analyze_at(&[engagement("post-1", 1000, 150, 50)], now())
            .unwrap();
        let json = serde_json::to_value(&outcome.result).unwrap();

        assert_eq!(json["engagement"]["views"], 1000);
        assert_eq!(json["engagement"]["totalEngagement"], 200);
        assert_eq!(json["engagement"]["engagementRate"], 20.0);
        assert_eq!(json["revenue"]["averageTransactionValue"], 0.0);
        assert_eq!(json["subscribers"]["retentionRate"], 100.0);
        assert_eq!(json["subscribers"]["new"], 0);
        assert_eq!(json["timeSeries"]["points"][0]["sourceId"], "post-1");
        assert_eq!(json["timeSeries"]["points"][0]["category"], "engagement");
    }
}
