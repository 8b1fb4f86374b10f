//! Metric classification and per-category totals.
//!
//! A batch is all-or-nothing: one invalid record aborts the whole
//! aggregation, so a dashboard never shows totals that silently exclude a
//! record.

use chrono::{DateTime, Utc};
use creator_core::config::MixedCurrencyPolicy;
use creator_core::types::{EngagementMetric, MetricRecord, RevenueMetric, SubscriberMetric};
use creator_core::validation::validate_at;
use creator_core::{MetricCategory, MetricsError, MetricsResult, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

// ─── Types ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementTotals {
    pub views: u64,
    pub clicks: u64,
    pub shares: u64,
    /// `clicks + shares`; views are the denominator, not part of engagement.
    pub total_engagement: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyTotals {
    pub total: f64,
    pub transactions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueTotals {
    pub total: f64,
    /// Currency of the last revenue record folded in; empty when there were none.
    pub currency: String,
    pub transactions: u64,
    pub by_currency: BTreeMap<String, CurrencyTotals>,
    pub mixed_currency: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberTotals {
    /// Largest `totalSubscribers` seen: current state, not a cumulative count.
    pub total: u64,
    #[serde(rename = "new")]
    pub new_subscribers: u64,
    /// Mean churn across subscriber records, 0 when there were none.
    pub churn_rate: f64,
    /// Number of subscriber records that contributed.
    pub records: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedTotals {
    pub engagement: EngagementTotals,
    pub revenue: RevenueTotals,
    pub subscribers: SubscriberTotals,
}

// ─── Classification ─────────────────────────────────────────────────────────

#[derive(Default)]
struct Partitions<'a> {
    engagement: Vec<&'a EngagementMetric>,
    revenue: Vec<&'a RevenueMetric>,
    subscriber: Vec<&'a SubscriberMetric>,
}

fn classify(records: &[MetricRecord], now: DateTime<Utc>) -> Result<Partitions<'_>, ValidationError> {
    let mut parts = Partitions::default();
    for record in records {
        validate_at(record, now)?;
        match record {
            MetricRecord::Engagement(m) => parts.engagement.push(m),
            MetricRecord::Revenue(m) => parts.revenue.push(m),
            MetricRecord::Subscriber(m) => parts.subscriber.push(m),
        }
    }
    Ok(parts)
}

// ─── Aggregation ────────────────────────────────────────────────────────────

/// Aggregate a batch against the current wall clock.
pub fn aggregate(
    records: &[MetricRecord],
    policy: MixedCurrencyPolicy,
) -> MetricsResult<AggregatedTotals> {
    aggregate_at(records, policy, Utc::now())
}

/// Aggregate a batch, re-validating every record against `now`.
///
/// Returns `MetricsError::Validation` for bad input and
/// `MetricsError::Processing` when a counter overflows or the revenue total
/// stops being finite.
pub fn aggregate_at(
    records: &[MetricRecord],
    policy: MixedCurrencyPolicy,
    now: DateTime<Utc>,
) -> MetricsResult<AggregatedTotals> {
    let parts = classify(records, now)?;

    debug!(
        engagement = parts.engagement.len(),
        revenue = parts.revenue.len(),
        subscriber = parts.subscriber.len(),
        "Batch classified"
    );

    Ok(AggregatedTotals {
        engagement: sum_engagement(&parts.engagement)?,
        revenue: sum_revenue(&parts.revenue, policy)?,
        subscribers: sum_subscribers(&parts.subscriber)?,
    })
}

fn add(acc: u64, value: u64, field: &str) -> MetricsResult<u64> {
    acc.checked_add(value)
        .ok_or_else(|| MetricsError::Processing(format!("{} total overflowed", field)))
}

fn sum_engagement(items: &[&EngagementMetric]) -> MetricsResult<EngagementTotals> {
    let mut totals = EngagementTotals::default();
    for m in items {
        totals.views = add(totals.views, m.views, "views")?;
        totals.clicks = add(totals.clicks, m.clicks, "clicks")?;
        totals.shares = add(totals.shares, m.shares, "shares")?;
    }
    totals.total_engagement = add(totals.clicks, totals.shares, "totalEngagement")?;
    Ok(totals)
}

fn sum_revenue(
    items: &[&RevenueMetric],
    policy: MixedCurrencyPolicy,
) -> MetricsResult<RevenueTotals> {
    let mut totals = RevenueTotals::default();
    for m in items {
        if policy == MixedCurrencyPolicy::Reject
            && !totals.currency.is_empty()
            && totals.currency != m.currency
        {
            let mut err = ValidationError::new(MetricCategory::Revenue, m.id.as_str());
            err.push(
                "currency",
                format!("mixes {} with {} in one batch", m.currency, totals.currency),
            );
            return Err(err.into());
        }

        totals.total += m.amount;
        totals.transactions = add(totals.transactions, 1, "transactions")?;
        let entry = totals.by_currency.entry(m.currency.clone()).or_default();
        entry.total += m.amount;
        entry.transactions += 1;
        totals.currency.clone_from(&m.currency);
    }

    if !totals.total.is_finite() {
        return Err(MetricsError::Processing(
            "revenue total is not a finite number".to_string(),
        ));
    }

    totals.mixed_currency = totals.by_currency.len() > 1;
    if totals.mixed_currency {
        let currencies: Vec<&String> = totals.by_currency.keys().collect();
        warn!(
            currencies = ?currencies,
            reported = %totals.currency,
            "Revenue batch spans multiple currencies; total is not currency-consistent"
        );
    }
    Ok(totals)
}

fn sum_subscribers(items: &[&SubscriberMetric]) -> MetricsResult<SubscriberTotals> {
    let mut totals = SubscriberTotals::default();
    let mut churn_sum = 0.0;
    for m in items {
        totals.total = totals.total.max(m.total_subscribers);
        totals.new_subscribers = add(totals.new_subscribers, m.new_subscribers, "new")?;
        churn_sum += m.churn_rate;
    }
    totals.records = items.len() as u64;
    if !items.is_empty() {
        totals.churn_rate = churn_sum / items.len() as f64;
    }
    Ok(totals)
}
