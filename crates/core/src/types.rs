use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three kinds of metric a creator dashboard consumes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    Engagement,
    Revenue,
    Subscriber,
}

impl MetricCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCategory::Engagement => "engagement",
            MetricCategory::Revenue => "revenue",
            MetricCategory::Subscriber => "subscriber",
        }
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content engagement counters for one piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetric {
    pub id: String,
    pub views: u64,
    pub clicks: u64,
    pub shares: u64,
    pub timestamp: DateTime<Utc>,
}

/// A single revenue transaction from the payment ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueMetric {
    pub id: String,
    pub amount: f64,
    /// ISO-4217 style code, e.g. `USD`.
    pub currency: String,
    pub timestamp: DateTime<Utc>,
}

/// A subscription ledger snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberMetric {
    pub id: String,
    pub total_subscribers: u64,
    pub new_subscribers: u64,
    /// Fraction in `[0, 1]`.
    pub churn_rate: f64,
    pub timestamp: DateTime<Utc>,
}

/// One immutable metric observation.
///
/// Prefer the validating constructors; records that arrive through
/// deserialization skip them and are re-checked by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricRecord {
    Engagement(EngagementMetric),
    Revenue(RevenueMetric),
    Subscriber(SubscriberMetric),
}

impl MetricRecord {
    pub fn engagement(
        id: impl Into<String>,
        views: u64,
        clicks: u64,
        shares: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Self::checked(MetricRecord::Engagement(EngagementMetric {
            id: id.into(),
            views,
            clicks,
            shares,
            timestamp,
        }))
    }

    pub fn revenue(
        id: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Self::checked(MetricRecord::Revenue(RevenueMetric {
            id: id.into(),
            amount,
            currency: currency.into(),
            timestamp,
        }))
    }

    pub fn subscriber(
        id: impl Into<String>,
        total_subscribers: u64,
        new_subscribers: u64,
        churn_rate: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Self::checked(MetricRecord::Subscriber(SubscriberMetric {
            id: id.into(),
            total_subscribers,
            new_subscribers,
            churn_rate,
            timestamp,
        }))
    }

    fn checked(record: Self) -> Result<Self, ValidationError> {
        crate::validation::validate(&record)?;
        Ok(record)
    }

    pub fn category(&self) -> MetricCategory {
        match self {
            MetricRecord::Engagement(_) => MetricCategory::Engagement,
            MetricRecord::Revenue(_) => MetricCategory::Revenue,
            MetricRecord::Subscriber(_) => MetricCategory::Subscriber,
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            MetricRecord::Engagement(m) => &m.id,
            MetricRecord::Revenue(m) => &m.id,
            MetricRecord::Subscriber(m) => &m.id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MetricRecord::Engagement(m) => m.timestamp,
            MetricRecord::Revenue(m) => m.timestamp,
            MetricRecord::Subscriber(m) => m.timestamp,
        }
    }
}
