//! Derived rates computed from aggregated totals. Every formula is defined
//! for zero denominators.

use crate::aggregate::AggregatedTotals;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedRates {
    /// Percentage in `[0, 100]`.
    pub engagement_rate: f64,
    pub average_transaction_value: f64,
    /// Percentage; 100 both for zero churn and for no subscriber data.
    pub retention_rate: f64,
}

pub fn derive_rates(totals: &AggregatedTotals) -> DerivedRates {
    DerivedRates {
        engagement_rate: engagement_rate(
            totals.engagement.total_engagement,
            totals.engagement.views,
        ),
        average_transaction_value: average_transaction_value(
            totals.revenue.total,
            totals.revenue.transactions,
        ),
        retention_rate: retention_rate(totals.subscribers.churn_rate),
    }
}

/// Clicks and shares are each bounded by views but not jointly, so the raw
/// ratio can exceed 100 and is clamped.
pub fn engagement_rate(total_engagement: u64, views: u64) -> f64 {
    if views == 0 {
        return 0.0;
    }
    (total_engagement as f64 * 100.0 / views as f64).clamp(0.0, 100.0)
}

pub fn average_transaction_value(total: f64, transactions: u64) -> f64 {
    if transactions == 0 {
        0.0
    } else {
        total / transactions as f64
    }
}

pub fn retention_rate(churn_rate: f64) -> f64 {
    if churn_rate != 0.0 {
        100.0 - churn_rate * 100.0
    } else {
        100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{EngagementTotals, RevenueTotals, SubscriberTotals};

    #[test]
    fn test_zero_denominators() {
        let rates = derive_rates(&AggregatedTotals::default());
        assert_eq!(rates.engagement_rate, 0.0);
        assert_eq!(rates.average_transaction_value, 0.0);
        assert_eq!(rates.retention_rate, 100.0);
    }

    #[test]
    fn test_engagement_rate() {
        assert!((engagement_rate(200, 1000) - 20.0).abs() < 1e-9);
        assert!((engagement_rate(1, 3) - 33.333_333_333).abs() < 1e-6);
    }

    #[test]
    fn test_engagement_rate_is_clamped() {
        // 100 clicks and 100 shares on 100 views.
        assert_eq!(engagement_rate(200, 100), 100.0);
    }

    #[test]
    fn test_average_transaction_value() {
        assert!((average_transaction_value(1000.0, 1) - 1000.0).abs() < 1e-9);
        assert!((average_transaction_value(90.0, 4) - 22.5).abs() < 1e-9);
    }

    #[test]
    fn test_retention_rate() {
        assert!((retention_rate(0.04) - 96.0).abs() < 1e-9);
        assert_eq!(retention_rate(0.0), 100.0);
        assert!(retention_rate(1.0).abs() < 1e-9);
    }

    #[test]
    fn test_derive_from_totals() {
        let totals = AggregatedTotals {
            engagement: EngagementTotals {
                views: 1000,
                clicks: 150,
                shares: 50,
                total_engagement: 200,
            },
            revenue: RevenueTotals {
                total: 300.0,
                currency: "USD".into(),
                transactions: 3,
                ..Default::default()
            },
            subscribers: SubscriberTotals {
                total: 10,
                new_subscribers: 2,
                churn_rate: 0.1,
                records: 1,
            },
        };

        let rates = derive_rates(&totals);
        assert!((rates.engagement_rate - 20.0).abs() < 1e-9);
        assert!((rates.average_transaction_value - 100.0).abs() < 1e-9);
        assert!((rates.retention_rate - 90.0).abs() < 1e-9);
    }
}
