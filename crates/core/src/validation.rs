//! Per-category invariants for a single metric record.
//!
//! Validation collects every violated field instead of stopping at the first
//! one, so producers get complete diagnostics in a single round trip.

use crate::error::ValidationError;
use crate::types::{EngagementMetric, MetricRecord, RevenueMetric, SubscriberMetric};
use chrono::{DateTime, Utc};

/// Validate against the current wall clock.
pub fn validate(record: &MetricRecord) -> Result<(), ValidationError> {
    validate_at(record, Utc::now())
}

/// Validate with a pinned `now`, used for the "timestamp not in the future"
/// check on subscriber snapshots.
pub fn validate_at(record: &MetricRecord, now: DateTime<Utc>) -> Result<(), ValidationError> {
    let mut err = ValidationError::new(record.category(), record.source_id());
    match record {
        MetricRecord::Engagement(m) => check_engagement(m, &mut err),
        MetricRecord::Revenue(m) => check_revenue(m, &mut err),
        MetricRecord::Subscriber(m) => check_subscriber(m, now, &mut err),
    }
    err.into_result()
}

fn check_engagement(m: &EngagementMetric, err: &mut ValidationError) {
    if m.clicks > m.views {
        err.push(
            "clicks",
            format!("must not exceed views ({} > {})", m.clicks, m.views),
        );
    }
    if m.shares > m.views {
        err.push(
            "shares",
            format!("must not exceed views ({} > {})", m.shares, m.views),
        );
    }
}

fn check_revenue(m: &RevenueMetric, err: &mut ValidationError) {
    if !m.amount.is_finite() {
        err.push("amount", "must be a finite number");
    } else if m.amount < 0.0 {
        err.push("amount", format!("must be non-negative (got {})", m.amount));
    }
    if !is_currency_code(&m.currency) {
        err.push(
            "currency",
            format!("must be a 3-letter uppercase code (got '{}')", m.currency),
        );
    }
}

fn check_subscriber(m: &SubscriberMetric, now: DateTime<Utc>, err: &mut ValidationError) {
    if m.new_subscribers > m.total_subscribers {
        err.push(
            "newSubscribers",
            format!(
                "must not exceed totalSubscribers ({} > {})",
                m.new_subscribers, m.total_subscribers
            ),
        );
    }
    if !(0.0..=1.0).contains(&m.churn_rate) {
        err.push(
            "churnRate",
            format!("must be within [0, 1] (got {})", m.churn_rate),
        );
    }
    if m.timestamp > now {
        err.push(
            "timestamp",
            format!("must not be in the future (got {})", m.timestamp.to_rfc3339()),
        );
    }
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricCategory;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn engagement(views: u64, clicks: u64, shares: u64) -> MetricRecord {
        MetricRecord::Engagement(EngagementMetric {
            id: "post-1".into(),
            views,
            clicks,
            shares,
            timestamp: now(),
        })
    }

    fn revenue(amount: f64, currency: &str) -> MetricRecord {
        MetricRecord::Revenue(RevenueMetric {
            id: "tx-1".into(),
            amount,
            currency: currency.into(),
            timestamp: now(),
        })
    }

    fn subscriber(total: u64, new: u64, churn: f64, at: DateTime<Utc>) -> MetricRecord {
        MetricRecord::Subscriber(SubscriberMetric {
            id: "snap-1".into(),
            total_subscribers: total,
            new_subscribers: new,
            churn_rate: churn,
            timestamp: at,
        })
    }

    #[test]
    fn test_valid_records_pass() {
        assert!(validate_at(&engagement(1000, 150, 50), now()).is_ok());
        assert!(validate_at(&engagement(0, 0, 0), now()).is_ok());
        assert!(validate_at(&revenue(0.0, "USD"), now()).is_ok());
        assert!(validate_at(&subscriber(10, 10, 1.0, now()), now()).is_ok());
    }

    #[test]
    fn test_engagement_reports_every_field() {
        let err = validate_at(&engagement(100, 300, 200), now()).unwrap_err();
        assert_eq!(err.category, MetricCategory::Engagement);
        assert_eq!(err.source_id, "post-1");
        assert_eq!(err.fields(), vec!["clicks", "shares"]);
    }

    #[test]
    fn test_revenue_amount_and_currency() {
        let err = validate_at(&revenue(-1.0, "usd"), now()).unwrap_err();
        assert_eq!(err.fields(), vec!["amount", "currency"]);

        let err = validate_at(&revenue(f64::NAN, "USD"), now()).unwrap_err();
        assert!(err.has_field("amount"));

        for bad in ["US", "USDX", "U$D", ""] {
            let err = validate_at(&revenue(1.0, bad), now()).unwrap_err();
            assert!(err.has_field("currency"), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_subscriber_invariants() {
        let future = now() + Duration::minutes(1);
        let err = validate_at(&subscriber(5, 6, 1.5, future), now()).unwrap_err();
        assert_eq!(err.fields(), vec!["newSubscribers", "churnRate", "timestamp"]);

        let err = validate_at(&subscriber(5, 1, -0.1, now()), now()).unwrap_err();
        assert_eq!(err.fields(), vec!["churnRate"]);
    }

    #[test]
    fn test_subscriber_timestamp_equal_to_now_is_valid() {
        assert!(validate_at(&subscriber(5, 1, 0.1, now()), now()).is_ok());
    }
}
