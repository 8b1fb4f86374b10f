use crate::types::MetricCategory;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type MetricsResult<T> = Result<T, MetricsError>;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metric validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Metric processing error: {0}")]
    Processing(String),

    #[error("ClickHouse analytics error: {0}")]
    Analytics(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl MetricsError {
    /// True when the caller supplied bad data, as opposed to an engine fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, MetricsError::Validation(_))
    }
}

/// One field that broke its invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

/// Every invariant a single metric record violated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub category: MetricCategory,
    pub source_id: String,
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new(category: MetricCategory, source_id: impl Into<String>) -> Self {
        Self {
            category,
            source_id: source_id.into(),
            violations: Vec::new(),
        }
    }

    pub fn push(&mut self, field: &str, reason: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.to_string(),
            reason: reason.into(),
        });
    }

    /// Names of the offending fields, in the order they were checked.
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// `Ok(())` when nothing was pushed, the error otherwise.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} record '{}':", self.category, self.source_id)?;
        for (i, v) in self.violations.iter().enumerate() {
            let sep = if i == 0 { " " } else { "; " };
            write!(f, "{}{} {}", sep, v.field, v.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
