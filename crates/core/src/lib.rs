pub mod config;
pub mod error;
pub mod sink;
pub mod types;
pub mod validation;

pub use config::AppConfig;
pub use error::{FieldViolation, MetricsError, MetricsResult, ValidationError};
pub use sink::{TimeSeriesRow, TimeSeriesSink};
pub use types::{MetricCategory, MetricRecord};
