//! Creator dashboard analysis: category totals, derived rates, and the
//! unified time-series summary for one batch of metric records.

pub mod aggregate;
pub mod analyzer;
pub mod rates;
pub mod timeseries;

pub use aggregate::{aggregate, AggregatedTotals};
pub use analyzer::{AnalysisOutcome, AnalysisResult, MetricsAnalyzer};
pub use rates::{derive_rates, DerivedRates};
pub use timeseries::{
    synthesize, synthesize_at, try_synthesize, Diagnostic, TimeSeriesPoint, TimeSeriesSummary,
};
