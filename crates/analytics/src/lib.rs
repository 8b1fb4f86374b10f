//! ClickHouse persistence for synthesized time-series points.

pub mod writer;

pub use writer::ClickHouseSink;
