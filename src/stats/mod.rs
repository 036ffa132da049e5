//! Game statistics
//!
//! Statistic descriptors in a document name their implementation through the
//! `cls` field. The `StatRegistry` resolves those names to factories; the
//! created statistics are collected per game in a `StatAggregator`.

pub mod aggregator;
pub mod numeric;
pub mod registry;

pub use aggregator::StatAggregator;
pub use numeric::{Mean, Number, NumericState, Ratio, StatValue, Statistic};
pub use registry::{StatFactory, StatRegistry};
