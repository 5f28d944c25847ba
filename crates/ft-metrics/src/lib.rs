//! Cross-cycle analytics: per-agent health scoring, least-squares trend
//! fitting over retained [`ft_core::types::CycleResult`] history, and
//! root-cause clustering of the current feedback batch.

pub mod analyzer;
pub mod trends;

pub use analyzer::{MetricsAnalyzer, HISTORY_CAPACITY};
pub use trends::{analyze_trend, least_squares, metric_value, Regression, STABLE_SLOPE};
