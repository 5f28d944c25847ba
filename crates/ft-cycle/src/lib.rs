//! Cycle aggregation: collects feedback for one build cycle, applies the
//! coarse severity gate, and folds the cycle into a
//! [`ft_core::types::CycleResult`].

pub mod cycle;

pub use cycle::{coarse_effort, BuildCycle, ProceedDecision};
