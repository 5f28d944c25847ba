//! Shared data model for the feedback triage and patch-lifecycle engine.
//!
//! Everything here is plain data or small pure helpers: the closed
//! severity/category/destination enumerations, the feedback and patch
//! records, the per-cycle and per-pass report structures, the arena
//! [`store::Store`], the cycle configuration surface, and the
//! best-effort persistence boundary in [`sink`]. The behavior lives in
//! the sibling crates (`ft-triage`, `ft-cycle`, `ft-metrics`,
//! `ft-patch`).

pub mod agents;
pub mod config;
pub mod sink;
pub mod store;
pub mod types;

pub use config::CycleConfig;
pub use sink::{NullSink, SinkError, TriageSink};
pub use store::Store;
pub use types::{
    AgentMetrics, BuildPhase, CycleResult, CycleStatus, Destination, EffortEstimate,
    FeedbackAnalysisReport, FeedbackCategory, FeedbackDraft, FeedbackItem, FeedbackStatus,
    ImpactLevel, IssuePattern, ManagedPatch, PatchItem, PatchStatus, RootCauseAnalysis, Severity,
    SinkFailure, StatusEntry, TrendAnalysis, TrendDirection, TrendMetric, TriageDecision,
    TriageReport,
};

use thiserror::Error;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Crate-level error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}
