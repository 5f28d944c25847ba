//! Persistence boundary.
//!
//! Durable storage is an external collaborator. The engine calls a
//! [`TriageSink`] at well-defined points (after classifying an item,
//! after a patch transition) and keeps going regardless of the outcome:
//! a sink failure is captured as a [`SinkFailure`] record and logged,
//! never allowed to abort a pass.

#[cfg(any(test, feature = "test-util"))]
use std::sync::Mutex;

use tracing::warn;
use uuid::Uuid;

use crate::types::{FeedbackItem, PatchStatus, SinkFailure, TriageDecision};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),
    #[error("write failed: {0}")]
    WriteFailed(String),
}

// ---------------------------------------------------------------------------
// TriageSink trait
// ---------------------------------------------------------------------------

/// Best-effort persistence hooks invoked by the engine.
pub trait TriageSink: Send + Sync {
    /// Durably record one feedback item.
    fn record_feedback(&self, item: &FeedbackItem) -> Result<(), SinkError>;

    /// Durably record one triage decision.
    fn record_decision(&self, decision: &TriageDecision) -> Result<(), SinkError>;

    /// Durably record one patch status transition.
    fn record_patch_event(
        &self,
        patch_id: Uuid,
        status: PatchStatus,
        note: &str,
    ) -> Result<(), SinkError>;
}

/// Sink that records nothing. The default when no collaborator is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TriageSink for NullSink {
    fn record_feedback(&self, _item: &FeedbackItem) -> Result<(), SinkError> {
        Ok(())
    }

    fn record_decision(&self, _decision: &TriageDecision) -> Result<(), SinkError> {
        Ok(())
    }

    fn record_patch_event(
        &self,
        _patch_id: Uuid,
        _status: PatchStatus,
        _note: &str,
    ) -> Result<(), SinkError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Failure capture
// ---------------------------------------------------------------------------

/// Convert a sink result into an observable failure record. Logs at warn
/// level; returns `None` on success.
pub fn capture_failure(
    operation: &str,
    entity_id: Uuid,
    result: Result<(), SinkError>,
) -> Option<SinkFailure> {
    match result {
        Ok(()) => None,
        Err(err) => {
            warn!(operation, %entity_id, error = %err, "persistence sink failed; continuing");
            Some(SinkFailure {
                operation: operation.to_string(),
                entity_id,
                message: err.to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// In-memory sink used by tests to assert what the engine persisted.
/// Only compiled for tests and for downstream crates opting into the
/// `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub feedback: Mutex<Vec<Uuid>>,
    pub decisions: Mutex<Vec<Uuid>>,
    pub patch_events: Mutex<Vec<(Uuid, PatchStatus)>>,
}

#[cfg(any(test, feature = "test-util"))]
impl TriageSink for RecordingSink {
    fn record_feedback(&self, item: &FeedbackItem) -> Result<(), SinkError> {
        self.feedback.lock().expect("sink poisoned").push(item.id);
        Ok(())
    }

    fn record_decision(&self, decision: &TriageDecision) -> Result<(), SinkError> {
        self.decisions
            .lock()
            .expect("sink poisoned")
            .push(decision.feedback_id);
        Ok(())
    }

    fn record_patch_event(
        &self,
        patch_id: Uuid,
        status: PatchStatus,
        _note: &str,
    ) -> Result<(), SinkError> {
        self.patch_events
            .lock()
            .expect("sink poisoned")
            .push((patch_id, status));
        Ok(())
    }
}

/// Sink that fails every write, for exercising the best-effort path.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSink;

#[cfg(any(test, feature = "test-util"))]
impl TriageSink for FailingSink {
    fn record_feedback(&self, _item: &FeedbackItem) -> Result<(), SinkError> {
        Err(SinkError::Unavailable("store offline".into()))
    }

    fn record_decision(&self, _decision: &TriageDecision) -> Result<(), SinkError> {
        Err(SinkError::WriteFailed("constraint violation".into()))
    }

    fn record_patch_event(
        &self,
        _patch_id: Uuid,
        _status: PatchStatus,
        _note: &str,
    ) -> Result<(), SinkError> {
        Err(SinkError::Unavailable("store offline".into()))
    }
}
