//! Patch lifecycle manager: materializes patches from a triage report and
//! tracks them through the status state machine.
//!
//! The conventional flow is pending → in_progress → review → testing →
//! completed, with blocked / wont_fix / deferred reachable from any
//! non-terminal state. The manager is permissive: every transition is
//! accepted and appended to the history log; validating "sane" flows is a
//! process concern, not an engine invariant. What the engine does enforce
//! is the bookkeeping — reopen counting, verification clearing, and a
//! one-shot time-to-resolution.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use ft_core::sink::{capture_failure, NullSink, TriageSink};
use ft_core::store::Store;
use ft_core::types::{
    Assignment, Destination, EffortEstimate, ManagedPatch, PatchStatus, ResolutionDetails, ScmLink,
    SinkFailure, StatusEntry, TriageReport,
};
use ft_core::EngineError;

/// Map the classifier's hour estimate onto the effort scale used for
/// queue math.
pub fn effort_from_hours(hours: f64) -> EffortEstimate {
    if hours <= 1.0 {
        EffortEstimate::Trivial
    } else if hours <= 2.0 {
        EffortEstimate::Small
    } else if hours <= 4.0 {
        EffortEstimate::Medium
    } else if hours <= 8.0 {
        EffortEstimate::Large
    } else {
        EffortEstimate::Xlarge
    }
}

// ---------------------------------------------------------------------------
// PatchManager
// ---------------------------------------------------------------------------

pub struct PatchManager {
    pub(crate) patches: Store<ManagedPatch>,
    sink: Arc<dyn TriageSink>,
    sink_failures: Vec<SinkFailure>,
}

impl std::fmt::Debug for PatchManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchManager")
            .field("patches", &self.patches.len())
            .field("pending_sink_failures", &self.sink_failures.len())
            .finish()
    }
}

impl PatchManager {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(NullSink))
    }

    pub fn with_sink(sink: Arc<dyn TriageSink>) -> Self {
        Self {
            patches: Store::new(),
            sink,
            sink_failures: Vec::new(),
        }
    }

    /// Materialize one pending patch per blocker/parallel decision in the
    /// report. Backlog decisions produce no patch. Returns the new patch
    /// ids in creation order.
    pub fn import_report(&mut self, report: &TriageReport) -> Vec<Uuid> {
        let mut created = Vec::new();
        for decision in &report.decisions {
            if decision.destination == Destination::Backlog {
                continue;
            }
            let now = Utc::now();
            let id = Uuid::new_v4();
            let patch = ManagedPatch {
                id,
                feedback_id: decision.feedback_id,
                cycle: report.cycle,
                phase: report.phase,
                priority: decision.priority,
                component: decision.suggested_owner.clone(),
                description: decision.rationale.clone(),
                effort: effort_from_hours(decision.estimated_hours),
                status: PatchStatus::Pending,
                history: vec![StatusEntry {
                    status: PatchStatus::Pending,
                    at: now,
                    actor: "triage".to_string(),
                    note: Some(format!("imported from cycle {} triage", report.cycle)),
                }],
                assignment: None,
                resolution: None,
                scm: None,
                verified: false,
                verified_by: None,
                verified_at: None,
                time_to_resolution_hours: None,
                reopen_count: 0,
                created_at: now,
            };
            self.record_patch_event(id, PatchStatus::Pending, "created");
            self.patches.insert(id, patch);
            created.push(id);
        }
        debug!(
            cycle = report.cycle,
            created = created.len(),
            "imported triage report"
        );
        created
    }

    pub fn get(&self, id: &Uuid) -> Result<&ManagedPatch, EngineError> {
        self.patches
            .get(id)
            .ok_or(EngineError::NotFound { entity: "patch", id: *id })
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// All patches sorted ascending by priority.
    pub fn queue(&self) -> Vec<&ManagedPatch> {
        let mut queue: Vec<&ManagedPatch> = self.patches.iter().collect();
        queue.sort_by_key(|p| p.priority);
        queue
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ManagedPatch> {
        self.patches.iter()
    }

    /// Core transition: accept `to` unconditionally, log it, and keep the
    /// reopen/verification/resolution bookkeeping straight.
    pub fn transition(
        &mut self,
        id: &Uuid,
        to: PatchStatus,
        actor: &str,
        note: Option<&str>,
    ) -> Result<&ManagedPatch, EngineError> {
        let now = Utc::now();
        let from = {
            let patch = self
                .patches
                .get_mut(id)
                .ok_or(EngineError::NotFound { entity: "patch", id: *id })?;
            let from = patch.status;

            patch.history.push(StatusEntry {
                status: to,
                at: now,
                actor: actor.to_string(),
                note: note.map(|n| n.to_string()),
            });

            // Leaving completed reopens the patch and voids verification.
            if from == PatchStatus::Completed && to != PatchStatus::Completed {
                patch.reopen_count += 1;
                patch.verified = false;
                patch.verified_by = None;
                patch.verified_at = None;
            }

            // Time-to-resolution is set on first completion only.
            if to == PatchStatus::Completed && patch.time_to_resolution_hours.is_none() {
                let opened_at = patch.history.first().map(|e| e.at).unwrap_or(now);
                let hours = (now - opened_at).num_seconds() as f64 / 3600.0;
                patch.time_to_resolution_hours = Some(hours);
            }

            patch.status = to;
            from
        };

        debug!(patch_id = %id, from = %from, to = %to, actor, "patch transition");
        self.record_patch_event(*id, to, note.unwrap_or(""));
        self.get(id)
    }

    /// Set the owner; a still-pending patch auto-advances to in_progress.
    pub fn assign(&mut self, id: &Uuid, owner: &str) -> Result<&ManagedPatch, EngineError> {
        let pending = {
            let patch = self
                .patches
                .get_mut(id)
                .ok_or(EngineError::NotFound { entity: "patch", id: *id })?;
            patch.assignment = Some(Assignment {
                owner: owner.to_string(),
                at: Utc::now(),
            });
            patch.status == PatchStatus::Pending
        };

        if pending {
            self.transition(id, PatchStatus::InProgress, owner, Some("assigned"))
        } else {
            self.get(id)
        }
    }

    /// Attach resolution details without changing status.
    pub fn record_resolution(
        &mut self,
        id: &Uuid,
        resolution: ResolutionDetails,
    ) -> Result<&ManagedPatch, EngineError> {
        let patch = self
            .patches
            .get_mut(id)
            .ok_or(EngineError::NotFound { entity: "patch", id: *id })?;
        patch.resolution = Some(resolution);
        self.get(id)
    }

    /// Link a pull request and move the patch into review.
    pub fn link_pull_request(
        &mut self,
        id: &Uuid,
        branch: &str,
        pr_url: &str,
        actor: &str,
    ) -> Result<&ManagedPatch, EngineError> {
        {
            let patch = self
                .patches
                .get_mut(id)
                .ok_or(EngineError::NotFound { entity: "patch", id: *id })?;
            patch.scm = Some(ScmLink {
                branch: branch.to_string(),
                pr_url: pr_url.to_string(),
                commit: None,
                merged_at: None,
            });
        }
        self.transition(id, PatchStatus::Review, actor, Some("pull request linked"))
    }

    /// Record the merge commit and move the patch into testing.
    pub fn mark_merged(
        &mut self,
        id: &Uuid,
        commit: &str,
        actor: &str,
    ) -> Result<&ManagedPatch, EngineError> {
        {
            let patch = self
                .patches
                .get_mut(id)
                .ok_or(EngineError::NotFound { entity: "patch", id: *id })?;
            match patch.scm.as_mut() {
                Some(scm) => {
                    scm.commit = Some(commit.to_string());
                    scm.merged_at = Some(Utc::now());
                }
                None => {
                    patch.scm = Some(ScmLink {
                        branch: String::new(),
                        pr_url: String::new(),
                        commit: Some(commit.to_string()),
                        merged_at: Some(Utc::now()),
                    });
                }
            }
        }
        self.transition(id, PatchStatus::Testing, actor, Some("merged"))
    }

    /// Verification verdict: pass completes the patch, fail sends it back
    /// to in_progress.
    pub fn verify(
        &mut self,
        id: &Uuid,
        actor: &str,
        passed: bool,
    ) -> Result<&ManagedPatch, EngineError> {
        if passed {
            self.transition(id, PatchStatus::Completed, actor, Some("verification passed"))?;
            let patch = self
                .patches
                .get_mut(id)
                .ok_or(EngineError::NotFound { entity: "patch", id: *id })?;
            patch.verified = true;
            patch.verified_by = Some(actor.to_string());
            patch.verified_at = Some(Utc::now());
            self.get(id)
        } else {
            self.transition(id, PatchStatus::InProgress, actor, Some("verification failed"))
        }
    }

    /// Best-effort persistence failures accumulated since the last drain.
    pub fn drain_sink_failures(&mut self) -> Vec<SinkFailure> {
        std::mem::take(&mut self.sink_failures)
    }

    fn record_patch_event(&mut self, id: Uuid, status: PatchStatus, note: &str) {
        if let Some(failure) = capture_failure(
            "record_patch_event",
            id,
            self.sink.record_patch_event(id, status, note),
        ) {
            self.sink_failures.push(failure);
        }
    }
}

impl Default for PatchManager {
    fn default() -> Self {
        Self::new()
    }
}
