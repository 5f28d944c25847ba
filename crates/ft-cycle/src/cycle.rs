//! Cycle aggregator: owns feedback collection for one build cycle,
//! derives a coarse patch list, and decides whether the cycle may
//! advance.
//!
//! The destination computed here deliberately skips the escalation rules:
//! it is the fast gate applied the moment an item arrives. The triage
//! orchestrator's pass is the authoritative one, and the two may disagree
//! for the same item.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ft_core::agents::team_for;
use ft_core::config::CycleConfig;
use ft_core::EngineError;
use ft_core::types::{
    BuildPhase, CycleResult, CycleStatus, Destination, EffortEstimate, FeedbackCategory,
    FeedbackDraft, FeedbackItem, PatchItem, PatchStatus, Severity,
};

// ---------------------------------------------------------------------------
// Coarse effort table
// ---------------------------------------------------------------------------

/// Cycle-level effort estimate from (category, raw severity). Coarser
/// than the classifier's hour table on purpose.
pub fn coarse_effort(category: FeedbackCategory, severity: Severity) -> EffortEstimate {
    match severity {
        Severity::Critical => match category {
            FeedbackCategory::FeatureGap | FeedbackCategory::Compliance => EffortEstimate::Xlarge,
            _ => EffortEstimate::Large,
        },
        Severity::High => match category {
            FeedbackCategory::Performance | FeedbackCategory::FeatureGap => EffortEstimate::Large,
            _ => EffortEstimate::Medium,
        },
        Severity::Medium => EffortEstimate::Small,
        Severity::Low => EffortEstimate::Trivial,
    }
}

// ---------------------------------------------------------------------------
// ProceedDecision
// ---------------------------------------------------------------------------

/// Whether the cycle may advance, with a human-readable reason either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProceedDecision {
    pub allowed: bool,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// BuildCycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BuildCycle {
    config: CycleConfig,
    feedback: Vec<FeedbackItem>,
    patches: Vec<PatchItem>,
    tests_run: u32,
    tests_passed: u32,
    started_at: DateTime<Utc>,
}

impl BuildCycle {
    pub fn new(config: CycleConfig) -> Self {
        Self {
            config,
            feedback: Vec::new(),
            patches: Vec::new(),
            tests_run: 0,
            tests_passed: 0,
            started_at: Utc::now(),
        }
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    pub fn feedback(&self) -> &[FeedbackItem] {
        &self.feedback
    }

    pub fn patches(&self) -> &[PatchItem] {
        &self.patches
    }

    /// The successor of the configured phase, or `None` at the end.
    pub fn next_phase(&self) -> Option<BuildPhase> {
        self.config.phase.next()
    }

    /// Stamp and append one feedback item. Computes the coarse destination
    /// from the raw severity and immediately synthesizes a patch record
    /// for blocker/parallel items. Returns a reference to the stored item.
    pub fn add_feedback(&mut self, draft: FeedbackDraft) -> &FeedbackItem {
        let item = draft.into_item(self.config.cycle, self.config.phase);
        let destination = Destination::for_severity(item.severity);

        if destination != Destination::Backlog {
            let patch = PatchItem {
                id: Uuid::new_v4(),
                feedback_id: item.id,
                destination,
                priority: item.severity.weight() + item.category.weight(),
                description: item.description.clone(),
                effort: coarse_effort(item.category, item.severity),
                component: team_for(&item.agent_source).map(|t| t.to_string()),
            };
            tracing::debug!(
                feedback_id = %item.id,
                destination = %destination,
                effort = ?patch.effort,
                "synthesized cycle-level patch"
            );
            self.patches.push(patch);
        }

        self.feedback.push(item);
        let stored = self.feedback.len() - 1;
        &self.feedback[stored]
    }

    /// Fold a test run into the cycle tallies. Rejects tallies where
    /// more tests passed than ran, which would push the health score
    /// past 100.
    pub fn record_tests(&mut self, run: u32, passed: u32) -> Result<(), EngineError> {
        if passed > run {
            return Err(EngineError::InvalidOperation(format!(
                "{passed} tests passed out of {run} run"
            )));
        }
        self.tests_run += run;
        self.tests_passed += passed;
        Ok(())
    }

    /// Reflect a patch's current status back onto the originating
    /// feedback item. Pending and Blocked carry no feedback-side meaning
    /// and leave the item untouched.
    pub fn apply_patch_status(
        &mut self,
        feedback_id: Uuid,
        status: PatchStatus,
    ) -> Result<&FeedbackItem, EngineError> {
        let item = self
            .feedback
            .iter_mut()
            .find(|i| i.id == feedback_id)
            .ok_or(EngineError::NotFound {
                entity: "feedback",
                id: feedback_id,
            })?;
        if let Some(next) = status.feedback_status() {
            tracing::debug!(
                feedback_id = %feedback_id,
                from = %item.status,
                to = %next,
                "feedback status updated from patch lifecycle"
            );
            item.status = next;
        }
        Ok(&*item)
    }

    /// Pass rate as a 0–100 score, 0 when no tests ran.
    pub fn health_score(&self) -> f64 {
        if self.tests_run == 0 {
            0.0
        } else {
            f64::from(self.tests_passed) / f64::from(self.tests_run) * 100.0
        }
    }

    /// Gate check: critical items (when `block_on_critical`) or too many
    /// high-severity items hold the cycle.
    pub fn can_proceed(&self) -> ProceedDecision {
        let critical_count = self.count_by_severity(Severity::Critical);
        if self.config.block_on_critical && critical_count > 0 {
            return ProceedDecision {
                allowed: false,
                reason: format!(
                    "{critical_count} critical item(s) present and block_on_critical is set"
                ),
            };
        }

        let high_count = self.count_by_severity(Severity::High);
        let threshold = self.config.effective_patch_threshold();
        if high_count as u32 > threshold {
            return ProceedDecision {
                allowed: false,
                reason: format!(
                    "{high_count} high-severity item(s) exceed the {} threshold of {threshold}",
                    self.config.phase
                ),
            };
        }

        ProceedDecision {
            allowed: true,
            reason: format!(
                "no blocking conditions across {} item(s)",
                self.feedback.len()
            ),
        }
    }

    /// Fold everything into the per-cycle summary.
    pub fn generate_result(&self) -> CycleResult {
        let proceed = self.can_proceed();
        let status = if !proceed.allowed {
            CycleStatus::Blocked
        } else if !self.patches.is_empty() {
            CycleStatus::NeedsPatches
        } else {
            CycleStatus::Passed
        };

        let mut by_severity: HashMap<Severity, usize> = HashMap::new();
        let mut by_category: HashMap<FeedbackCategory, usize> = HashMap::new();
        let mut by_destination: HashMap<Destination, usize> = HashMap::new();
        for item in &self.feedback {
            *by_severity.entry(item.severity).or_default() += 1;
            *by_category.entry(item.category).or_default() += 1;
            *by_destination
                .entry(Destination::for_severity(item.severity))
                .or_default() += 1;
        }

        let mut patches = self.patches.clone();
        patches.sort_by_key(|p| p.priority);

        let blockers: Vec<String> = self
            .feedback
            .iter()
            .filter(|i| i.severity == Severity::Critical)
            .map(|i| format!("[{}] {}", i.agent_source, i.description))
            .collect();

        let recommendation = self.recommendation(status, blockers.len(), patches.len());

        tracing::info!(
            cycle = self.config.cycle,
            phase = %self.config.phase,
            status = ?status,
            health = self.health_score(),
            feedback = self.feedback.len(),
            patches = patches.len(),
            "cycle result generated"
        );

        CycleResult {
            cycle: self.config.cycle,
            phase: self.config.phase,
            status,
            health_score: self.health_score(),
            tests_run: self.tests_run,
            tests_passed: self.tests_passed,
            feedback: self.feedback.clone(),
            by_severity,
            by_category,
            by_destination,
            patches,
            blockers,
            recommendation,
            started_at: self.started_at,
            generated_at: Utc::now(),
        }
    }

    fn recommendation(&self, status: CycleStatus, blockers: usize, patches: usize) -> String {
        match status {
            CycleStatus::Blocked => format!(
                "resolve {blockers} blocker(s) before leaving {}",
                self.config.phase
            ),
            CycleStatus::NeedsPatches => match self.next_phase() {
                Some(next) => format!("advance to {next} while scheduling {patches} patch(es)"),
                None => format!("schedule {patches} patch(es); pipeline is at its final phase"),
            },
            CycleStatus::Passed => match self.next_phase() {
                Some(next) => format!("cycle clean; advance to {next}"),
                None => "cycle clean; pipeline complete".to_string(),
            },
        }
    }

    fn count_by_severity(&self, severity: Severity) -> usize {
        self.feedback.iter().filter(|i| i.severity == severity).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(agent: &str, category: FeedbackCategory, severity: Severity) -> FeedbackDraft {
        FeedbackDraft::new(agent, category, severity, "observed anomaly")
    }

    fn cycle_at(phase: BuildPhase) -> BuildCycle {
        BuildCycle::new(CycleConfig::new(5, phase))
    }

    #[test]
    fn add_feedback_stamps_cycle_and_phase() {
        let mut cycle = cycle_at(BuildPhase::CoreServices);
        let item = cycle.add_feedback(draft("COURIER", FeedbackCategory::Bug, Severity::Low));
        assert_eq!(item.cycle, 5);
        assert_eq!(item.phase, BuildPhase::CoreServices);
    }

    #[test]
    fn blocker_and_parallel_items_synthesize_patches() {
        let mut cycle = cycle_at(BuildPhase::CoreServices);
        cycle.add_feedback(draft("SENTINEL", FeedbackCategory::Bug, Severity::Critical));
        cycle.add_feedback(draft("COURIER", FeedbackCategory::Bug, Severity::High));
        cycle.add_feedback(draft("SCRIBE", FeedbackCategory::UxIssue, Severity::Medium));
        cycle.add_feedback(draft("SCRIBE", FeedbackCategory::UxIssue, Severity::Low));

        assert_eq!(cycle.patches().len(), 2);
        assert_eq!(cycle.patches()[0].destination, Destination::BuildBlocker);
        assert_eq!(cycle.patches()[1].destination, Destination::ParallelPatch);
        assert_eq!(cycle.patches()[0].component.as_deref(), Some("quality"));
    }

    #[test]
    fn coarse_pass_ignores_escalation_rules() {
        // Medium compliance would escalate to critical in full triage; the
        // cycle-level gate keeps it in backlog and synthesizes no patch.
        let mut cycle = cycle_at(BuildPhase::ComplianceRules);
        cycle.add_feedback(draft("WARDEN", FeedbackCategory::Compliance, Severity::Medium));
        assert!(cycle.patches().is_empty());
        assert!(cycle.can_proceed().allowed);
    }

    #[test]
    fn critical_item_blocks_when_configured() {
        let mut cycle = cycle_at(BuildPhase::SelfTest);
        cycle.add_feedback(draft("SENTINEL", FeedbackCategory::Bug, Severity::Critical));
        let decision = cycle.can_proceed();
        assert!(!decision.allowed);
        assert!(decision.reason.contains("critical"));
    }

    #[test]
    fn critical_item_allowed_when_gate_disabled() {
        let mut config = CycleConfig::new(5, BuildPhase::SelfTest);
        config.block_on_critical = false;
        let mut cycle = BuildCycle::new(config);
        cycle.add_feedback(draft("SENTINEL", FeedbackCategory::Bug, Severity::Critical));
        assert!(cycle.can_proceed().allowed);
    }

    #[test]
    fn high_count_over_threshold_blocks() {
        // ReleasePrep tolerates a single high-severity item.
        let mut cycle = cycle_at(BuildPhase::ReleasePrep);
        cycle.add_feedback(draft("COURIER", FeedbackCategory::Bug, Severity::High));
        assert!(cycle.can_proceed().allowed);

        cycle.add_feedback(draft("HERALD", FeedbackCategory::Bug, Severity::High));
        let decision = cycle.can_proceed();
        assert!(!decision.allowed);
        assert!(decision.reason.contains("threshold"));
    }

    #[test]
    fn threshold_override_is_honored() {
        let mut config = CycleConfig::new(5, BuildPhase::ReleasePrep);
        config.parallel_patch_threshold = Some(10);
        let mut cycle = BuildCycle::new(config);
        for _ in 0..5 {
            cycle.add_feedback(draft("COURIER", FeedbackCategory::Bug, Severity::High));
        }
        assert!(cycle.can_proceed().allowed);
    }

    #[test]
    fn completed_patch_resolves_its_feedback() {
        use ft_core::types::FeedbackStatus;

        let mut cycle = cycle_at(BuildPhase::CoreServices);
        let id = cycle
            .add_feedback(draft("COURIER", FeedbackCategory::Bug, Severity::High))
            .id;
        assert_eq!(cycle.feedback()[0].status, FeedbackStatus::Open);

        cycle.apply_patch_status(id, PatchStatus::InProgress).unwrap();
        assert_eq!(cycle.feedback()[0].status, FeedbackStatus::InProgress);

        cycle.apply_patch_status(id, PatchStatus::Completed).unwrap();
        assert_eq!(cycle.feedback()[0].status, FeedbackStatus::Resolved);
    }

    #[test]
    fn wont_fix_and_deferred_patches_mark_feedback() {
        use ft_core::types::FeedbackStatus;

        let mut cycle = cycle_at(BuildPhase::CoreServices);
        let a = cycle
            .add_feedback(draft("HERALD", FeedbackCategory::Bug, Severity::High))
            .id;
        let b = cycle
            .add_feedback(draft("SCRIBE", FeedbackCategory::UxIssue, Severity::High))
            .id;

        cycle.apply_patch_status(a, PatchStatus::WontFix).unwrap();
        cycle.apply_patch_status(b, PatchStatus::Deferred).unwrap();
        assert_eq!(cycle.feedback()[0].status, FeedbackStatus::WontFix);
        assert_eq!(cycle.feedback()[1].status, FeedbackStatus::Deferred);
    }

    #[test]
    fn pending_patch_leaves_feedback_untouched() {
        use ft_core::types::FeedbackStatus;

        let mut cycle = cycle_at(BuildPhase::CoreServices);
        let id = cycle
            .add_feedback(draft("COURIER", FeedbackCategory::Bug, Severity::High))
            .id;
        let item = cycle.apply_patch_status(id, PatchStatus::Pending).unwrap();
        assert_eq!(item.status, FeedbackStatus::Open);

        // A reopened patch pulls a resolved item back to in-progress.
        cycle.apply_patch_status(id, PatchStatus::Completed).unwrap();
        cycle.apply_patch_status(id, PatchStatus::InProgress).unwrap();
        assert_eq!(cycle.feedback()[0].status, FeedbackStatus::InProgress);
    }

    #[test]
    fn patch_status_for_unknown_feedback_errors() {
        let mut cycle = cycle_at(BuildPhase::CoreServices);
        let err = cycle
            .apply_patch_status(Uuid::new_v4(), PatchStatus::Completed)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "feedback", .. }));
    }

    #[test]
    fn impossible_tally_is_rejected() {
        let mut cycle = cycle_at(BuildPhase::SelfTest);
        let err = cycle.record_tests(5, 9).unwrap_err();
        assert!(matches!(err, EngineError::InvalidOperation(_)));
        assert_eq!(cycle.health_score(), 0.0);
    }

    #[test]
    fn health_score_guards_division_by_zero() {
        let cycle = cycle_at(BuildPhase::SelfTest);
        assert_eq!(cycle.health_score(), 0.0);

        let mut cycle = cycle_at(BuildPhase::SelfTest);
        cycle.record_tests(40, 30).unwrap();
        cycle.record_tests(10, 10).unwrap();
        assert!((cycle.health_score() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn status_passed_when_clean() {
        let mut cycle = cycle_at(BuildPhase::SelfTest);
        cycle.record_tests(20, 20).unwrap();
        let result = cycle.generate_result();
        assert_eq!(result.status, CycleStatus::Passed);
        assert!(result.patches.is_empty());
        assert!(result.recommendation.contains("release_prep"));
    }

    #[test]
    fn status_needs_patches_with_high_items() {
        let mut cycle = cycle_at(BuildPhase::CoreServices);
        cycle.add_feedback(draft("COURIER", FeedbackCategory::Bug, Severity::High));
        let result = cycle.generate_result();
        assert_eq!(result.status, CycleStatus::NeedsPatches);
    }

    #[test]
    fn status_blocked_wins_over_needs_patches() {
        let mut cycle = cycle_at(BuildPhase::CoreServices);
        cycle.add_feedback(draft("COURIER", FeedbackCategory::Bug, Severity::High));
        cycle.add_feedback(draft("SENTINEL", FeedbackCategory::Bug, Severity::Critical));
        let result = cycle.generate_result();
        assert_eq!(result.status, CycleStatus::Blocked);
        assert_eq!(result.blockers.len(), 1);
        assert!(result.blockers[0].contains("SENTINEL"));
    }

    #[test]
    fn result_patches_sorted_by_priority() {
        let mut cycle = cycle_at(BuildPhase::CoreServices);
        cycle.add_feedback(draft("SCRIBE", FeedbackCategory::UxIssue, Severity::High));
        cycle.add_feedback(draft("SENTINEL", FeedbackCategory::Bug, Severity::Critical));
        cycle.add_feedback(draft("BEACON", FeedbackCategory::Security, Severity::High));

        let result = cycle.generate_result();
        let priorities: Vec<i32> = result.patches.iter().map(|p| p.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable();
        assert_eq!(priorities, sorted);
        assert_eq!(result.patches[0].destination, Destination::BuildBlocker);
    }

    #[test]
    fn result_counts_reconcile_with_feedback() {
        let mut cycle = cycle_at(BuildPhase::CoreServices);
        cycle.add_feedback(draft("COURIER", FeedbackCategory::Bug, Severity::High));
        cycle.add_feedback(draft("COURIER", FeedbackCategory::Bug, Severity::Low));
        cycle.add_feedback(draft("SCRIBE", FeedbackCategory::UxIssue, Severity::Low));

        let result = cycle.generate_result();
        assert_eq!(result.by_severity.values().sum::<usize>(), 3);
        assert_eq!(result.by_category.values().sum::<usize>(), 3);
        assert_eq!(result.by_destination.values().sum::<usize>(), 3);
        assert_eq!(result.by_category[&FeedbackCategory::Bug], 2);
        assert_eq!(result.by_destination[&Destination::Backlog], 2);
    }

    #[test]
    fn coarse_effort_table_spot_checks() {
        assert_eq!(
            coarse_effort(FeedbackCategory::Compliance, Severity::Critical),
            EffortEstimate::Xlarge
        );
        assert_eq!(
            coarse_effort(FeedbackCategory::Bug, Severity::Critical),
            EffortEstimate::Large
        );
        assert_eq!(
            coarse_effort(FeedbackCategory::Performance, Severity::High),
            EffortEstimate::Large
        );
        assert_eq!(
            coarse_effort(FeedbackCategory::Bug, Severity::High),
            EffortEstimate::Medium
        );
        assert_eq!(
            coarse_effort(FeedbackCategory::Security, Severity::Medium),
            EffortEstimate::Small
        );
        assert_eq!(
            coarse_effort(FeedbackCategory::UxIssue, Severity::Low),
            EffortEstimate::Trivial
        );
    }
}
