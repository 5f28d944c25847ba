//! Triage orchestrator: runs the classifier over a batch, aggregates the
//! blocker/patch/backlog queues, invokes the pattern detector, and emits
//! a [`TriageReport`].

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use ft_core::sink::{capture_failure, NullSink, TriageSink};
use ft_core::store::Store;
use ft_core::types::{BuildPhase, Destination, FeedbackItem, TriageDecision, TriageReport};

use crate::classifier::Classifier;
use crate::escalation::EscalationRule;
use crate::patterns::PatternDetector;

// ---------------------------------------------------------------------------
// TriageEngine
// ---------------------------------------------------------------------------

/// Owns the decision store for repeated triage passes. Re-running a pass
/// over the same items replaces their decisions in place; the engine
/// never patches a decision.
pub struct TriageEngine {
    classifier: Classifier,
    detector: PatternDetector,
    decisions: Store<TriageDecision>,
    sink: Arc<dyn TriageSink>,
}

impl std::fmt::Debug for TriageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriageEngine")
            .field("decisions", &self.decisions.len())
            .finish()
    }
}

impl TriageEngine {
    /// Engine with the standard rules and no persistence collaborator.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(NullSink))
    }

    pub fn with_sink(sink: Arc<dyn TriageSink>) -> Self {
        Self {
            classifier: Classifier::new(),
            detector: PatternDetector::new(),
            decisions: Store::new(),
            sink,
        }
    }

    pub fn with_classifier(classifier: Classifier, sink: Arc<dyn TriageSink>) -> Self {
        Self {
            classifier,
            detector: PatternDetector::new(),
            decisions: Store::new(),
            sink,
        }
    }

    /// Register a custom escalation rule for subsequent passes.
    pub fn register_rule(&mut self, rule: EscalationRule) {
        self.classifier.register_rule(rule);
    }

    /// The stored decision for a feedback id, if a pass has seen it.
    pub fn decision(&self, feedback_id: &Uuid) -> Option<&TriageDecision> {
        self.decisions.get(feedback_id)
    }

    pub fn decision_count(&self) -> usize {
        self.decisions.len()
    }

    /// One full triage pass: persist each item, classify, queue, detect
    /// patterns, report. Sink writes are best-effort; failures land on
    /// the report.
    pub fn run_triage(
        &mut self,
        cycle: u32,
        phase: BuildPhase,
        batch: &[FeedbackItem],
    ) -> TriageReport {
        let mut decisions = Vec::with_capacity(batch.len());
        let mut build_blockers = Vec::new();
        let mut parallel_patches = Vec::new();
        let mut backlog_items = Vec::new();
        let mut persistence_failures = Vec::new();

        for item in batch {
            if let Some(failure) = capture_failure(
                "record_feedback",
                item.id,
                self.sink.record_feedback(item),
            ) {
                persistence_failures.push(failure);
            }

            let decision = self.classifier.classify(item);

            match decision.destination {
                Destination::BuildBlocker => build_blockers.push(item.id),
                Destination::ParallelPatch => parallel_patches.push(item.id),
                Destination::Backlog => backlog_items.push(item.id),
            }

            if let Some(failure) = capture_failure(
                "record_decision",
                item.id,
                self.sink.record_decision(&decision),
            ) {
                persistence_failures.push(failure);
            }

            self.decisions.insert(item.id, decision.clone());
            decisions.push(decision);
        }

        let patterns = self.detector.detect(batch, &decisions);
        let escalated_count = decisions.iter().filter(|d| d.auto_escalated).count();

        info!(
            cycle,
            phase = %phase,
            items = batch.len(),
            blockers = build_blockers.len(),
            parallel = parallel_patches.len(),
            backlog = backlog_items.len(),
            escalated = escalated_count,
            patterns = patterns.len(),
            "triage pass complete"
        );

        TriageReport {
            cycle,
            phase,
            generated_at: Utc::now(),
            decisions,
            build_blockers,
            parallel_patches,
            backlog_items,
            escalated_count,
            patterns,
            persistence_failures,
        }
    }
}

impl Default for TriageEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_core::sink::{FailingSink, RecordingSink};
    use ft_core::types::{FeedbackCategory, FeedbackDraft, Severity};

    fn item(agent: &str, category: FeedbackCategory, severity: Severity) -> FeedbackItem {
        FeedbackDraft::new(agent, category, severity, "observed anomaly")
            .into_item(1, BuildPhase::SelfTest)
    }

    #[test]
    fn queues_partition_the_batch() {
        let mut engine = TriageEngine::new();
        let batch = vec![
            item("SENTINEL", FeedbackCategory::Bug, Severity::Critical),
            item("COURIER", FeedbackCategory::Bug, Severity::High),
            item("SCRIBE", FeedbackCategory::UxIssue, Severity::Low),
        ];
        let report = engine.run_triage(1, BuildPhase::SelfTest, &batch);

        assert_eq!(report.build_blockers.len(), 1);
        assert_eq!(report.parallel_patches.len(), 1);
        assert_eq!(report.backlog_items.len(), 1);
        assert_eq!(
            report.build_blockers.len()
                + report.parallel_patches.len()
                + report.backlog_items.len(),
            batch.len()
        );
        assert_eq!(report.decisions.len(), batch.len());
    }

    #[test]
    fn decisions_are_stored_and_replaced_on_rerun() {
        let mut engine = TriageEngine::new();
        let batch = vec![item("HERALD", FeedbackCategory::Bug, Severity::Medium)];
        let id = batch[0].id;

        engine.run_triage(1, BuildPhase::SelfTest, &batch);
        assert_eq!(engine.decision_count(), 1);
        let first_priority = engine.decision(&id).unwrap().priority;

        // A custom rule changes the verdict; the rerun replaces it.
        engine.register_rule(EscalationRule::new(
            "herald-bugs-critical",
            Severity::Critical,
            "notification loss is customer-visible",
            |i| i.agent_source == "HERALD",
        ));
        engine.run_triage(1, BuildPhase::SelfTest, &batch);

        assert_eq!(engine.decision_count(), 1);
        let replaced = engine.decision(&id).unwrap();
        assert!(replaced.priority < first_priority);
        assert_eq!(replaced.destination, Destination::BuildBlocker);
    }

    #[test]
    fn decisions_keep_batch_input_order() {
        let mut engine = TriageEngine::new();
        let batch = vec![
            item("SCRIBE", FeedbackCategory::UxIssue, Severity::Low),
            item("SENTINEL", FeedbackCategory::Bug, Severity::Critical),
        ];
        let report = engine.run_triage(1, BuildPhase::SelfTest, &batch);
        assert_eq!(report.decisions[0].feedback_id, batch[0].id);
        assert_eq!(report.decisions[1].feedback_id, batch[1].id);
    }

    #[test]
    fn sink_receives_every_decision() {
        let sink = Arc::new(RecordingSink::default());
        let mut engine = TriageEngine::with_sink(sink.clone());
        let batch = vec![
            item("WARDEN", FeedbackCategory::Compliance, Severity::Medium),
            item("SCRIBE", FeedbackCategory::UxIssue, Severity::Low),
        ];
        let report = engine.run_triage(2, BuildPhase::ComplianceRules, &batch);

        assert!(report.persistence_failures.is_empty());
        let recorded = sink.decisions.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0], batch[0].id);
        // The raw items were persisted ahead of their decisions.
        assert_eq!(sink.feedback.lock().unwrap().len(), 2);
    }

    #[test]
    fn sink_failures_are_surfaced_not_fatal() {
        let mut engine = TriageEngine::with_sink(Arc::new(FailingSink));
        let batch = vec![
            item("WARDEN", FeedbackCategory::Compliance, Severity::Medium),
            item("SCRIBE", FeedbackCategory::UxIssue, Severity::Low),
        ];
        let report = engine.run_triage(2, BuildPhase::ComplianceRules, &batch);

        // The pass completed in full despite every write failing: one
        // item write plus one decision write per batch entry.
        assert_eq!(report.decisions.len(), 2);
        assert_eq!(report.persistence_failures.len(), 4);
        assert_eq!(report.persistence_failures[0].operation, "record_feedback");
        assert_eq!(report.persistence_failures[1].operation, "record_decision");
    }

    #[test]
    fn escalated_count_matches_decisions() {
        let mut engine = TriageEngine::new();
        let batch = vec![
            item("WARDEN", FeedbackCategory::Compliance, Severity::Medium), // escalates
            item("SENTINEL", FeedbackCategory::Bug, Severity::Low),         // escalates
            item("SCRIBE", FeedbackCategory::UxIssue, Severity::Low),       // does not
        ];
        let report = engine.run_triage(1, BuildPhase::SelfTest, &batch);
        assert_eq!(report.escalated_count, 2);
    }

    #[test]
    fn report_serializes() {
        let mut engine = TriageEngine::new();
        let batch = vec![item("LEDGER", FeedbackCategory::DataQuality, Severity::Medium)];
        let report = engine.run_triage(3, BuildPhase::CoreServices, &batch);

        let json = serde_json::to_string(&report).unwrap();
        let back: TriageReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cycle, 3);
        assert_eq!(back.decisions.len(), 1);
    }
}
