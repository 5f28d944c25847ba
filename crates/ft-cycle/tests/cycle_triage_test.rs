//! Cycle aggregator + triage orchestrator working together over one
//! batch: the coarse gate and the authoritative pass.

use ft_core::config::CycleConfig;
use ft_core::types::{BuildPhase, CycleStatus, FeedbackCategory, FeedbackDraft, Severity};
use ft_cycle::BuildCycle;
use ft_triage::TriageEngine;

fn draft(agent: &str, category: FeedbackCategory, severity: Severity, text: &str) -> FeedbackDraft {
    FeedbackDraft::new(agent, category, severity, text)
}

// ===========================================================================
// One critical SENTINEL bug, two high CARTOGRAPH items, five low items.
// ===========================================================================

#[test]
fn blocked_cycle_with_mixed_batch() {
    let mut cycle = BuildCycle::new(CycleConfig::new(9, BuildPhase::SelfTest));

    cycle.add_feedback(draft(
        "SENTINEL",
        FeedbackCategory::Bug,
        Severity::Critical,
        "validation harness crashed mid-run",
    ));
    cycle.add_feedback(draft(
        "CARTOGRAPH",
        FeedbackCategory::Bug,
        Severity::High,
        "address lookup returns the wrong parcel",
    ));
    cycle.add_feedback(draft(
        "CARTOGRAPH",
        FeedbackCategory::Performance,
        Severity::High,
        "batch geocode takes 9s per record",
    ));
    for n in 0..5 {
        cycle.add_feedback(draft(
            "SCRIBE",
            FeedbackCategory::UxIssue,
            Severity::Low,
            &format!("cosmetic defect {n} in rendered document"),
        ));
    }
    cycle.record_tests(50, 42).unwrap();

    // Authoritative pass over the same batch.
    let mut engine = TriageEngine::new();
    let report = engine.run_triage(9, BuildPhase::SelfTest, cycle.feedback());

    assert_eq!(report.build_blockers.len(), 1);
    assert_eq!(report.parallel_patches.len(), 2);
    assert_eq!(report.backlog_items.len(), 5);

    let result = cycle.generate_result();
    assert_eq!(result.status, CycleStatus::Blocked);
    assert!(!cycle.can_proceed().allowed);
    assert!((result.health_score - 84.0).abs() < 1e-9);

    // The result is a plain record; it survives a serde round-trip.
    let json = serde_json::to_string(&result).unwrap();
    let back: ft_core::types::CycleResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.status, CycleStatus::Blocked);
    assert_eq!(back.feedback.len(), 8);
}

// ===========================================================================
// Coarse gate vs. authoritative pass divergence
// ===========================================================================

#[test]
fn cycle_gate_and_triage_may_disagree_on_destination() {
    // A medium compliance item: the coarse gate files it as backlog, the
    // triage pass escalates it to a build blocker. Both verdicts stand.
    let mut cycle = BuildCycle::new(CycleConfig::new(9, BuildPhase::ComplianceRules));
    cycle.add_feedback(draft(
        "WARDEN",
        FeedbackCategory::Compliance,
        Severity::Medium,
        "threshold outside certified band",
    ));

    assert!(cycle.patches().is_empty());
    assert!(cycle.can_proceed().allowed);

    let mut engine = TriageEngine::new();
    let report = engine.run_triage(9, BuildPhase::ComplianceRules, cycle.feedback());
    assert_eq!(report.build_blockers.len(), 1);
    assert_eq!(report.escalated_count, 1);
}

// ===========================================================================
// Clean cycle
// ===========================================================================

#[test]
fn clean_cycle_passes_and_advances() {
    let mut cycle = BuildCycle::new(CycleConfig::new(10, BuildPhase::DatabaseFoundation));
    cycle.record_tests(30, 30).unwrap();

    let result = cycle.generate_result();
    assert_eq!(result.status, CycleStatus::Passed);
    assert_eq!(result.health_score, 100.0);
    assert_eq!(cycle.next_phase(), Some(BuildPhase::SchemaMigration));

    let mut engine = TriageEngine::new();
    let report = engine.run_triage(10, BuildPhase::DatabaseFoundation, cycle.feedback());
    assert!(report.decisions.is_empty());
    assert!(report.patterns.is_empty());
}
