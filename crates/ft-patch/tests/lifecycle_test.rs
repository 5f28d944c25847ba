//! Importing a triage report into the patch manager and walking patches
//! through the lifecycle, including reopen bookkeeping and queue math.

use std::sync::Arc;

use ft_core::sink::{FailingSink, RecordingSink};
use ft_core::types::{
    BuildPhase, FeedbackCategory, FeedbackDraft, FeedbackItem, PatchStatus, Severity,
};
use ft_patch::{PatchManager, PriorityBand, VelocityWindow};
use ft_triage::TriageEngine;

fn item(agent: &str, category: FeedbackCategory, severity: Severity, text: &str) -> FeedbackItem {
    FeedbackDraft::new(agent, category, severity, text).into_item(15, BuildPhase::SelfTest)
}

fn blocker_and_two_parallels() -> Vec<FeedbackItem> {
    vec![
        item("SENTINEL", FeedbackCategory::Bug, Severity::Critical, "harness crash"),
        item("CARTOGRAPH", FeedbackCategory::Bug, Severity::High, "wrong parcel match"),
        item("HERALD", FeedbackCategory::UxIssue, Severity::High, "toast never dismisses"),
        item("SCRIBE", FeedbackCategory::UxIssue, Severity::Low, "footer misaligned"),
    ]
}

// ===========================================================================
// Import: one blocker + two parallels -> exactly three pending patches
// ===========================================================================

#[test]
fn import_materializes_three_pending_patches_sorted_by_priority() {
    let batch = blocker_and_two_parallels();
    let report = TriageEngine::new().run_triage(15, BuildPhase::SelfTest, &batch);
    assert_eq!(report.build_blockers.len(), 1);
    assert_eq!(report.parallel_patches.len(), 2);

    let mut manager = PatchManager::new();
    let ids = manager.import_report(&report);
    assert_eq!(ids.len(), 3);
    assert_eq!(manager.len(), 3);

    let queue = manager.queue();
    assert!(queue.iter().all(|p| p.status == PatchStatus::Pending));
    for window in queue.windows(2) {
        assert!(window[0].priority <= window[1].priority);
    }
    assert_eq!(
        PriorityBand::for_priority(queue[0].priority),
        PriorityBand::Critical
    );
}

// ===========================================================================
// Lifecycle walk with sink observation
// ===========================================================================

#[test]
fn full_lifecycle_is_visible_to_the_sink() {
    let batch = blocker_and_two_parallels();
    let report = TriageEngine::new().run_triage(15, BuildPhase::SelfTest, &batch);

    let sink = Arc::new(RecordingSink::default());
    let mut manager = PatchManager::with_sink(sink.clone());
    let ids = manager.import_report(&report);

    manager.assign(&ids[0], "rivera").unwrap();
    manager
        .link_pull_request(&ids[0], "fix/sentinel-crash", "https://example.test/pr/7", "rivera")
        .unwrap();
    manager.mark_merged(&ids[0], "4be12c0", "rivera").unwrap();
    manager.verify(&ids[0], "quality-bot", true).unwrap();

    let patch = manager.get(&ids[0]).unwrap();
    assert_eq!(patch.status, PatchStatus::Completed);
    assert!(patch.verified);

    let events = sink.patch_events.lock().unwrap();
    // 3 created + assigned + review + testing + completed.
    assert_eq!(events.len(), 7);
    assert_eq!(events.last().unwrap().1, PatchStatus::Completed);
    assert!(manager.drain_sink_failures().is_empty());
}

#[test]
fn sink_failures_accumulate_but_never_abort() {
    let batch = blocker_and_two_parallels();
    let report = TriageEngine::new().run_triage(15, BuildPhase::SelfTest, &batch);

    let mut manager = PatchManager::with_sink(Arc::new(FailingSink));
    let ids = manager.import_report(&report);
    assert_eq!(manager.len(), 3);

    manager.assign(&ids[0], "rivera").unwrap();
    let failures = manager.drain_sink_failures();
    // 3 import events + 1 transition, all failed, all captured.
    assert_eq!(failures.len(), 4);
    assert!(manager.drain_sink_failures().is_empty());
}

// ===========================================================================
// Reopen + queue totals
// ===========================================================================

#[test]
fn reopened_patch_counts_once_and_queue_reconciles() {
    let batch = blocker_and_two_parallels();
    let report = TriageEngine::new().run_triage(15, BuildPhase::SelfTest, &batch);
    let mut manager = PatchManager::new();
    let ids = manager.import_report(&report);

    manager.verify(&ids[1], "quality-bot", true).unwrap();
    manager
        .transition(&ids[1], PatchStatus::InProgress, "ng", Some("regression"))
        .unwrap();

    let patch = manager.get(&ids[1]).unwrap();
    assert_eq!(patch.reopen_count, 1);
    assert!(!patch.verified);
    // The original resolution time is retained through the reopen.
    assert!(patch.time_to_resolution_hours.is_some());

    let summary = manager.queue_summary();
    assert_eq!(summary.total_patches, 3);
    assert_eq!(summary.by_status.values().sum::<usize>(), 3);
    assert_eq!(summary.by_priority.values().sum::<usize>(), 3);

    let json = serde_json::to_string(&summary).unwrap();
    let back: ft_patch::QueueSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(back.total_patches, 3);

    let velocity = manager.velocity(VelocityWindow::Day);
    assert_eq!(velocity.created, 3);
    assert_eq!(velocity.completed, 1);
}
