//! Queue analytics over the managed patch set: status/priority/component
//! breakdowns, age, remaining effort, and creation-vs-completion velocity.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ft_core::types::PatchStatus;

use crate::manager::PatchManager;

// ---------------------------------------------------------------------------
// PriorityBand
// ---------------------------------------------------------------------------

/// Coarse bands over the classifier's priority scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityBand {
    Critical,
    High,
    Medium,
    Low,
}

impl PriorityBand {
    /// Band for a priority value: <100 critical, <200 high, <300 medium,
    /// else low. The same scale the classifier emits.
    pub fn for_priority(priority: i32) -> PriorityBand {
        if priority < 100 {
            PriorityBand::Critical
        } else if priority < 200 {
            PriorityBand::High
        } else if priority < 300 {
            PriorityBand::Medium
        } else {
            PriorityBand::Low
        }
    }
}

// ---------------------------------------------------------------------------
// QueueSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSummary {
    pub total_patches: usize,
    pub by_status: HashMap<PatchStatus, usize>,
    pub by_priority: HashMap<PriorityBand, usize>,
    /// Keyed by owning component; unowned patches land under "unassigned".
    pub by_component: HashMap<String, usize>,
    pub average_age_hours: f64,
    pub oldest_patch: Option<Uuid>,
    /// Effort-hours remaining across non-terminal patches.
    pub estimated_remaining_hours: f64,
}

// ---------------------------------------------------------------------------
// Velocity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityWindow {
    Day,
    Week,
    Sprint,
}

impl VelocityWindow {
    pub fn hours(&self) -> i64 {
        match self {
            VelocityWindow::Day => 24,
            VelocityWindow::Week => 24 * 7,
            VelocityWindow::Sprint => 24 * 14,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueTrend {
    Accelerating,
    Slowing,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityReport {
    pub window: VelocityWindow,
    pub created: usize,
    pub completed: usize,
    /// completed − created over the window.
    pub net: i64,
    /// Mean time-to-resolution among patches completed in the window that
    /// have a known resolution time; 0 when none do.
    pub average_resolution_hours: f64,
    pub trend: QueueTrend,
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

impl PatchManager {
    /// Snapshot of the queue as of `now`.
    pub fn queue_summary(&self) -> QueueSummary {
        self.queue_summary_at(Utc::now())
    }

    /// Testable variant with an explicit clock.
    pub fn queue_summary_at(&self, now: DateTime<Utc>) -> QueueSummary {
        let mut by_status: HashMap<PatchStatus, usize> = HashMap::new();
        let mut by_priority: HashMap<PriorityBand, usize> = HashMap::new();
        let mut by_component: HashMap<String, usize> = HashMap::new();
        let mut total_age_hours = 0.0;
        let mut oldest: Option<(Uuid, DateTime<Utc>)> = None;
        let mut remaining_hours = 0.0;
        let mut total = 0usize;

        for patch in self.iter() {
            total += 1;
            *by_status.entry(patch.status).or_default() += 1;
            *by_priority
                .entry(PriorityBand::for_priority(patch.priority))
                .or_default() += 1;
            let component = patch
                .component
                .clone()
                .unwrap_or_else(|| "unassigned".to_string());
            *by_component.entry(component).or_default() += 1;

            total_age_hours += (now - patch.created_at).num_seconds() as f64 / 3600.0;
            if oldest.map_or(true, |(_, at)| patch.created_at < at) {
                oldest = Some((patch.id, patch.created_at));
            }
            if !patch.status.is_terminal() {
                remaining_hours += patch.effort.hours();
            }
        }

        QueueSummary {
            total_patches: total,
            by_status,
            by_priority,
            by_component,
            average_age_hours: if total == 0 {
                0.0
            } else {
                total_age_hours / total as f64
            },
            oldest_patch: oldest.map(|(id, _)| id),
            estimated_remaining_hours: remaining_hours,
        }
    }

    /// Creation-vs-completion velocity over the trailing window.
    pub fn velocity(&self, window: VelocityWindow) -> VelocityReport {
        self.velocity_at(window, Utc::now())
    }

    pub fn velocity_at(&self, window: VelocityWindow, now: DateTime<Utc>) -> VelocityReport {
        let cutoff = now - Duration::hours(window.hours());

        let mut created = 0usize;
        let mut completed = 0usize;
        let mut resolution_sum = 0.0;
        let mut resolution_count = 0usize;

        for patch in self.iter() {
            if patch.created_at >= cutoff {
                created += 1;
            }
            let completed_in_window = patch
                .history
                .iter()
                .any(|e| e.status == PatchStatus::Completed && e.at >= cutoff);
            if completed_in_window {
                completed += 1;
                if let Some(ttr) = patch.time_to_resolution_hours {
                    resolution_sum += ttr;
                    resolution_count += 1;
                }
            }
        }

        let net = completed as i64 - created as i64;
        let trend = if net > 2 {
            QueueTrend::Accelerating
        } else if net < -2 {
            QueueTrend::Slowing
        } else {
            QueueTrend::Stable
        };

        VelocityReport {
            window,
            created,
            completed,
            net,
            average_resolution_hours: if resolution_count == 0 {
                0.0
            } else {
                resolution_sum / resolution_count as f64
            },
            trend,
        }
    }
}
