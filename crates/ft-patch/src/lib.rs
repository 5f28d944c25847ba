//! Patch lifecycle management: materializes remediation work from triage
//! reports and tracks it through the status state machine, with queue and
//! velocity analytics on top.

pub mod manager;
pub mod queue;

pub use manager::{effort_from_hours, PatchManager};
pub use queue::{PriorityBand, QueueSummary, QueueTrend, VelocityReport, VelocityWindow};
