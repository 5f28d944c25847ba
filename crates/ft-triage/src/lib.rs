//! Feedback triage: escalation rules, classification, pattern detection,
//! and the orchestrator that turns a feedback batch into a
//! [`ft_core::types::TriageReport`].

pub mod classifier;
pub mod escalation;
pub mod orchestrator;
pub mod patterns;

pub use classifier::{estimated_hours, priority_for, Classifier};
pub use escalation::{EscalationOutcome, EscalationRule, EscalationRuleSet};
pub use orchestrator::TriageEngine;
pub use patterns::{PatternDetector, CLUSTER_KEYWORDS};
