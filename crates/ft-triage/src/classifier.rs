//! Classifier: maps one feedback item plus the escalation rules to an
//! immutable [`TriageDecision`].

use ft_core::agents::{downstream_of, team_for};
use ft_core::types::{Destination, FeedbackCategory, FeedbackItem, Severity, TriageDecision};

use crate::escalation::{EscalationRule, EscalationRuleSet};

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Combined priority: lower is more urgent. Severity bands are 100 wide
/// and category weights are distinct and < 100, so sorting by priority is
/// a total order over (severity, category).
pub fn priority_for(severity: Severity, category: FeedbackCategory) -> i32 {
    severity.weight() + category.weight()
}

// ---------------------------------------------------------------------------
// Resolution estimate
// ---------------------------------------------------------------------------

/// Estimated resolution hours per (category, adjusted severity).
///
/// An explicit lookup table, not a formula: the figures were tuned per
/// cell and the report fixtures depend on them exactly.
pub fn estimated_hours(category: FeedbackCategory, severity: Severity) -> f64 {
    use FeedbackCategory::*;
    use Severity::*;
    match (category, severity) {
        (Bug, Critical) => 8.0,
        (Bug, High) => 4.0,
        (Bug, Medium) => 2.0,
        (Bug, Low) => 1.0,

        (UxIssue, Critical) => 6.0,
        (UxIssue, High) => 3.0,
        (UxIssue, Medium) => 2.0,
        (UxIssue, Low) => 1.0,

        (Performance, Critical) => 12.0,
        (Performance, High) => 6.0,
        (Performance, Medium) => 3.0,
        (Performance, Low) => 2.0,

        (FeatureGap, Critical) => 16.0,
        (FeatureGap, High) => 8.0,
        (FeatureGap, Medium) => 4.0,
        (FeatureGap, Low) => 2.0,

        (DataQuality, Critical) => 10.0,
        (DataQuality, High) => 5.0,
        (DataQuality, Medium) => 3.0,
        (DataQuality, Low) => 1.0,

        (Security, Critical) => 12.0,
        (Security, High) => 8.0,
        (Security, Medium) => 4.0,
        (Security, Low) => 2.0,

        (Compliance, Critical) => 16.0,
        (Compliance, High) => 8.0,
        (Compliance, Medium) => 6.0,
        (Compliance, Low) => 2.0,
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Classifier {
    rules: EscalationRuleSet,
}

impl Classifier {
    /// Classifier with the standard escalation rules.
    pub fn new() -> Self {
        Self {
            rules: EscalationRuleSet::with_default_rules(),
        }
    }

    pub fn with_rules(rules: EscalationRuleSet) -> Self {
        Self { rules }
    }

    /// Register a custom rule; it participates in the same pass.
    pub fn register_rule(&mut self, rule: EscalationRule) {
        self.rules.register(rule);
    }

    pub fn rules(&self) -> &EscalationRuleSet {
        &self.rules
    }

    /// Produce the verdict for one item. Pure: no state is retained here;
    /// the orchestrator owns the decision store.
    pub fn classify(&self, item: &FeedbackItem) -> TriageDecision {
        let outcome = self.rules.evaluate(item);
        let adjusted = outcome.adjusted;
        let destination = Destination::for_severity(adjusted);
        let priority = priority_for(adjusted, item.category);

        let dependents: Vec<String> = if adjusted == Severity::Critical {
            downstream_of(&item.agent_source)
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            Vec::new()
        };
        let blocks_dependents = !dependents.is_empty();

        let rationale = if outcome.escalated {
            format!(
                "{} {} from {} escalated {} -> {}, routed to {}",
                adjusted, item.category, item.agent_source, item.severity, adjusted, destination
            )
        } else {
            format!(
                "{} {} from {} routed to {}",
                adjusted, item.category, item.agent_source, destination
            )
        };

        tracing::debug!(
            feedback_id = %item.id,
            severity = %adjusted,
            destination = %destination,
            priority,
            escalated = outcome.escalated,
            "classified feedback item"
        );

        TriageDecision {
            feedback_id: item.id,
            original_severity: item.severity,
            adjusted_severity: adjusted,
            priority,
            destination,
            rationale,
            auto_escalated: outcome.escalated,
            escalation_reason: if outcome.reasons.is_empty() {
                None
            } else {
                Some(outcome.reasons.join("; "))
            },
            suggested_owner: team_for(&item.agent_source).map(|t| t.to_string()),
            estimated_hours: estimated_hours(item.category, adjusted),
            blocks_dependents,
            dependents,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}
