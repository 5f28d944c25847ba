//! Escalation rules: predicates that may raise (never lower) an item's
//! severity before classification.

use ft_core::agents::CORE_AGENTS;
use ft_core::types::{FeedbackCategory, FeedbackItem, Severity};

// ---------------------------------------------------------------------------
// EscalationRule
// ---------------------------------------------------------------------------

type Predicate = Box<dyn Fn(&FeedbackItem) -> bool + Send + Sync>;

/// One predicate→severity rule with a human-readable reason.
pub struct EscalationRule {
    pub name: String,
    pub target: Severity,
    pub reason: String,
    predicate: Predicate,
}

impl EscalationRule {
    pub fn new(
        name: impl Into<String>,
        target: Severity,
        reason: impl Into<String>,
        predicate: impl Fn(&FeedbackItem) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            reason: reason.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn fires_on(&self, item: &FeedbackItem) -> bool {
        (self.predicate)(item)
    }
}

impl std::fmt::Debug for EscalationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscalationRule")
            .field("name", &self.name)
            .field("target", &self.target)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EscalationOutcome
// ---------------------------------------------------------------------------

/// Result of evaluating the rule set over one item.
#[derive(Debug, Clone)]
pub struct EscalationOutcome {
    pub adjusted: Severity,
    pub escalated: bool,
    /// Reasons of the rules that actually raised severity, in rule order.
    pub reasons: Vec<String>,
}

// ---------------------------------------------------------------------------
// EscalationRuleSet
// ---------------------------------------------------------------------------

/// Rules evaluated in fixed registration order. More than one rule may
/// fire; the adjusted severity is the most urgent of the original and all
/// firing targets -- escalation only, never de-escalation.
#[derive(Debug, Default)]
pub struct EscalationRuleSet {
    rules: Vec<EscalationRule>,
}

impl EscalationRuleSet {
    /// Empty rule set: every item keeps its raw severity.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The standard five rules, in canonical order.
    pub fn with_default_rules() -> Self {
        let mut set = Self::empty();

        set.register(EscalationRule::new(
            "compliance-always-critical",
            Severity::Critical,
            "compliance issues risk certification",
            |item| {
                item.category == FeedbackCategory::Compliance
                    && item.severity != Severity::Critical
            },
        ));

        set.register(EscalationRule::new(
            "security-floor-high",
            Severity::High,
            "security findings never ride below high",
            |item| {
                item.category == FeedbackCategory::Security
                    && matches!(item.severity, Severity::Medium | Severity::Low)
            },
        ));

        set.register(EscalationRule::new(
            "data-quality-medium-to-high",
            Severity::High,
            "data quality drift at medium compounds across cycles",
            |item| {
                item.category == FeedbackCategory::DataQuality
                    && item.severity == Severity::Medium
            },
        ));

        set.register(EscalationRule::new(
            "sentinel-bugs-critical",
            Severity::Critical,
            "bugs in SENTINEL undermine every downstream check",
            |item| {
                item.agent_source == "SENTINEL" && item.category == FeedbackCategory::Bug
            },
        ));

        set.register(EscalationRule::new(
            "core-agent-performance",
            Severity::High,
            "performance regressions in core agents slow the whole pipeline",
            |item| {
                item.category == FeedbackCategory::Performance
                    && item.severity == Severity::Medium
                    && CORE_AGENTS.contains(&item.agent_source.as_str())
            },
        ));

        set
    }

    /// Append a rule; custom rules join the same evaluation pass after the
    /// defaults.
    pub fn register(&mut self, rule: EscalationRule) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule against `item` and fold the firing targets into
    /// the adjusted severity.
    pub fn evaluate(&self, item: &FeedbackItem) -> EscalationOutcome {
        let mut adjusted = item.severity;
        let mut reasons = Vec::new();

        for rule in &self.rules {
            if !rule.fires_on(item) {
                continue;
            }
            // A firing rule only counts when its target is more urgent
            // than what we already have.
            if rule.target.urgency() > adjusted.urgency() {
                adjusted = rule.target;
                reasons.push(rule.reason.clone());
            }
        }

        EscalationOutcome {
            adjusted,
            escalated: adjusted != item.severity,
            reasons,
        }
    }
}
