//! Metrics analyzer: per-agent health, cross-cycle trends, and root-cause
//! clusters over the current batch plus bounded cycle history.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use ft_core::agents::ROSTER;
use ft_core::types::{
    AgentMetrics, CycleResult, FeedbackAnalysisReport, FeedbackItem, ImpactLevel,
    RootCauseAnalysis, Severity, TrendAnalysis, TrendMetric, TriageDecision,
};
use ft_triage::PatternDetector;

use crate::trends::analyze_trend;

/// Retained cycle results; the oldest is evicted first.
pub const HISTORY_CAPACITY: usize = 50;

// ---------------------------------------------------------------------------
// MetricsAnalyzer
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MetricsAnalyzer {
    history: VecDeque<CycleResult>,
    detector: PatternDetector,
}

impl MetricsAnalyzer {
    pub fn new() -> Self {
        Self {
            history: VecDeque::new(),
            detector: PatternDetector::new(),
        }
    }

    /// Append a cycle result, evicting the oldest past capacity.
    pub fn record_cycle(&mut self, result: CycleResult) {
        self.history.push_back(result);
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Per-agent health over the batch. The whole roster is reported, so
    /// an agent with no feedback scores a perfect 100.
    pub fn agent_health(&self, batch: &[FeedbackItem]) -> Vec<AgentMetrics> {
        ROSTER
            .iter()
            .map(|agent| {
                let mine: Vec<&FeedbackItem> = batch
                    .iter()
                    .filter(|i| i.agent_source == *agent)
                    .collect();
                let critical = mine
                    .iter()
                    .filter(|i| i.severity == Severity::Critical)
                    .count();
                let high = mine.iter().filter(|i| i.severity == Severity::High).count();
                let score =
                    100.0 - 25.0 * critical as f64 - 10.0 * high as f64 - 2.0 * mine.len() as f64;
                AgentMetrics {
                    agent: agent.to_string(),
                    feedback_count: mine.len(),
                    critical_count: critical,
                    high_count: high,
                    health_score: score.max(0.0),
                }
            })
            .collect()
    }

    /// Trend of one metric across the retained history.
    pub fn trend(&self, metric: TrendMetric) -> TrendAnalysis {
        let history: Vec<&CycleResult> = self.history.iter().collect();
        analyze_trend(&history, metric)
    }

    /// Root-cause clusters for the batch: the triage clustering with an
    /// independent likelihood/impact reading.
    pub fn root_causes(
        &self,
        batch: &[FeedbackItem],
        decisions: &[TriageDecision],
    ) -> Vec<RootCauseAnalysis> {
        let items_by_id: HashMap<Uuid, &FeedbackItem> =
            batch.iter().map(|i| (i.id, i)).collect();
        let decisions_by_id: HashMap<Uuid, &TriageDecision> =
            decisions.iter().map(|d| (d.feedback_id, d)).collect();

        let patterns = self.detector.detect(batch, decisions);
        patterns
            .into_iter()
            .map(|pattern| {
                // Impact is read off the cluster members themselves, not
                // every batch item sharing an agent with the cluster.
                let any_critical = pattern.member_ids.iter().any(|id| {
                    items_by_id
                        .get(id)
                        .is_some_and(|i| i.severity == Severity::Critical)
                        || decisions_by_id
                            .get(id)
                            .is_some_and(|d| d.adjusted_severity == Severity::Critical)
                });
                RootCauseAnalysis {
                    likelihood: (50 + 15 * pattern.item_count as u32).min(95),
                    estimated_impact: if any_critical {
                        ImpactLevel::High
                    } else {
                        ImpactLevel::Medium
                    },
                    pattern_id: pattern.id,
                    description: pattern.description,
                    item_count: pattern.item_count,
                    affected_agents: pattern.affected_agents,
                    suspected_cause: pattern.suspected_cause,
                    suggested_fix: pattern.suggested_fix,
                }
            })
            .collect()
    }

    /// Bundle health, the three standard trends, and root causes.
    pub fn analyze(
        &self,
        batch: &[FeedbackItem],
        decisions: &[TriageDecision],
    ) -> FeedbackAnalysisReport {
        let report = FeedbackAnalysisReport {
            generated_at: Utc::now(),
            cycles_analyzed: self.history.len(),
            agent_metrics: self.agent_health(batch),
            trends: vec![
                self.trend(TrendMetric::TotalFeedback),
                self.trend(TrendMetric::CriticalCount),
                self.trend(TrendMetric::HealthScore),
            ],
            root_causes: self.root_causes(batch, decisions),
        };
        info!(
            cycles = report.cycles_analyzed,
            batch = batch.len(),
            root_causes = report.root_causes.len(),
            "feedback analysis complete"
        );
        report
    }
}
