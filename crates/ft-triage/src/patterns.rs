//! Pattern detector: clusters a feedback batch by agent, category and
//! keyword. Runs after classification so cluster priority can borrow the
//! minimum decision priority among members.

use std::collections::HashMap;

use uuid::Uuid;

use ft_core::types::{FeedbackCategory, FeedbackItem, IssuePattern, TriageDecision};

use crate::classifier::priority_for;

/// Keywords scanned case-insensitively in description and actual-behavior
/// text.
pub const CLUSTER_KEYWORDS: [&str; 8] = [
    "timeout",
    "null",
    "undefined",
    "failed",
    "slow",
    "error",
    "missing",
    "invalid",
];

const AGENT_CLUSTER_MIN: usize = 3;
const CATEGORY_CLUSTER_MIN: usize = 4;
const KEYWORD_CLUSTER_MIN: usize = 2;

// ---------------------------------------------------------------------------
// PatternDetector
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct PatternDetector;

impl PatternDetector {
    pub fn new() -> Self {
        Self
    }

    /// Run all three detectors over the batch and sort the concatenated
    /// clusters ascending by consolidated priority. An item may appear in
    /// several clusters; clusters are never deduplicated against each
    /// other.
    pub fn detect(
        &self,
        items: &[FeedbackItem],
        decisions: &[TriageDecision],
    ) -> Vec<IssuePattern> {
        let priorities: HashMap<Uuid, i32> = decisions
            .iter()
            .map(|d| (d.feedback_id, d.priority))
            .collect();

        let mut patterns = Vec::new();
        patterns.extend(self.agent_clusters(items, &priorities));
        patterns.extend(self.category_clusters(items, &priorities));
        patterns.extend(self.keyword_clusters(items, &priorities));

        patterns.sort_by_key(|p| p.consolidated_priority);
        patterns
    }

    fn agent_clusters(
        &self,
        items: &[FeedbackItem],
        priorities: &HashMap<Uuid, i32>,
    ) -> Vec<IssuePattern> {
        let mut by_agent: HashMap<&str, Vec<&FeedbackItem>> = HashMap::new();
        for item in items {
            by_agent.entry(item.agent_source.as_str()).or_default().push(item);
        }

        let mut agents: Vec<&str> = by_agent.keys().copied().collect();
        agents.sort_unstable();

        agents
            .into_iter()
            .filter_map(|agent| {
                let members = &by_agent[agent];
                if members.len() < AGENT_CLUSTER_MIN {
                    return None;
                }
                Some(IssuePattern {
                    id: format!("agent-{agent}"),
                    description: format!(
                        "{} issues clustered on agent {agent}",
                        members.len()
                    ),
                    item_count: members.len(),
                    member_ids: member_ids(members),
                    affected_agents: vec![agent.to_string()],
                    suspected_cause: format!("recent regression or prompt drift in {agent}"),
                    suggested_fix: format!(
                        "review {agent}'s latest changes and rerun its self-tests"
                    ),
                    consolidated_priority: consolidated_priority(members, priorities),
                })
            })
            .collect()
    }

    fn category_clusters(
        &self,
        items: &[FeedbackItem],
        priorities: &HashMap<Uuid, i32>,
    ) -> Vec<IssuePattern> {
        let mut by_category: HashMap<FeedbackCategory, Vec<&FeedbackItem>> = HashMap::new();
        for item in items {
            by_category.entry(item.category).or_default().push(item);
        }

        let mut categories: Vec<FeedbackCategory> = by_category.keys().copied().collect();
        categories.sort_by_key(|c| c.weight());

        categories
            .into_iter()
            .filter_map(|category| {
                let members = &by_category[&category];
                if members.len() < CATEGORY_CLUSTER_MIN {
                    return None;
                }
                let agents = distinct_agents(members);
                Some(IssuePattern {
                    id: format!("category-{category}"),
                    description: format!(
                        "{} {category} issues across {} agents",
                        members.len(),
                        agents.len()
                    ),
                    item_count: members.len(),
                    member_ids: member_ids(members),
                    affected_agents: agents,
                    suspected_cause: format!(
                        "systemic {category} weakness spanning multiple agents"
                    ),
                    suggested_fix: format!("schedule a focused {category} hardening pass"),
                    consolidated_priority: consolidated_priority(members, priorities),
                })
            })
            .collect()
    }

    fn keyword_clusters(
        &self,
        items: &[FeedbackItem],
        priorities: &HashMap<Uuid, i32>,
    ) -> Vec<IssuePattern> {
        CLUSTER_KEYWORDS
            .iter()
            .filter_map(|keyword| {
                let members: Vec<&FeedbackItem> = items
                    .iter()
                    .filter(|item| {
                        item.description.to_lowercase().contains(keyword)
                            || item.actual_behavior.to_lowercase().contains(keyword)
                    })
                    .collect();
                if members.len() < KEYWORD_CLUSTER_MIN {
                    return None;
                }
                Some(IssuePattern {
                    id: format!("keyword-{keyword}"),
                    description: format!(
                        "keyword \"{keyword}\" appears in {} items",
                        members.len()
                    ),
                    item_count: members.len(),
                    member_ids: member_ids(&members),
                    affected_agents: distinct_agents(&members),
                    suspected_cause: format!("shared failure mode around \"{keyword}\""),
                    suggested_fix: format!(
                        "trace the common code path emitting \"{keyword}\""
                    ),
                    consolidated_priority: consolidated_priority(&members, priorities),
                })
            })
            .collect()
    }
}

/// Minimum decision priority among cluster members. Items that somehow
/// lack a decision fall back to their raw (severity, category) priority.
fn consolidated_priority(members: &[&FeedbackItem], priorities: &HashMap<Uuid, i32>) -> i32 {
    members
        .iter()
        .map(|item| {
            priorities
                .get(&item.id)
                .copied()
                .unwrap_or_else(|| priority_for(item.severity, item.category))
        })
        .min()
        .unwrap_or(i32::MAX)
}

fn member_ids(members: &[&FeedbackItem]) -> Vec<Uuid> {
    members.iter().map(|i| i.id).collect()
}

fn distinct_agents(members: &[&FeedbackItem]) -> Vec<String> {
    let mut agents: Vec<String> = members.iter().map(|i| i.agent_source.clone()).collect();
    agents.sort_unstable();
    agents.dedup();
    agents
}
