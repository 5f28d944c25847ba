use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Priority weight: lower is more urgent. Spaced 100 apart so that
    /// adding a category weight (< 100) never crosses a severity band.
    pub fn weight(&self) -> i32 {
        match self {
            Severity::Critical => 0,
            Severity::High => 100,
            Severity::Medium => 200,
            Severity::Low => 300,
        }
    }

    /// Urgency rank under the total order critical > high > medium > low.
    pub fn urgency(&self) -> u8 {
        match self {
            Severity::Critical => 3,
            Severity::High => 2,
            Severity::Medium => 1,
            Severity::Low => 0,
        }
    }

    /// Returns the more urgent of the two severities.
    pub fn more_urgent(a: Severity, b: Severity) -> Severity {
        if b.urgency() > a.urgency() {
            b
        } else {
            a
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// FeedbackCategory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCategory {
    Bug,
    UxIssue,
    Performance,
    FeatureGap,
    DataQuality,
    Security,
    Compliance,
}

impl FeedbackCategory {
    /// Category weight added to the severity weight to form the item
    /// priority. Weights are distinct and < 100, keeping the combined
    /// priority a total order over (severity, category). Security and
    /// compliance rank ahead of everything else within a severity band.
    pub fn weight(&self) -> i32 {
        match self {
            FeedbackCategory::Security => 0,
            FeedbackCategory::Compliance => 1,
            FeedbackCategory::Bug => 2,
            FeedbackCategory::DataQuality => 3,
            FeedbackCategory::Performance => 4,
            FeedbackCategory::UxIssue => 5,
            FeedbackCategory::FeatureGap => 6,
        }
    }
}

impl fmt::Display for FeedbackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FeedbackCategory::Bug => "bug",
            FeedbackCategory::UxIssue => "ux_issue",
            FeedbackCategory::Performance => "performance",
            FeedbackCategory::FeatureGap => "feature_gap",
            FeedbackCategory::DataQuality => "data_quality",
            FeedbackCategory::Security => "security",
            FeedbackCategory::Compliance => "compliance",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    BuildBlocker,
    ParallelPatch,
    Backlog,
}

impl Destination {
    /// Destination is a pure function of severity: critical items block
    /// the build, high items get a parallel patch, the rest go to backlog.
    pub fn for_severity(severity: Severity) -> Destination {
        match severity {
            Severity::Critical => Destination::BuildBlocker,
            Severity::High => Destination::ParallelPatch,
            Severity::Medium | Severity::Low => Destination::Backlog,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Destination::BuildBlocker => "build_blocker",
            Destination::ParallelPatch => "parallel_patch",
            Destination::Backlog => "backlog",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// BuildPhase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    DatabaseFoundation,
    SchemaMigration,
    CoreServices,
    AgentIntegration,
    WorkflowOrchestration,
    ComplianceRules,
    ReportingLayer,
    InterfaceAssembly,
    SelfTest,
    ReleasePrep,
}

impl BuildPhase {
    /// The ten phases in pipeline order.
    pub const ALL: [BuildPhase; 10] = [
        BuildPhase::DatabaseFoundation,
        BuildPhase::SchemaMigration,
        BuildPhase::CoreServices,
        BuildPhase::AgentIntegration,
        BuildPhase::WorkflowOrchestration,
        BuildPhase::ComplianceRules,
        BuildPhase::ReportingLayer,
        BuildPhase::InterfaceAssembly,
        BuildPhase::SelfTest,
        BuildPhase::ReleasePrep,
    ];

    /// Zero-based position of this phase in the pipeline.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).unwrap_or(0)
    }

    /// The successor phase, or `None` at the end of the pipeline.
    pub fn next(&self) -> Option<BuildPhase> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Default cap on high-severity items tolerated before the cycle is
    /// gated. Earlier foundation phases and release prep are strict;
    /// UI-facing phases tolerate more parallel work.
    pub fn default_parallel_patch_threshold(&self) -> u32 {
        match self {
            BuildPhase::DatabaseFoundation => 2,
            BuildPhase::SchemaMigration => 2,
            BuildPhase::CoreServices => 3,
            BuildPhase::AgentIntegration => 3,
            BuildPhase::WorkflowOrchestration => 4,
            BuildPhase::ComplianceRules => 2,
            BuildPhase::ReportingLayer => 4,
            BuildPhase::InterfaceAssembly => 5,
            BuildPhase::SelfTest => 3,
            BuildPhase::ReleasePrep => 1,
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BuildPhase::DatabaseFoundation => "database_foundation",
            BuildPhase::SchemaMigration => "schema_migration",
            BuildPhase::CoreServices => "core_services",
            BuildPhase::AgentIntegration => "agent_integration",
            BuildPhase::WorkflowOrchestration => "workflow_orchestration",
            BuildPhase::ComplianceRules => "compliance_rules",
            BuildPhase::ReportingLayer => "reporting_layer",
            BuildPhase::InterfaceAssembly => "interface_assembly",
            BuildPhase::SelfTest => "self_test",
            BuildPhase::ReleasePrep => "release_prep",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// FeedbackStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Open,
    InProgress,
    Resolved,
    WontFix,
    Deferred,
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FeedbackStatus::Open => "open",
            FeedbackStatus::InProgress => "in_progress",
            FeedbackStatus::Resolved => "resolved",
            FeedbackStatus::WontFix => "wont_fix",
            FeedbackStatus::Deferred => "deferred",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// FeedbackItem
// ---------------------------------------------------------------------------

/// One observed anomaly reported by a self-test or execution harness.
///
/// Items are created from a [`FeedbackDraft`] by the cycle aggregator,
/// which stamps id, cycle, phase and timestamp. The engine treats items
/// as read-only apart from status bookkeeping on resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub id: Uuid,
    pub cycle: u32,
    pub phase: BuildPhase,
    pub agent_source: String,
    pub task_type: String,
    pub category: FeedbackCategory,
    pub severity: Severity,
    pub description: String,
    pub expected_behavior: String,
    pub actual_behavior: String,
    pub input_payload: HashMap<String, serde_json::Value>,
    pub output_payload: HashMap<String, serde_json::Value>,
    pub status: FeedbackStatus,
    pub created_at: DateTime<Utc>,
}

/// The harness-supplied portion of a feedback item, before the cycle
/// aggregator assigns id/cycle/phase/timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackDraft {
    pub agent_source: String,
    pub task_type: String,
    pub category: FeedbackCategory,
    pub severity: Severity,
    pub description: String,
    pub expected_behavior: String,
    pub actual_behavior: String,
    #[serde(default)]
    pub input_payload: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub output_payload: HashMap<String, serde_json::Value>,
}

impl FeedbackDraft {
    pub fn new(
        agent_source: impl Into<String>,
        category: FeedbackCategory,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            agent_source: agent_source.into(),
            task_type: String::new(),
            category,
            severity,
            description: description.into(),
            expected_behavior: String::new(),
            actual_behavior: String::new(),
            input_payload: HashMap::new(),
            output_payload: HashMap::new(),
        }
    }

    /// Stamp the draft into a full item for the given cycle/phase.
    pub fn into_item(self, cycle: u32, phase: BuildPhase) -> FeedbackItem {
        FeedbackItem {
            id: Uuid::new_v4(),
            cycle,
            phase,
            agent_source: self.agent_source,
            task_type: self.task_type,
            category: self.category,
            severity: self.severity,
            description: self.description,
            expected_behavior: self.expected_behavior,
            actual_behavior: self.actual_behavior,
            input_payload: self.input_payload,
            output_payload: self.output_payload,
            status: FeedbackStatus::Open,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EffortEstimate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortEstimate {
    Trivial,
    Small,
    Medium,
    Large,
    Xlarge,
}

impl EffortEstimate {
    /// Remaining-work hours used by queue summaries.
    pub fn hours(&self) -> f64 {
        match self {
            EffortEstimate::Trivial => 0.5,
            EffortEstimate::Small => 2.0,
            EffortEstimate::Medium => 4.0,
            EffortEstimate::Large => 8.0,
            EffortEstimate::Xlarge => 16.0,
        }
    }
}

// ---------------------------------------------------------------------------
// TriageDecision
// ---------------------------------------------------------------------------

/// The engine's verdict for one feedback item. Produced once per item per
/// triage pass; re-running triage replaces the decision, never patches it
/// in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageDecision {
    pub feedback_id: Uuid,
    pub original_severity: Severity,
    pub adjusted_severity: Severity,
    /// Lower is more urgent: severity weight + category weight.
    pub priority: i32,
    pub destination: Destination,
    pub rationale: String,
    pub auto_escalated: bool,
    pub escalation_reason: Option<String>,
    pub suggested_owner: Option<String>,
    pub estimated_hours: f64,
    pub blocks_dependents: bool,
    pub dependents: Vec<String>,
}

// ---------------------------------------------------------------------------
// IssuePattern
// ---------------------------------------------------------------------------

/// A detected cluster of related feedback. Recomputed every triage pass,
/// never persisted as a first-class entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuePattern {
    pub id: String,
    pub description: String,
    pub item_count: usize,
    /// Feedback ids of exactly the items in this cluster.
    pub member_ids: Vec<Uuid>,
    pub affected_agents: Vec<String>,
    pub suspected_cause: String,
    pub suggested_fix: String,
    /// Minimum decision priority among cluster members.
    pub consolidated_priority: i32,
}

// ---------------------------------------------------------------------------
// PatchItem (cycle-level)
// ---------------------------------------------------------------------------

/// A coarse patch record synthesized by the cycle aggregator the moment a
/// blocker/parallel item is added, before the authoritative triage pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchItem {
    pub id: Uuid,
    pub feedback_id: Uuid,
    pub destination: Destination,
    pub priority: i32,
    pub description: String,
    pub effort: EffortEstimate,
    pub component: Option<String>,
}

// ---------------------------------------------------------------------------
// CycleResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    Passed,
    Blocked,
    NeedsPatches,
}

/// Per-cycle summary: the unit of historical comparison for the metrics
/// analyzer, and the input for report formatting collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleResult {
    pub cycle: u32,
    pub phase: BuildPhase,
    pub status: CycleStatus,
    /// tests_passed / tests_run × 100, 0 when no tests ran.
    pub health_score: f64,
    pub tests_run: u32,
    pub tests_passed: u32,
    pub feedback: Vec<FeedbackItem>,
    pub by_severity: HashMap<Severity, usize>,
    pub by_category: HashMap<FeedbackCategory, usize>,
    pub by_destination: HashMap<Destination, usize>,
    /// Sorted ascending by priority.
    pub patches: Vec<PatchItem>,
    pub blockers: Vec<String>,
    pub recommendation: String,
    pub started_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// TriageReport
// ---------------------------------------------------------------------------

/// Output of one triage pass over a feedback batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageReport {
    pub cycle: u32,
    pub phase: BuildPhase,
    pub generated_at: DateTime<Utc>,
    /// Decisions in batch input order.
    pub decisions: Vec<TriageDecision>,
    pub build_blockers: Vec<Uuid>,
    pub parallel_patches: Vec<Uuid>,
    pub backlog_items: Vec<Uuid>,
    pub escalated_count: usize,
    /// Sorted ascending by consolidated priority.
    pub patterns: Vec<IssuePattern>,
    /// Best-effort persistence failures observed during the pass.
    pub persistence_failures: Vec<SinkFailure>,
}

// ---------------------------------------------------------------------------
// Patch lifecycle records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    Pending,
    InProgress,
    Review,
    Testing,
    Completed,
    Blocked,
    WontFix,
    Deferred,
}

impl PatchStatus {
    /// Terminal statuses exit the remaining-work pool.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PatchStatus::Completed | PatchStatus::WontFix)
    }

    /// Feedback-side status implied by this patch status. Pending and
    /// Blocked say nothing about the originating item and map to `None`.
    pub fn feedback_status(&self) -> Option<FeedbackStatus> {
        match self {
            PatchStatus::InProgress | PatchStatus::Review | PatchStatus::Testing => {
                Some(FeedbackStatus::InProgress)
            }
            PatchStatus::Completed => Some(FeedbackStatus::Resolved),
            PatchStatus::WontFix => Some(FeedbackStatus::WontFix),
            PatchStatus::Deferred => Some(FeedbackStatus::Deferred),
            PatchStatus::Pending | PatchStatus::Blocked => None,
        }
    }
}

impl fmt::Display for PatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PatchStatus::Pending => "pending",
            PatchStatus::InProgress => "in_progress",
            PatchStatus::Review => "review",
            PatchStatus::Testing => "testing",
            PatchStatus::Completed => "completed",
            PatchStatus::Blocked => "blocked",
            PatchStatus::WontFix => "wont_fix",
            PatchStatus::Deferred => "deferred",
        };
        write!(f, "{}", label)
    }
}

/// One entry in a patch's ordered status-history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: PatchStatus,
    pub at: DateTime<Utc>,
    pub actor: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub owner: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionDetails {
    pub approach: String,
    pub files_changed: u32,
    pub diff_size: u32,
}

/// Source-control linkage for a patch under review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScmLink {
    pub branch: String,
    pub pr_url: String,
    pub commit: Option<String>,
    pub merged_at: Option<DateTime<Utc>>,
}

/// The unit of remediation work, one per escalated triage decision.
/// Mutated only through the patch manager's transition operations; never
/// deleted, only terminally stated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedPatch {
    pub id: Uuid,
    pub feedback_id: Uuid,
    pub cycle: u32,
    pub phase: BuildPhase,
    pub priority: i32,
    pub component: Option<String>,
    pub description: String,
    pub effort: EffortEstimate,
    pub status: PatchStatus,
    pub history: Vec<StatusEntry>,
    pub assignment: Option<Assignment>,
    pub resolution: Option<ResolutionDetails>,
    pub scm: Option<ScmLink>,
    pub verified: bool,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    /// Hours from creation to first completion; set once, kept on reopen.
    pub time_to_resolution_hours: Option<f64>,
    pub reopen_count: u32,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Analysis records
// ---------------------------------------------------------------------------

/// Per-agent health derived from one feedback batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub agent: String,
    pub feedback_count: usize,
    pub critical_count: usize,
    pub high_count: usize,
    /// 100 − 25×critical − 10×high − 2×total, floored at 0.
    pub health_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    TotalFeedback,
    CriticalCount,
    HealthScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

/// Least-squares trend of one metric across retained cycle history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub metric: TrendMetric,
    pub direction: TrendDirection,
    pub slope: f64,
    /// Regression value at the next cycle number, floored at 0.
    pub forecast: f64,
    /// min(95, 50 + 5×data_points).
    pub confidence: u32,
    pub data_points: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    High,
    Medium,
}

/// A suspected root cause derived from batch clustering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootCauseAnalysis {
    pub pattern_id: String,
    pub description: String,
    pub item_count: usize,
    pub affected_agents: Vec<String>,
    /// min(95, 50 + 15×cluster size).
    pub likelihood: u32,
    pub estimated_impact: ImpactLevel,
    pub suspected_cause: String,
    pub suggested_fix: String,
}

/// Analytic bundle produced by the metrics analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackAnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub cycles_analyzed: usize,
    pub agent_metrics: Vec<AgentMetrics>,
    pub trends: Vec<TrendAnalysis>,
    pub root_causes: Vec<RootCauseAnalysis>,
}

// ---------------------------------------------------------------------------
// SinkFailure
// ---------------------------------------------------------------------------

/// A best-effort persistence failure observed during a pass. Non-fatal;
/// surfaced so callers and tests can see what the sink dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkFailure {
    pub operation: String,
    pub entity_id: Uuid,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
