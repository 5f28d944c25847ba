//! Static agent roster and routing tables.
//!
//! The host project runs a fixed fleet of ten named agents. Health
//! reporting covers the whole roster (an agent with no feedback still
//! reports a perfect score), ownership routing uses the agent→team map,
//! and blocker impact uses the agent→downstream map.

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// The ten agents, in pipeline order.
pub const ROSTER: [&str; 10] = [
    "SENTINEL",
    "CARTOGRAPH",
    "LEDGER",
    "COURIER",
    "ARCHIVIST",
    "SURVEYOR",
    "HERALD",
    "WARDEN",
    "SCRIBE",
    "BEACON",
];

/// Agents whose performance regressions escalate (rule 5): everything
/// else in the pipeline sits downstream of these three.
pub const CORE_AGENTS: [&str; 3] = ["SENTINEL", "CARTOGRAPH", "LEDGER"];

// ---------------------------------------------------------------------------
// Routing tables
// ---------------------------------------------------------------------------

/// Owning team for an agent's remediation work. An unmapped agent yields
/// `None`; ownership is then left unset rather than treated as an error.
pub fn team_for(agent: &str) -> Option<&'static str> {
    match agent {
        "SENTINEL" => Some("quality"),
        "CARTOGRAPH" => Some("mapping"),
        "LEDGER" => Some("finance-data"),
        "COURIER" => Some("integrations"),
        "ARCHIVIST" => Some("records"),
        "SURVEYOR" => Some("field-data"),
        "HERALD" => Some("notifications"),
        "WARDEN" => Some("compliance"),
        "SCRIBE" => Some("documents"),
        "BEACON" => Some("monitoring"),
        _ => None,
    }
}

/// Agents that consume the given agent's output. A critical failure in
/// the source agent blocks these dependents.
pub fn downstream_of(agent: &str) -> &'static [&'static str] {
    match agent {
        "SENTINEL" => &["WARDEN", "HERALD", "BEACON"],
        "CARTOGRAPH" => &["SURVEYOR", "COURIER"],
        "LEDGER" => &["WARDEN", "SCRIBE"],
        "ARCHIVIST" => &["SCRIBE"],
        _ => &[],
    }
}

/// `true` if the name belongs to the fixed roster.
pub fn is_known_agent(agent: &str) -> bool {
    ROSTER.contains(&agent)
}
