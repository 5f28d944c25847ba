use serde::{Deserialize, Serialize};

use crate::types::BuildPhase;

// ---------------------------------------------------------------------------
// CycleConfig
// ---------------------------------------------------------------------------

/// Configuration for one build cycle, supplied pre-validated by the
/// configuration-loading collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    pub cycle: u32,
    pub phase: BuildPhase,
    /// Informational: components targeted this cycle.
    #[serde(default)]
    pub target_components: Vec<String>,
    /// Informational: features targeted this cycle.
    #[serde(default)]
    pub target_features: Vec<String>,
    /// When set, any critical item gates the cycle.
    #[serde(default = "default_block_on_critical")]
    pub block_on_critical: bool,
    /// Override for the per-phase high-severity tolerance.
    #[serde(default)]
    pub parallel_patch_threshold: Option<u32>,
}

fn default_block_on_critical() -> bool {
    true
}

impl CycleConfig {
    pub fn new(cycle: u32, phase: BuildPhase) -> Self {
        Self {
            cycle,
            phase,
            target_components: Vec::new(),
            target_features: Vec::new(),
            block_on_critical: true,
            parallel_patch_threshold: None,
        }
    }

    /// The effective high-severity tolerance: the explicit override, or
    /// the phase default.
    pub fn effective_patch_threshold(&self) -> u32 {
        self.parallel_patch_threshold
            .unwrap_or_else(|| self.phase.default_parallel_patch_threshold())
    }
}
