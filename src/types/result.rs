//! What one orchestrator call returns.

use crate::ledger::UsageSnapshot;
use crate::types::data::ExtractedAnalysisData;
use crate::types::recovery::{RecoveredResult, RecoveryTier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Diagnostics for one interpretation call.
///
/// Combines the type-specific summarizer's text with the engine's own
/// observations: which recovery tier was reached, which components fell back
/// to salvage or placeholders, and any informational notices (word-limit
/// overages are notices, never errors).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsSummary {
    /// Type-specific summary text from the family's summarizer operation.
    pub text: String,
    /// Deepest recovery tier reached for this response.
    pub recovery_tier: RecoveryTier,
    /// Component ids whose interpretations are fallbacks (low confidence).
    pub fallback_components: Vec<String>,
    /// Informational notices: soft-target overages, degraded-output warnings.
    pub notices: Vec<String>,
}

impl DiagnosticsSummary {
    /// True when any component carries low-confidence (fallback) text.
    pub fn degraded(&self) -> bool {
        !self.fallback_components.is_empty()
    }
}

/// The structured result of one interpretation call. Returned once, immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpretationResult {
    /// The analysis-type id interpreted.
    pub analysis_type: String,
    /// Normalized extraction output the prompts were built from.
    pub data: ExtractedAnalysisData,
    /// The recovered component-interpretation map.
    pub recovered: RecoveredResult,
    /// Diagnostics for this call.
    pub diagnostics: DiagnosticsSummary,
    /// Token counts for this exchange only, preamble excluded.
    pub tokens: UsageSnapshot,
    /// The rendered report in the requested format.
    pub report: String,
    /// Wall-clock time for the full call, milliseconds.
    pub elapsed_ms: u64,
    /// When the call completed.
    pub timestamp: DateTime<Utc>,
}
