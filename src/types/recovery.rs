//! The validated-or-salvaged interpretation map.
//!
//! Downstream consumers never see raw LLM text; they see this map, which is
//! guaranteed to carry exactly one entry per expected component id no matter
//! how malformed the response was.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which tier of the recovery pipeline produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryTier {
    /// Structured decode succeeded and the entry validated as-is.
    Parse,
    /// Salvaged from unstructured text by a matcher strategy.
    PatternExtract,
    /// Placeholder; nothing usable was recovered for this id.
    Default,
}

impl std::fmt::Display for RecoveryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::PatternExtract => write!(f, "pattern-extract"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// One component's interpretation: a short label plus narrative text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentInterpretation {
    /// Concise name for the component (e.g. "Negative Affect").
    pub label: String,
    /// Narrative interpretation text.
    pub interpretation: String,
    /// True when this entry did not come verbatim from a validated response.
    pub fallback: bool,
    /// The tier that produced this entry.
    pub tier: RecoveryTier,
}

impl ComponentInterpretation {
    /// A validated, non-fallback entry from the parse tier.
    pub fn validated(label: impl Into<String>, interpretation: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            interpretation: interpretation.into(),
            fallback: false,
            tier: RecoveryTier::Parse,
        }
    }

    /// A salvaged entry from a matcher strategy.
    pub fn salvaged(label: impl Into<String>, interpretation: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            interpretation: interpretation.into(),
            fallback: true,
            tier: RecoveryTier::PatternExtract,
        }
    }
}

/// The full recovered mapping for one response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveredResult {
    /// Component id -> interpretation; key set equals the expected id set.
    pub entries: HashMap<String, ComponentInterpretation>,
    /// The deepest tier the pipeline had to reach for any entry.
    pub deepest_tier: RecoveryTier,
}

impl RecoveredResult {
    /// Ids whose entries are fallbacks, in the given component order.
    pub fn fallback_ids(&self, order: &[String]) -> Vec<String> {
        order
            .iter()
            .filter(|id| self.entries.get(*id).is_some_and(|e| e.fallback))
            .cloned()
            .collect()
    }

    /// True when every entry came verbatim from a validated response.
    pub fn fully_validated(&self) -> bool {
        self.entries.values().all(|e| !e.fallback)
    }

    /// Entry for one component id.
    pub fn get(&self, id: &str) -> Option<&ComponentInterpretation> {
        self.entries.get(id)
    }
}

// ============================================================================
// Tests
// ============================================================================
