//! Multi-tier response validation and recovery.
//!
//! One response string goes through up to four tiers:
//!
//! 1. **Parse**: light cleanup (code fences, surrounding prose) then a
//!    structured JSON decode.
//! 2. **Validate**: the decode must be an object; at least a configurable
//!    fraction of the expected component ids must be present, every present
//!    entry well-formed per the family's `ValidationRules`. Missing ids are
//!    placeholder-filled.
//! 3. **Pattern-Extract**: on parse/validate failure, ordered matcher
//!    strategies (see `strategies`) salvage per-id fragments from the raw
//!    text; first matching strategy per id wins.
//! 4. **Default**: any id still missing gets the fixed placeholder.
//!
//! The pipeline never errors: a degraded result beats a retried, billed LLM
//! round-trip. Every entry records whether it is a fallback and which tier
//! produced it, so downstream reporting can flag low confidence.

pub mod strategies;

pub use strategies::{MatchCandidate, MatcherStrategy};

use crate::config::defaults;
use crate::types::recovery::{ComponentInterpretation, RecoveredResult, RecoveryTier};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

// ============================================================================
// Validation rules
// ============================================================================

/// The validator contract a family declares for its responses.
#[derive(Debug, Clone)]
pub struct ValidationRules {
    /// Field name carrying the component label.
    pub label_field: String,
    /// Field name carrying the interpretation text.
    pub text_field: String,
    /// Family default for the validate-tier acceptance threshold; the
    /// configured threshold takes precedence through `config::resolve`.
    pub default_threshold: Option<f64>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            label_field: "label".to_string(),
            text_field: "interpretation".to_string(),
            default_threshold: None,
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Run the full pipeline over one raw response.
///
/// `placeholders` must hold one entry per expected id (the orchestrator
/// pre-builds them from the family's placeholder operation); the engine
/// placeholder fills any gap so the output key set always equals `expected`.
pub fn recover(
    raw: &str,
    expected: &[String],
    threshold: f64,
    rules: &ValidationRules,
    strategies: &[MatcherStrategy],
    placeholders: &HashMap<String, ComponentInterpretation>,
) -> RecoveredResult {
    if let Some(parsed) = parse_tier(raw) {
        if let Some(entries) = validate_tier(&parsed, expected, threshold, rules) {
            return finish(entries, expected, placeholders, RecoveryTier::Parse);
        }
        debug!("Validate tier rejected parsed response; falling through to pattern-extract");
    } else {
        debug!("Parse tier failed; falling through to pattern-extract");
    }

    let entries = pattern_extract_tier(raw, expected, strategies);
    finish(entries, expected, placeholders, RecoveryTier::PatternExtract)
}

/// Tier 1: cleanup plus structured decode.
fn parse_tier(raw: &str) -> Option<Value> {
    let cleaned = cleanup(raw);
    serde_json::from_str::<Value>(&cleaned).ok()
}

/// Strip code fences and surrounding prose, keeping the outermost JSON
/// object when one is embedded in running text.
pub(crate) fn cleanup(raw: &str) -> String {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.strip_suffix("```").unwrap_or(rest))
        .unwrap_or(trimmed)
        .trim();

    // Models often wrap the object in prose; slice to the outermost braces.
    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => unfenced[start..=end].to_string(),
        _ => unfenced.to_string(),
    }
}

/// Tier 2: structural validation against the expected id set.
///
/// Returns the validated entries when the response passes, `None` when it
/// must fall through to pattern extraction.
fn validate_tier(
    parsed: &Value,
    expected: &[String],
    threshold: f64,
    rules: &ValidationRules,
) -> Option<HashMap<String, ComponentInterpretation>> {
    let object = parsed.as_object()?;

    let mut entries = HashMap::new();
    for id in expected {
        let Some(value) = object.get(id) else {
            continue;
        };
        // A present entry that is malformed disqualifies the whole response.
        let entry = value.as_object()?;
        let label = entry.get(&rules.label_field)?.as_str()?;
        let text = entry.get(&rules.text_field)?.as_str()?;
        if text.trim().is_empty() {
            return None;
        }
        entries.insert(id.clone(), ComponentInterpretation::validated(label, text));
    }

    let fraction = if expected.is_empty() {
        1.0
    } else {
        entries.len() as f64 / expected.len() as f64
    };
    if fraction < threshold {
        debug!(
            present = entries.len(),
            expected = expected.len(),
            threshold,
            "Validate tier below acceptance threshold"
        );
        return None;
    }
    Some(entries)
}

/// Tier 3: ordered matcher strategies, first match per id wins.
fn pattern_extract_tier(
    raw: &str,
    expected: &[String],
    strategies: &[MatcherStrategy],
) -> HashMap<String, ComponentInterpretation> {
    let mut entries: HashMap<String, ComponentInterpretation> = HashMap::new();
    for strategy in strategies {
        let missing: Vec<String> = expected
            .iter()
            .filter(|id| !entries.contains_key(*id))
            .cloned()
            .collect();
        if missing.is_empty() {
            break;
        }
        for (id, candidate) in strategy(raw, &missing) {
            let label = candidate
                .label
                .unwrap_or_else(|| defaults::PLACEHOLDER_LABEL.to_string());
            entries.insert(id, ComponentInterpretation::salvaged(label, candidate.text));
        }
    }
    entries
}

/// Tier 4 plus bookkeeping: placeholder-fill every still-missing id and
/// compute the deepest tier reached.
fn finish(
    mut entries: HashMap<String, ComponentInterpretation>,
    expected: &[String],
    placeholders: &HashMap<String, ComponentInterpretation>,
    base_tier: RecoveryTier,
) -> RecoveredResult {
    let mut deepest = if entries.is_empty() && base_tier == RecoveryTier::PatternExtract {
        // Nothing salvaged at all; the result is pure placeholders.
        RecoveryTier::Default
    } else {
        base_tier
    };

    let mut defaulted: Vec<&String> = Vec::new();
    for id in expected {
        if entries.contains_key(id) {
            continue;
        }
        let placeholder = placeholders
            .get(id)
            .cloned()
            .unwrap_or_else(|| engine_placeholder(id));
        entries.insert(id.clone(), placeholder);
        defaulted.push(id);
        deepest = RecoveryTier::Default;
    }

    if !defaulted.is_empty() {
        warn!(
            components = ?defaulted,
            "Recovery fell back to placeholder interpretations"
        );
    }

    // Guard the contract even against a miskeyed strategy: drop anything the
    // caller did not expect.
    entries.retain(|id, _| expected.contains(id));

    RecoveredResult {
        entries,
        deepest_tier: deepest,
    }
}

/// The engine's own placeholder, used when a family supplies none.
pub fn engine_placeholder(_id: &str) -> ComponentInterpretation {
    ComponentInterpretation {
        label: defaults::PLACEHOLDER_LABEL.to_string(),
        interpretation: defaults::PLACEHOLDER_TEXT.to_string(),
        fallback: true,
        tier: RecoveryTier::Default,
    }
}

// ============================================================================
// Tests
// ============================================================================
