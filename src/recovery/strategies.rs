//! Matcher strategies for the pattern-extract tier.
//!
//! Each strategy is a pure function over the full response text and the
//! expected component ids, returning whatever partial mapping it can find.
//! The pipeline tries them in declaration order (decreasing strictness) and
//! the first strategy that yields an entry for an id owns that id.

use regex::Regex;
use std::collections::HashMap;

/// What one strategy recovered for one component id.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    /// Label text, when the strategy could distinguish one.
    pub label: Option<String>,
    /// Interpretation text.
    pub text: String,
}

/// A pure matcher strategy: `(text, expected_ids) -> partial mapping`.
pub type MatcherStrategy = fn(&str, &[String]) -> HashMap<String, MatchCandidate>;

/// The default strategy chain, strict to loose: full key/value pair, bare
/// value, markdown heading.
pub fn default_strategies() -> Vec<MatcherStrategy> {
    vec![extract_key_value_pairs, extract_bare_values, extract_markdown_headings]
}

fn clean_fragment(text: &str) -> String {
    text.trim()
        .trim_end_matches(',')
        .trim_matches('"')
        .trim()
        .to_string()
}

/// Strictest: a JSON-like `"id": { ... }` block with quoted label and
/// interpretation fields, tolerated even inside otherwise-broken JSON.
pub fn extract_key_value_pairs(text: &str, expected: &[String]) -> HashMap<String, MatchCandidate> {
    let mut found = HashMap::new();
    let label_re = match Regex::new(r#""label"\s*:\s*"((?:[^"\\]|\\.)*)""#) {
        Ok(re) => re,
        Err(_) => return found,
    };
    let text_re = match Regex::new(r#""interpretation"\s*:\s*"((?:[^"\\]|\\.)*)""#) {
        Ok(re) => re,
        Err(_) => return found,
    };

    for id in expected {
        let pattern = format!(r#"(?s)"?{}"?\s*:\s*\{{([^{{}}]*)\}}"#, regex::escape(id));
        let Ok(block_re) = Regex::new(&pattern) else {
            continue;
        };
        let Some(block) = block_re.captures(text).and_then(|c| c.get(1)) else {
            continue;
        };
        let block = block.as_str();
        let Some(interpretation) = text_re.captures(block).and_then(|c| c.get(1)) else {
            continue;
        };
        let interpretation = unescape(interpretation.as_str());
        if interpretation.trim().is_empty() {
            continue;
        }
        let label = label_re
            .captures(block)
            .and_then(|c| c.get(1))
            .map(|m| unescape(m.as_str()));
        found.insert(
            id.clone(),
            MatchCandidate {
                label,
                text: interpretation,
            },
        );
    }
    found
}

/// Middle tier: a line starting with the bare id followed by a separator and
/// free text (`C1: the factor reflects ...`).
pub fn extract_bare_values(text: &str, expected: &[String]) -> HashMap<String, MatchCandidate> {
    let mut found = HashMap::new();
    for id in expected {
        let pattern = format!(
            r#"(?m)^\s*"?{}"?\s*[:\-]\s+(.+)$"#,
            regex::escape(id)
        );
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        if let Some(m) = re.captures(text).and_then(|c| c.get(1)) {
            let value = clean_fragment(m.as_str());
            if !value.is_empty() {
                found.insert(id.clone(), MatchCandidate { label: None, text: value });
            }
        }
    }
    found
}

/// Loosest: markdown-heading style. `**C1**: text`, `**C1: Label** text`,
/// or `## C1` with the text on the following lines.
pub fn extract_markdown_headings(text: &str, expected: &[String]) -> HashMap<String, MatchCandidate> {
    let mut found = HashMap::new();
    for id in expected {
        let escaped = regex::escape(id);

        // Form 1: bold heading carrying a label, `**C1: Label** text`.
        let labeled = format!(
            r#"(?m)^\s*\*\*\s*{escaped}\b\s*[:\-]\s*(?P<label>[^*\n]+?)\s*\*\*\s*[:\-]?\s*(?P<rest>.*)$"#
        );
        if let Ok(re) = Regex::new(&labeled) {
            if let Some(caps) = re.captures(text) {
                if let Some(entry) = heading_candidate(text, &caps, true) {
                    found.insert(id.clone(), entry);
                    continue;
                }
            }
        }

        // Form 2: plain heading, `**C1**: text` or `## C1` + paragraph.
        let plain = format!(
            r#"(?m)^\s*(?:#{{1,6}}\s*|\*\*\s*){escaped}\b(?:\s*\*\*)?\s*[:\-]?\s*(?P<rest>.*)$"#
        );
        if let Ok(re) = Regex::new(&plain) {
            if let Some(caps) = re.captures(text) {
                if let Some(entry) = heading_candidate(text, &caps, false) {
                    found.insert(id.clone(), entry);
                }
            }
        }
    }
    found
}

fn heading_candidate(
    text: &str,
    caps: &regex::Captures<'_>,
    labeled: bool,
) -> Option<MatchCandidate> {
    let label = if labeled {
        caps.name("label")
            .map(|m| clean_fragment(m.as_str()))
            .filter(|l| !l.is_empty())
    } else {
        None
    };
    let mut body = caps
        .name("rest")
        .map(|m| clean_fragment(m.as_str()))
        .unwrap_or_default();

    if body.is_empty() {
        // Heading on its own line; take the following paragraph.
        let after = &text[caps.get(0)?.end()..];
        body = after
            .lines()
            .skip_while(|l| l.trim().is_empty())
            .take_while(|l| !l.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();
    }

    if body.is_empty() {
        None
    } else {
        Some(MatchCandidate { label, text: body })
    }
}

fn unescape(raw: &str) -> String {
    raw.replace("\\\"", "\"").replace("\\n", " ")
}

// ============================================================================
// Tests
// ============================================================================
