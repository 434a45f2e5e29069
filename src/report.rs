//! Report rendering primitives.
//!
//! Two render modes share one set of section helpers: plain text (separator
//! rules, no markup) and lightweight markup (headings, emphasis). Every
//! section builder in the analysis families goes through these so both modes
//! stay in lockstep.

use serde::{Deserialize, Serialize};

/// Report render mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Section separators, no markup.
    #[default]
    Plain,
    /// Markdown headings and emphasis.
    Markdown,
}

/// Top-level report title.
pub fn title(format: ReportFormat, text: &str) -> String {
    match format {
        ReportFormat::Plain => {
            let rule = "=".repeat(text.len().max(8));
            format!("{rule}\n{text}\n{rule}")
        }
        ReportFormat::Markdown => format!("# {text}"),
    }
}

/// Section heading.
pub fn heading(format: ReportFormat, text: &str) -> String {
    match format {
        ReportFormat::Plain => {
            let rule = "-".repeat(text.len().max(8));
            format!("{text}\n{rule}")
        }
        ReportFormat::Markdown => format!("## {text}"),
    }
}

/// Sub-heading, one level below `heading`.
pub fn subheading(format: ReportFormat, text: &str) -> String {
    match format {
        ReportFormat::Plain => format!("{text}:"),
        ReportFormat::Markdown => format!("### {text}"),
    }
}

/// Inline emphasis.
pub fn emphasis(format: ReportFormat, text: &str) -> String {
    match format {
        ReportFormat::Plain => text.to_string(),
        ReportFormat::Markdown => format!("**{text}**"),
    }
}

/// One bulleted line.
pub fn bullet(format: ReportFormat, text: &str) -> String {
    match format {
        ReportFormat::Plain => format!("  * {text}"),
        ReportFormat::Markdown => format!("- {text}"),
    }
}

/// Join finished sections into one document.
pub fn join_sections(sections: &[String]) -> String {
    sections
        .iter()
        .map(|s| s.trim_end())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_title_has_rules_no_markup() {
        let t = title(ReportFormat::Plain, "Factor Interpretation");
        assert!(t.contains("===="));
        assert!(!t.contains('#'));
    }

    #[test]
    fn test_markdown_title() {
        assert_eq!(title(ReportFormat::Markdown, "T"), "# T");
    }

    #[test]
    fn test_heading_modes() {
        assert!(heading(ReportFormat::Plain, "Components").contains("----"));
        assert_eq!(heading(ReportFormat::Markdown, "Components"), "## Components");
    }

    #[test]
    fn test_emphasis_modes() {
        assert_eq!(emphasis(ReportFormat::Plain, "x"), "x");
        assert_eq!(emphasis(ReportFormat::Markdown, "x"), "**x**");
    }

    #[test]
    fn test_join_sections_drops_empty() {
        let joined = join_sections(&["a".to_string(), String::new(), "b".to_string()]);
        assert_eq!(joined, "a\n\nb");
    }
}
