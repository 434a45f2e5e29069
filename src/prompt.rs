//! Prompt construction.
//!
//! Two pure pieces per analysis family: a system prompt (persona + rules,
//! built once per call or once per session) and a main prompt assembled from
//! fixed-order sections. Families fill the sections; the assembly order
//! never varies: guidelines, optional extra context, model-info summary,
//! variable descriptions, type-specific data rendering, output-format spec
//! with a literal example.

use crate::types::data::VariableMetadata;

/// System instructions plus main instructions for one invocation.
#[derive(Debug, Clone)]
pub struct PromptPair {
    /// Persona and standing rules. Sent with every call when no session is
    /// used; on a session, built for the first call and `None` afterwards
    /// because the conversation already carries it.
    pub system: Option<String>,
    /// Data and output-format instructions for this exchange.
    pub main: String,
}

/// The fixed-order sections of a main prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptSections {
    /// Interpretation guidelines, including the advisory word limit.
    pub guidelines: String,
    /// Caller-supplied context (study population, instrument, hypotheses).
    pub extra_context: Option<String>,
    /// One-paragraph summary of the fitted model.
    pub model_info: String,
    /// Variable identifier and description lines.
    pub variable_descriptions: String,
    /// Type-specific rendering of the numeric results.
    pub data_rendering: String,
    /// Output-format specification with a literal example.
    pub output_format: String,
}

impl PromptSections {
    /// Assemble the sections in their fixed order.
    pub fn assemble(&self) -> String {
        let mut parts: Vec<&str> = vec![&self.guidelines];
        if let Some(extra) = &self.extra_context {
            parts.push(extra);
        }
        parts.push(&self.model_info);
        parts.push(&self.variable_descriptions);
        parts.push(&self.data_rendering);
        parts.push(&self.output_format);
        parts
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Guideline block shared by the loadings-based families.
pub fn standard_guidelines(word_limit: usize) -> String {
    format!(
        "### GUIDELINES\n\
         1. Interpret each component from the variables that load on it, using the variable descriptions below.\n\
         2. Name each component with a concise substantive label (2-5 words).\n\
         3. Keep each interpretation under {word_limit} words.\n\
         4. Ground every claim in the reported loadings; do not speculate beyond the data.\n\
         5. Note when a component is dominated by a single variable or mixes unrelated content."
    )
}

/// Render the caller's extra context under its own heading.
pub fn extra_context_section(extra: Option<&str>) -> Option<String> {
    extra
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("### STUDY CONTEXT\n{s}"))
}

/// One line per variable: identifier and description.
pub fn variable_description_section(metadata: &VariableMetadata) -> String {
    let mut out = String::from("### VARIABLES\n");
    for row in metadata.rows() {
        out.push_str(&format!("- {}: {}\n", row.name, row.description));
    }
    out.trim_end().to_string()
}

/// Output-format specification with a literal example keyed by the actual
/// expected component ids.
pub fn output_format_section(component_ids: &[String]) -> String {
    let mut example = String::from("{\n");
    for (i, id) in component_ids.iter().enumerate() {
        example.push_str(&format!(
            "  \"{id}\": {{\"label\": \"<short name>\", \"interpretation\": \"<your interpretation>\"}}{}\n",
            if i + 1 < component_ids.len() { "," } else { "" }
        ));
    }
    example.push('}');
    format!(
        "### OUTPUT FORMAT\n\
         Respond with ONLY a JSON object. One key per component, exactly these keys: {}.\n\
         Each value is an object with a \"label\" field and an \"interpretation\" field, both strings.\n\
         No preamble, no markdown fences, no trailing commentary.\n\
         Example:\n{example}",
        component_ids.join(", ")
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_fixed_order() {
        let sections = PromptSections {
            guidelines: "G".to_string(),
            extra_context: Some("X".to_string()),
            model_info: "M".to_string(),
            variable_descriptions: "V".to_string(),
            data_rendering: "D".to_string(),
            output_format: "O".to_string(),
        };
        assert_eq!(sections.assemble(), "G\n\nX\n\nM\n\nV\n\nD\n\nO");
    }

    #[test]
    fn test_assemble_skips_absent_extra_context() {
        let sections = PromptSections {
            guidelines: "G".to_string(),
            extra_context: None,
            model_info: "M".to_string(),
            variable_descriptions: "V".to_string(),
            data_rendering: "D".to_string(),
            output_format: "O".to_string(),
        };
        assert_eq!(sections.assemble(), "G\n\nM\n\nV\n\nD\n\nO");
    }

    #[test]
    fn test_guidelines_embed_word_limit() {
        assert!(standard_guidelines(120).contains("120 words"));
    }

    #[test]
    fn test_output_format_names_every_id() {
        let ids = vec!["F1".to_string(), "F2".to_string()];
        let section = output_format_section(&ids);
        assert!(section.contains("\"F1\""));
        assert!(section.contains("\"F2\""));
        assert!(section.contains("exactly these keys: F1, F2"));
        // The example must end without a trailing comma before the brace.
        assert!(!section.contains("}},\n}"));
    }

    #[test]
    fn test_variable_section_lists_all_rows() {
        let meta = VariableMetadata::from_pairs([("a", "first thing"), ("b", "second thing")]);
        let section = variable_description_section(&meta);
        assert!(section.contains("- a: first thing"));
        assert!(section.contains("- b: second thing"));
    }

    #[test]
    fn test_extra_context_trims_and_filters() {
        assert!(extra_context_section(Some("  ")).is_none());
        assert!(extra_context_section(None).is_none());
        let some = extra_context_section(Some("college sample")).unwrap();
        assert!(some.contains("college sample"));
    }
}
