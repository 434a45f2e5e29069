//! Principal components family.
//!
//! Second built-in family. Loadings-based like factor analysis, but the
//! framing differs: components are variance-ordered composites, not latent
//! constructs, and the prompt and report say so.

use super::loadings::{cross_loadings, salient_map, weakly_defined};
use super::AnalysisCapabilities;
use crate::config::{self, defaults, InterpretConfig};
use crate::error::InterpretError;
use crate::prompt::{
    extra_context_section, output_format_section, standard_guidelines,
    variable_description_section, PromptSections,
};
use crate::recovery::strategies::{default_strategies, MatcherStrategy};
use crate::recovery::ValidationRules;
use crate::report::{self, ReportFormat};
use crate::types::data::{
    loadings_dimensions, synthesized_names, ExtractedAnalysisData, ModelInput, VariableMetadata,
};
use crate::types::recovery::{ComponentInterpretation, RecoveredResult, RecoveryTier};
use crate::types::result::DiagnosticsSummary;
use serde_json::{json, Value};

/// System prompt for component interpretation.
const SYSTEM_PROMPT: &str = "\
You are an expert data analyst interpreting principal component analysis results.

Your task: given component loadings and variable descriptions, describe what
shared pattern of variation each retained component captures.

Standing rules:
- Components are variance-ordered composites, not latent constructs; describe
  patterns, do not reify them.
- Reason only from the loadings and variable descriptions you are given.
- Negative loadings mean the variable runs opposite to the component; say so when it matters.
- Prefer plain, substantive language over statistical jargon.
- Follow the output format in each request exactly.";

/// The `pca` capability set.
#[derive(Debug)]
pub struct PrincipalComponents;

impl PrincipalComponents {
    /// Registry id for this family.
    pub const TYPE_ID: &'static str = "pca";
}

impl AnalysisCapabilities for PrincipalComponents {
    fn type_id(&self) -> &str {
        Self::TYPE_ID
    }

    fn extract(
        &self,
        input: &ModelInput,
        metadata: &VariableMetadata,
        config: &InterpretConfig,
    ) -> Result<ExtractedAnalysisData, InterpretError> {
        let (loadings, variable_names, component_names, eigenvalues, proportion_variance, standardized, n_obs) =
            match input {
                ModelInput::Pca(model) => (
                    model.loadings.clone(),
                    model.variable_names.clone(),
                    model.component_names.clone(),
                    model.eigenvalues.clone(),
                    model.proportion_variance.clone(),
                    model.standardized,
                    model.n_obs,
                ),
                ModelInput::Raw(raw) => (
                    raw.loadings.clone(),
                    raw.variable_names.clone(),
                    raw.component_names.clone(),
                    None,
                    None,
                    None,
                    None,
                ),
                other => {
                    return Err(InterpretError::DataShape {
                        expected: "a fitted principal component analysis or a raw loadings payload"
                            .to_string(),
                        found: other.shape_name().to_string(),
                        detail: "the pca extractor cannot normalize this input".to_string(),
                    })
                }
            };

        let (n_variables, n_components) = loadings_dimensions(&loadings)?;
        metadata.validate_against(n_variables)?;

        let variable_names = match variable_names {
            Some(names) if names.len() == n_variables => names,
            Some(names) => {
                return Err(InterpretError::DataShape {
                    expected: format!("{n_variables} variable names (one per loadings row)"),
                    found: format!("{} names", names.len()),
                    detail: "variable names must align with the loadings table".to_string(),
                });
            }
            None => metadata.names(),
        };
        let component_names = match component_names {
            Some(names) if names.len() == n_components => names,
            Some(names) => {
                return Err(InterpretError::DataShape {
                    expected: format!("{n_components} component names (one per loadings column)"),
                    found: format!("{} names", names.len()),
                    detail: "component names must align with the loadings table".to_string(),
                });
            }
            None => synthesized_names("PC", n_components),
        };

        let cutoff = config::resolve(
            None,
            config.analysis.salience_cutoff,
            defaults::SALIENCE_CUTOFF,
        );
        let top = config::resolve(None, config.analysis.top_variables, defaults::TOP_VARIABLES);

        let salient = salient_map(&loadings, &variable_names, &component_names, cutoff, top);
        let crosses = cross_loadings(&loadings, &variable_names, &component_names, cutoff);
        let weak = weakly_defined(&salient, &component_names, 2);
        let cumulative_variance = proportion_variance.as_ref().map(|p| p.iter().sum::<f64>());

        let mut details = serde_json::Map::new();
        details.insert("loadings".into(), json!(loadings));
        details.insert("salience_cutoff".into(), json!(cutoff));
        details.insert("salient_loadings".into(), Value::Object(salient));
        details.insert("cross_loadings".into(), Value::Array(crosses));
        details.insert("weakly_defined".into(), json!(weak));
        details.insert("eigenvalues".into(), json!(eigenvalues));
        details.insert("proportion_variance".into(), json!(proportion_variance));
        details.insert("cumulative_variance".into(), json!(cumulative_variance));
        details.insert("standardized".into(), json!(standardized));
        details.insert("n_obs".into(), json!(n_obs));

        Ok(ExtractedAnalysisData {
            analysis_type: Self::TYPE_ID.to_string(),
            n_components,
            n_variables,
            variable_names,
            component_names,
            details,
        })
    }

    fn build_system_prompt(&self, _config: &InterpretConfig) -> Result<String, InterpretError> {
        Ok(SYSTEM_PROMPT.to_string())
    }

    fn build_main_prompt(
        &self,
        data: &ExtractedAnalysisData,
        metadata: &VariableMetadata,
        word_limit: usize,
        extra_context: Option<&str>,
    ) -> Result<String, InterpretError> {
        let sections = PromptSections {
            guidelines: standard_guidelines(word_limit),
            extra_context: extra_context_section(extra_context),
            model_info: model_info_section(data),
            variable_descriptions: variable_description_section(metadata),
            data_rendering: loadings_section(data),
            output_format: output_format_section(&data.component_names),
        };
        Ok(sections.assemble())
    }

    fn validation_rules(&self) -> Result<ValidationRules, InterpretError> {
        Ok(ValidationRules::default())
    }

    fn matcher_strategies(&self) -> Result<Vec<MatcherStrategy>, InterpretError> {
        Ok(default_strategies())
    }

    fn placeholder(&self, component_id: &str) -> Result<ComponentInterpretation, InterpretError> {
        Ok(ComponentInterpretation {
            label: defaults::PLACEHOLDER_LABEL.to_string(),
            interpretation: format!(
                "Unable to interpret component {component_id} from the model response. \
                 Inspect the salient loadings directly or re-run the interpretation."
            ),
            fallback: true,
            tier: RecoveryTier::Default,
        })
    }

    fn summarize(
        &self,
        data: &ExtractedAnalysisData,
        recovered: &RecoveredResult,
    ) -> Result<String, InterpretError> {
        let mut lines = vec![describe_model(data)];
        if let Some(weak) = data.detail("weakly_defined").and_then(Value::as_array) {
            if !weak.is_empty() {
                let ids: Vec<&str> = weak.iter().filter_map(Value::as_str).collect();
                lines.push(format!(
                    "Components with fewer than 2 salient variables: {}.",
                    ids.join(", ")
                ));
            }
        }
        let verbatim = data
            .component_names
            .iter()
            .filter(|id| recovered.get(id).is_some_and(|e| !e.fallback))
            .count();
        lines.push(format!(
            "{verbatim} of {} components interpreted from a validated response.",
            data.n_components
        ));
        Ok(lines.join(" "))
    }

    fn render_report(
        &self,
        data: &ExtractedAnalysisData,
        recovered: &RecoveredResult,
        diagnostics: &DiagnosticsSummary,
        format: ReportFormat,
    ) -> Result<String, InterpretError> {
        let mut sections = vec![report::title(format, "Principal Component Interpretation")];

        sections.push(format!(
            "{}\n{}",
            report::heading(format, "Model"),
            describe_model(data)
        ));

        sections.push(report::heading(format, "Components"));
        for id in &data.component_names {
            if let Some(entry) = recovered.get(id) {
                let confidence = if entry.fallback { " [low confidence]" } else { "" };
                let mut lines = vec![
                    report::subheading(format, &format!("{id} — {}{confidence}", entry.label)),
                    entry.interpretation.clone(),
                ];
                let salient = data
                    .detail("salient_loadings")
                    .and_then(Value::as_object)
                    .and_then(|m| m.get(id))
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                for entry in salient {
                    if let (Some(variable), Some(loading)) = (
                        entry.get("variable").and_then(Value::as_str),
                        entry.get("loading").and_then(Value::as_f64),
                    ) {
                        lines.push(report::bullet(format, &format!("{variable} ({loading:+.2})")));
                    }
                }
                sections.push(lines.join("\n"));
            }
        }

        let mut diag_lines = vec![report::heading(format, "Diagnostics"), diagnostics.text.clone()];
        if diagnostics.degraded() {
            diag_lines.push(format!(
                "Low-confidence interpretations (recovered or placeholder): {}.",
                diagnostics.fallback_components.join(", ")
            ));
        }
        for notice in &diagnostics.notices {
            diag_lines.push(report::bullet(format, notice));
        }
        sections.push(diag_lines.join("\n"));

        Ok(report::join_sections(&sections))
    }
}

// ============================================================================
// Prompt and report sections
// ============================================================================

fn describe_model(data: &ExtractedAnalysisData) -> String {
    let mut text = format!(
        "Principal component analysis: {} retained components over {} variables",
        data.n_components, data.n_variables
    );
    if let Some(n) = data.detail("n_obs").and_then(Value::as_u64) {
        text.push_str(&format!(" (N = {n})"));
    }
    text.push('.');
    if let Some(standardized) = data.detail("standardized").and_then(Value::as_bool) {
        text.push_str(if standardized {
            " Variables standardized before extraction."
        } else {
            " Variables not standardized before extraction."
        });
    }
    if let Some(cumulative) = data.detail("cumulative_variance").and_then(Value::as_f64) {
        text.push_str(&format!(
            " Cumulative variance explained: {:.1}%.",
            cumulative * 100.0
        ));
    }
    text
}

fn model_info_section(data: &ExtractedAnalysisData) -> String {
    format!("### MODEL\n{}", describe_model(data))
}

fn loadings_section(data: &ExtractedAnalysisData) -> String {
    let cutoff = data
        .detail("salience_cutoff")
        .and_then(Value::as_f64)
        .unwrap_or(defaults::SALIENCE_CUTOFF);
    let mut out = format!("### COMPONENT LOADINGS (salient at |loading| >= {cutoff:.2})\n");

    let salient = data.detail("salient_loadings").and_then(Value::as_object);
    let proportions = data.detail("proportion_variance").and_then(Value::as_array);
    let eigenvalues = data.detail("eigenvalues").and_then(Value::as_array);

    for (i, id) in data.component_names.iter().enumerate() {
        out.push_str(id);
        if let Some(eig) = eigenvalues.and_then(|l| l.get(i)).and_then(Value::as_f64) {
            out.push_str(&format!(" (eigenvalue {eig:.2}"));
            if let Some(p) = proportions.and_then(|l| l.get(i)).and_then(Value::as_f64) {
                out.push_str(&format!(", {:.1}% of variance", p * 100.0));
            }
            out.push(')');
        } else if let Some(p) = proportions.and_then(|l| l.get(i)).and_then(Value::as_f64) {
            out.push_str(&format!(" ({:.1}% of variance)", p * 100.0));
        }
        out.push_str(":\n");

        let entries = salient
            .and_then(|m| m.get(id))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        if entries.is_empty() {
            out.push_str("  (no salient loadings)\n");
        }
        for entry in entries {
            if let (Some(variable), Some(loading)) = (
                entry.get("variable").and_then(Value::as_str),
                entry.get("loading").and_then(Value::as_f64),
            ) {
                out.push_str(&format!("  {variable}: {loading:.2}\n"));
            }
        }
    }
    out.trim_end().to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::data::PcaModel;

    fn fitted_model() -> ModelInput {
        ModelInput::Pca(PcaModel {
            loadings: vec![vec![0.8, 0.1], vec![0.75, 0.0], vec![0.05, 0.9]],
            variable_names: None,
            component_names: None,
            eigenvalues: Some(vec![1.9, 1.1]),
            proportion_variance: Some(vec![0.42, 0.25]),
            standardized: Some(true),
            n_obs: Some(240),
        })
    }

    fn metadata() -> VariableMetadata {
        VariableMetadata::from_pairs([
            ("height", "standing height in cm"),
            ("reach", "arm span in cm"),
            ("speed", "sprint speed over 40m"),
        ])
    }

    #[test]
    fn test_extract_synthesizes_pc_names() {
        let data = PrincipalComponents
            .extract(&fitted_model(), &metadata(), &InterpretConfig::default())
            .unwrap();
        assert_eq!(data.analysis_type, "pca");
        assert_eq!(data.component_names, vec!["PC1", "PC2"]);
        assert_eq!(data.n_variables, 3);
        let cumulative = data.detail("cumulative_variance").unwrap().as_f64().unwrap();
        assert!((cumulative - 0.67).abs() < 1e-9);
    }

    #[test]
    fn test_extract_rejects_factor_input() {
        let factor = ModelInput::Factor(crate::types::data::FactorModel {
            loadings: vec![vec![0.7]],
            variable_names: None,
            factor_names: None,
            uniquenesses: None,
            proportion_variance: None,
            factor_correlations: None,
            rotation: None,
            extraction_method: None,
            n_obs: None,
        });
        let meta = VariableMetadata::from_pairs([("a", "a")]);
        let err = PrincipalComponents
            .extract(&factor, &meta, &InterpretConfig::default())
            .unwrap_err();
        assert!(matches!(err, InterpretError::DataShape { .. }));
    }

    #[test]
    fn test_prompt_mentions_eigenvalues() {
        let data = PrincipalComponents
            .extract(&fitted_model(), &metadata(), &InterpretConfig::default())
            .unwrap();
        let prompt = PrincipalComponents
            .build_main_prompt(&data, &metadata(), 100, None)
            .unwrap();
        assert!(prompt.contains("eigenvalue 1.90"));
        assert!(prompt.contains("### COMPONENT LOADINGS"));
        assert!(prompt.contains("\"PC1\""));
    }

    #[test]
    fn test_report_plain_mode() {
        let data = PrincipalComponents
            .extract(&fitted_model(), &metadata(), &InterpretConfig::default())
            .unwrap();
        let mut entries = std::collections::HashMap::new();
        for id in &data.component_names {
            entries.insert(
                id.clone(),
                ComponentInterpretation::validated("Size", "Body size variables move together."),
            );
        }
        let recovered = RecoveredResult {
            entries,
            deepest_tier: RecoveryTier::Parse,
        };
        let diagnostics = DiagnosticsSummary {
            text: PrincipalComponents.summarize(&data, &recovered).unwrap(),
            recovery_tier: RecoveryTier::Parse,
            fallback_components: vec![],
            notices: vec![],
        };
        let plain = PrincipalComponents
            .render_report(&data, &recovered, &diagnostics, ReportFormat::Plain)
            .unwrap();
        assert!(plain.contains("Principal Component Interpretation"));
        assert!(plain.contains("PC1 — Size"));
        assert!(!plain.contains("**"));
    }
}
