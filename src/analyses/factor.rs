//! Exploratory factor analysis family.
//!
//! The reference family: normalizes fitted factor models (or bare loadings
//! payloads) into the universal schema, prompts for one interpretation per
//! factor, and renders analyst-facing reports.

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
use tracing::warn;

/// System prompt for factor interpretation.
const SYSTEM_PROMPT: &str = "\
You are an expert psychometrician interpreting exploratory factor analysis results.

Your task: given factor loadings and variable descriptions, explain what latent
construct each factor most plausibly represents.

Standing rules:
- Reason only from the loadings and variable descriptions you are given.
- Salient loadings define a factor; weak loadings are context, not evidence.
- Negative loadings mean the variable runs opposite to the factor; say so when it matters.
- Cross-loading variables belong to more than one factor; do not force them into one.
- Prefer plain, substantive language over statistical jargon.
- Follow the output format in each request exactly.";

/// The `factor` capability set.
#[derive(Debug)]
pub struct FactorAnalysis;

impl FactorAnalysis {
    /// Registry id for this family.
    pub const TYPE_ID: &'static str = "factor";
}

impl AnalysisCapabilities for FactorAnalysis {
    fn type_id(&self) -> &str {
        Self::TYPE_ID
    }

    fn extract(
        &self,
        input: &ModelInput,
        metadata: &VariableMetadata,
        config: &InterpretConfig,
    ) -> Result<ExtractedAnalysisData, InterpretError> {
        let normalized = match input {
            ModelInput::Factor(model) => NormalizedFactor {
                loadings: model.loadings.clone(),
                variable_names: model.variable_names.clone(),
                component_names: model.factor_names.clone(),
                uniquenesses: model.uniquenesses.clone(),
                proportion_variance: model.proportion_variance.clone(),
                factor_correlations: model.factor_correlations.clone(),
                rotation: model.rotation.clone(),
                extraction_method: model.extraction_method.clone(),
                n_obs: model.n_obs,
            },
            ModelInput::Raw(raw) => NormalizedFactor {
                loadings: raw.loadings.clone(),
                variable_names: raw.variable_names.clone(),
                component_names: raw.component_names.clone(),
                uniquenesses: None,
                proportion_variance: None,
                factor_correlations: None,
                rotation: None,
                extraction_method: None,
                n_obs: None,
            },
            other => {
                return Err(InterpretError::DataShape {
                    expected: "a fitted factor model or a raw loadings payload".to_string(),
                    found: other.shape_name().to_string(),
                    detail: "the factor extractor cannot normalize this input".to_string(),
                })
            }
        };
        normalized.into_extracted(metadata, config)
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
        let mut guidelines = standard_guidelines(word_limit);
        if let Some(extra) = self.extra_guidelines()? {
            guidelines.push('\n');
            guidelines.push_str(&extra);
        }

        let sections = PromptSections {
            guidelines,
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
                "Unable to interpret factor {component_id} from the model response. \
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
                    "Weakly defined factors (fewer than 2 salient variables): {}.",
                    ids.join(", ")
                ));
            }
        }
        if let Some(crosses) = data.detail("cross_loadings").and_then(Value::as_array) {
            if !crosses.is_empty() {
                let vars: Vec<&str> = crosses
                    .iter()
                    .filter_map(|c| c.get("variable").and_then(Value::as_str))
                    .collect();
                lines.push(format!("Cross-loading variables: {}.", vars.join(", ")));
            }
        }
        if let Some(high) = data.detail("high_uniqueness").and_then(Value::as_array) {
            if !high.is_empty() {
                let vars: Vec<&str> = high
                    .iter()
                    .filter_map(|c| c.get("variable").and_then(Value::as_str))
                    .collect();
                lines.push(format!(
                    "Variables poorly explained by the retained factors: {}.",
                    vars.join(", ")
                ));
            }
        }

        let verbatim = data
            .component_names
            .iter()
            .filter(|id| recovered.get(id).is_some_and(|e| !e.fallback))
            .count();
        lines.push(format!(
            "{verbatim} of {} factors interpreted from a validated response.",
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
        let title_text = self
            .report_title()?
            .unwrap_or_else(|| "Factor Interpretation".to_string());
        let mut sections = vec![report::title(format, &title_text)];

        sections.push(format!(
            "{}\n{}",
            report::heading(format, "Model"),
            describe_model(data)
        ));

        sections.push(report::heading(format, "Factors"));
        for id in &data.component_names {
            if let Some(entry) = recovered.get(id) {
                sections.push(component_section(format, id, entry, data));
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

    fn extra_guidelines(&self) -> Result<Option<String>, InterpretError> {
        Ok(Some(
            "6. When a factor's salient variables all load negatively, interpret the \
             reversed pole and note the direction."
                .to_string(),
        ))
    }

    fn report_title(&self) -> Result<Option<String>, InterpretError> {
        Ok(Some("Exploratory Factor Analysis Interpretation".to_string()))
    }

    fn plot_payload(
        &self,
        data: &ExtractedAnalysisData,
        recovered: &RecoveredResult,
    ) -> Result<Option<Value>, InterpretError> {
        // Loadings plus recovered labels: enough for a loading-matrix plot
        // with human factor names.
        let labels: serde_json::Map<String, Value> = data
            .component_names
            .iter()
            .filter_map(|id| {
                recovered
                    .get(id)
                    .map(|e| (id.clone(), Value::String(e.label.clone())))
            })
            .collect();
        Ok(Some(json!({
            "loadings": data.detail("loadings").cloned().unwrap_or(Value::Null),
            "variables": data.variable_names,
            "components": data.component_names,
            "labels": labels,
        })))
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// The factor-shaped inputs reduced to one intermediate form.
struct NormalizedFactor {
    loadings: Vec<Vec<f64>>,
    variable_names: Option<Vec<String>>,
    component_names: Option<Vec<String>>,
    uniquenesses: Option<Vec<f64>>,
    proportion_variance: Option<Vec<f64>>,
    factor_correlations: Option<Vec<Vec<f64>>>,
    rotation: Option<String>,
    extraction_method: Option<String>,
    n_obs: Option<usize>,
}

impl NormalizedFactor {
    fn into_extracted(
        self,
        metadata: &VariableMetadata,
        config: &InterpretConfig,
    ) -> Result<ExtractedAnalysisData, InterpretError> {
        let (n_variables, n_components) = loadings_dimensions(&self.loadings)?;
        metadata.validate_against(n_variables)?;

        let variable_names = match self.variable_names {
            Some(names) => {
                if names.len() != n_variables {
                    return Err(InterpretError::DataShape {
                        expected: format!("{n_variables} variable names (one per loadings row)"),
                        found: format!("{} names", names.len()),
                        detail: "variable names must align with the loadings table".to_string(),
                    });
                }
                if names != metadata.names() {
                    warn!(
                        "Model variable names differ from metadata identifiers; \
                         descriptions are matched by identifier"
                    );
                }
                names
            }
            None => metadata.names(),
        };

        let component_names = match self.component_names {
            Some(names) if names.len() == n_components => names,
            Some(names) => {
                return Err(InterpretError::DataShape {
                    expected: format!("{n_components} factor names (one per loadings column)"),
                    found: format!("{} names", names.len()),
                    detail: "factor names must align with the loadings table".to_string(),
                });
            }
            None => synthesized_names("F", n_components),
        };

        if let Some(uniq) = &self.uniquenesses {
            if uniq.len() != n_variables {
                return Err(InterpretError::DataShape {
                    expected: format!("{n_variables} uniquenesses (one per variable)"),
                    found: format!("{} values", uniq.len()),
                    detail: "uniquenesses must align with the loadings table".to_string(),
                });
            }
        }
        if let Some(propv) = &self.proportion_variance {
            if propv.len() != n_components {
                return Err(InterpretError::DataShape {
                    expected: format!("{n_components} variance proportions (one per factor)"),
                    found: format!("{} values", propv.len()),
                    detail: "proportion of variance must align with the factors".to_string(),
                });
            }
        }

        let cutoff = config::resolve(
            None,
            config.analysis.salience_cutoff,
            defaults::SALIENCE_CUTOFF,
        );
        let top = config::resolve(None, config.analysis.top_variables, defaults::TOP_VARIABLES);
        let high_uniqueness_cutoff = config::resolve(
            None,
            config.analysis.high_uniqueness,
            defaults::HIGH_UNIQUENESS,
        );

        let salient = salient_map(&self.loadings, &variable_names, &component_names, cutoff, top);
        let crosses = cross_loadings(&self.loadings, &variable_names, &component_names, cutoff);
        let weak = weakly_defined(&salient, &component_names, 2);

        let high_uniqueness: Vec<Value> = self
            .uniquenesses
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .zip(&variable_names)
            .filter(|(u, _)| **u > high_uniqueness_cutoff)
            .map(|(u, name)| json!({ "variable": name, "uniqueness": u }))
            .collect();

        let cumulative_variance = self
            .proportion_variance
            .as_ref()
            .map(|p| p.iter().sum::<f64>());

        let mut details = serde_json::Map::new();
        details.insert("loadings".into(), json!(self.loadings));
        details.insert("salience_cutoff".into(), json!(cutoff));
        details.insert("salient_loadings".into(), Value::Object(salient));
        details.insert("cross_loadings".into(), Value::Array(crosses));
        details.insert("weakly_defined".into(), json!(weak));
        details.insert("high_uniqueness".into(), Value::Array(high_uniqueness));
        details.insert("rotation".into(), json!(self.rotation));
        details.insert("extraction_method".into(), json!(self.extraction_method));
        details.insert("proportion_variance".into(), json!(self.proportion_variance));
        details.insert("cumulative_variance".into(), json!(cumulative_variance));
        details.insert("factor_correlations".into(), json!(self.factor_correlations));
        details.insert("n_obs".into(), json!(self.n_obs));

        Ok(ExtractedAnalysisData {
            analysis_type: FactorAnalysis::TYPE_ID.to_string(),
            n_components,
            n_variables,
            variable_names,
            component_names,
            details,
        })
    }
}

// ============================================================================
// Prompt and report sections
// ============================================================================

/// One-paragraph model description shared by the prompt and the report.
fn describe_model(data: &ExtractedAnalysisData) -> String {
    let mut text = format!(
        "Exploratory factor analysis: {} factors over {} variables",
        data.n_components, data.n_variables
    );
    if let Some(n) = data.detail("n_obs").and_then(Value::as_u64) {
        text.push_str(&format!(" (N = {n})"));
    }
    text.push('.');
    if let Some(method) = data.detail("extraction_method").and_then(Value::as_str) {
        text.push_str(&format!(" Extraction: {method}."));
    }
    if let Some(rotation) = data.detail("rotation").and_then(Value::as_str) {
        text.push_str(&format!(" Rotation: {rotation}."));
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

/// Type-specific data rendering: salient loadings per factor.
fn loadings_section(data: &ExtractedAnalysisData) -> String {
    let cutoff = data
        .detail("salience_cutoff")
        .and_then(Value::as_f64)
        .unwrap_or(defaults::SALIENCE_CUTOFF);
    let mut out = format!("### FACTOR LOADINGS (salient at |loading| >= {cutoff:.2})\n");

    let salient = data.detail("salient_loadings").and_then(Value::as_object);
    let proportions = data.detail("proportion_variance").and_then(Value::as_array);

    for (i, id) in data.component_names.iter().enumerate() {
        out.push_str(id);
        if let Some(p) = proportions
            .and_then(|list| list.get(i))
            .and_then(Value::as_f64)
        {
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

    if let Some(crosses) = data.detail("cross_loadings").and_then(Value::as_array) {
        if !crosses.is_empty() {
            let vars: Vec<&str> = crosses
                .iter()
                .filter_map(|c| c.get("variable").and_then(Value::as_str))
                .collect();
            out.push_str(&format!(
                "Cross-loading variables (salient on several factors): {}\n",
                vars.join(", ")
            ));
        }
    }

    out.trim_end().to_string()
}

/// One factor's report section.
fn component_section(
    format: ReportFormat,
    id: &str,
    entry: &ComponentInterpretation,
    data: &ExtractedAnalysisData,
) -> String {
    let confidence = if entry.fallback { " [low confidence]" } else { "" };
    let heading_text = format!("{id} — {}{confidence}", entry.label);
    let mut lines = vec![
        report::subheading(format, &heading_text),
        entry.interpretation.clone(),
    ];

    let entries = data
        .detail("salient_loadings")
        .and_then(Value::as_object)
        .and_then(|m| m.get(id))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    for salient in entries {
        if let (Some(variable), Some(loading)) = (
            salient.get("variable").and_then(Value::as_str),
            salient.get("loading").and_then(Value::as_f64),
        ) {
            lines.push(report::bullet(
                format,
                &format!("{variable} ({loading:+.2})"),
            ));
        }
    }
    lines.join("\n")
}

// ============================================================================
// Tests
// ============================================================================
