//! Model inputs, variable metadata, and the normalized extraction output.
//!
//! Fitted models arrive in whatever shape the host ecosystem produced them.
//! The tagged `ModelInput` enum covers the shapes the built-in families
//! recognize plus a raw structured payload; each family's extractor
//! normalizes the variants it accepts into one `ExtractedAnalysisData`
//! schema and rejects the rest with a shape error.

use crate::error::InterpretError;
use serde::{Deserialize, Serialize};

// ============================================================================
// Fitted-model inputs
// ============================================================================

/// A fitted model (or raw structured payload) submitted for interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelInput {
    /// A fitted exploratory factor analysis.
    Factor(FactorModel),
    /// A fitted principal component analysis.
    Pca(PcaModel),
    /// A bare loadings table with optional name vectors. Accepted by any
    /// loadings-based family; names are synthesized when absent.
    Raw(RawModelPayload),
}

impl ModelInput {
    /// Short label for error messages and logs.
    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::Factor(_) => "fitted factor model",
            Self::Pca(_) => "fitted principal component analysis",
            Self::Raw(_) => "raw loadings payload",
        }
    }
}

/// A fitted exploratory factor analysis.
///
/// `loadings` is variable-major: one row per observed variable, one column
/// per factor. All optional vectors, when present, must match the loadings
/// dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorModel {
    /// Pattern/structure loadings, one row per variable.
    pub loadings: Vec<Vec<f64>>,
    /// Variable names in row order. Metadata identifiers are used when absent.
    #[serde(default)]
    pub variable_names: Option<Vec<String>>,
    /// Factor names in column order (e.g. "ML1"). Synthesized as F1..Fk when absent.
    #[serde(default)]
    pub factor_names: Option<Vec<String>>,
    /// Per-variable uniquenesses (1 - communality).
    #[serde(default)]
    pub uniquenesses: Option<Vec<f64>>,
    /// Proportion of variance explained per factor.
    #[serde(default)]
    pub proportion_variance: Option<Vec<f64>>,
    /// Factor intercorrelation matrix (oblique rotations only).
    #[serde(default)]
    pub factor_correlations: Option<Vec<Vec<f64>>>,
    /// Rotation applied (e.g. "oblimin", "varimax").
    #[serde(default)]
    pub rotation: Option<String>,
    /// Extraction method (e.g. "minres", "ml").
    #[serde(default)]
    pub extraction_method: Option<String>,
    /// Number of observations the model was fitted on.
    #[serde(default)]
    pub n_obs: Option<usize>,
}

/// A fitted principal component analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcaModel {
    /// Component loadings, one row per variable.
    pub loadings: Vec<Vec<f64>>,
    /// Variable names in row order.
    #[serde(default)]
    pub variable_names: Option<Vec<String>>,
    /// Component names in column order. Synthesized as PC1..PCk when absent.
    #[serde(default)]
    pub component_names: Option<Vec<String>>,
    /// Eigenvalue (variance) of each retained component.
    #[serde(default)]
    pub eigenvalues: Option<Vec<f64>>,
    /// Proportion of total variance explained per component.
    #[serde(default)]
    pub proportion_variance: Option<Vec<f64>>,
    /// Whether the input variables were standardized before extraction.
    #[serde(default)]
    pub standardized: Option<bool>,
    /// Number of observations the model was fitted on.
    #[serde(default)]
    pub n_obs: Option<usize>,
}

/// A bare loadings table, for callers holding results outside any fitted
/// model object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawModelPayload {
    /// Loadings, one row per variable.
    pub loadings: Vec<Vec<f64>>,
    /// Variable names in row order.
    #[serde(default)]
    pub variable_names: Option<Vec<String>>,
    /// Component names in column order.
    #[serde(default)]
    pub component_names: Option<Vec<String>>,
}

/// Validate that a loadings table is rectangular and non-empty.
///
/// Returns (n_variables, n_components).
pub(crate) fn loadings_dimensions(
    loadings: &[Vec<f64>],
) -> Result<(usize, usize), InterpretError> {
    let n_variables = loadings.len();
    let n_components = loadings.first().map_or(0, Vec::len);
    if n_variables == 0 || n_components == 0 {
        return Err(InterpretError::DataShape {
            expected: "a non-empty loadings table (variables x components)".to_string(),
            found: format!("{n_variables} rows x {n_components} columns"),
            detail: "the primary loadings table is required for interpretation".to_string(),
        });
    }
    if let Some(bad) = loadings.iter().position(|row| row.len() != n_components) {
        return Err(InterpretError::DataShape {
            expected: format!("{n_components} loadings in every row"),
            found: format!("{} loadings in row {bad}", loadings[bad].len()),
            detail: "loadings table must be rectangular".to_string(),
        });
    }
    Ok((n_variables, n_components))
}

// ============================================================================
// Variable metadata
// ============================================================================

/// One described variable: identifier plus human-readable description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableInfo {
    /// Identifier matching the model's variable naming.
    pub name: String,
    /// What the variable measures, in analyst language.
    pub description: String,
}

/// The variable-metadata table: one row per model variable, in model order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableMetadata {
    rows: Vec<VariableInfo>,
}

impl VariableMetadata {
    /// Build from (identifier, description) pairs, preserving order.
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            rows: pairs
                .into_iter()
                .map(|(name, description)| VariableInfo {
                    name: name.into(),
                    description: description.into(),
                })
                .collect(),
        }
    }

    /// Number of described variables.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no variables are described.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in table order.
    pub fn rows(&self) -> &[VariableInfo] {
        &self.rows
    }

    /// Identifiers in table order.
    pub fn names(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.name.clone()).collect()
    }

    /// Description for one identifier, if present.
    pub fn description_of(&self, name: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.description.as_str())
    }

    /// Check the row count against the model's variable count.
    ///
    /// Fails with a shape error naming both counts when they differ.
    pub fn validate_against(&self, model_variables: usize) -> Result<(), InterpretError> {
        if self.rows.len() != model_variables {
            return Err(InterpretError::metadata_row_mismatch(
                model_variables,
                self.rows.len(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Extraction output
// ============================================================================

/// The normalized output of an analysis family's extractor.
///
/// Five universal fields plus an open `details` map for analysis-specific
/// material (salient loadings, variance explained, rotation, and so on).
/// Constructed whole by the extractor and treated as read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedAnalysisData {
    /// The analysis-type id that produced this data.
    pub analysis_type: String,
    /// Number of components (factors, principal components, ...).
    pub n_components: usize,
    /// Number of observed variables.
    pub n_variables: usize,
    /// Variable names in model order.
    pub variable_names: Vec<String>,
    /// Component names in model order; these are the expected ids the
    /// recovery pipeline keys its output by.
    pub component_names: Vec<String>,
    /// Analysis-specific fields, open-ended.
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl ExtractedAnalysisData {
    /// A detail field, if the extractor recorded it.
    pub fn detail(&self, key: &str) -> Option<&serde_json::Value> {
        self.details.get(key)
    }
}

/// Synthesize component names with the given prefix: `F1..Fk`, `PC1..PCk`.
pub(crate) fn synthesized_names(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("{prefix}{i}")).collect()
}

// ============================================================================
// Tests
// ============================================================================
