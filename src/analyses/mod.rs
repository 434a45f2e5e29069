//! Analysis families and the capability contract they implement.
//!
//! One `AnalysisCapabilities` implementation per analysis family. Adding a
//! family is one registration plus the operation implementations; the
//! orchestrator is never modified.
//!
//! The eight mandatory operations ship default bodies that fail with
//! `CapabilityNotImplemented` naming the operation. Registration therefore
//! does not validate completeness: an incomplete family registers and
//! resolves fine, and the first call into a missing operation is what fails,
//! naming exactly what is absent. The five optional operations default to
//! benign no-ops.

pub(crate) mod loadings;

pub mod factor;
pub mod pca;

pub use factor::FactorAnalysis;
pub use pca::PrincipalComponents;

use crate::config::InterpretConfig;
use crate::error::InterpretError;
use crate::recovery::strategies::MatcherStrategy;
use crate::recovery::ValidationRules;
use crate::report::ReportFormat;
use crate::types::data::{ExtractedAnalysisData, ModelInput, VariableMetadata};
use crate::types::recovery::{ComponentInterpretation, RecoveredResult};
use crate::types::result::{DiagnosticsSummary, InterpretationResult};

/// Operation names, used in `CapabilityNotImplemented` errors.
pub mod ops {
    pub const EXTRACT: &str = "extract";
    pub const BUILD_SYSTEM_PROMPT: &str = "build_system_prompt";
    pub const BUILD_MAIN_PROMPT: &str = "build_main_prompt";
    pub const VALIDATION_RULES: &str = "validation_rules";
    pub const MATCHER_STRATEGIES: &str = "matcher_strategies";
    pub const PLACEHOLDER: &str = "placeholder";
    pub const SUMMARIZE: &str = "summarize";
    pub const RENDER_REPORT: &str = "render_report";

    /// The eight operations every complete family must implement.
    pub const MANDATORY: [&str; 8] = [
        EXTRACT,
        BUILD_SYSTEM_PROMPT,
        BUILD_MAIN_PROMPT,
        VALIDATION_RULES,
        MATCHER_STRATEGIES,
        PLACEHOLDER,
        SUMMARIZE,
        RENDER_REPORT,
    ];
}

/// The pluggable operation set for one analysis family.
pub trait AnalysisCapabilities: std::fmt::Debug + Send + Sync {
    /// The analysis-type id this set handles (registry key).
    fn type_id(&self) -> &str;

    // ------------------------------------------------------------------
    // Mandatory operations
    // ------------------------------------------------------------------

    /// Normalize a fitted model (or raw payload) into the universal schema.
    fn extract(
        &self,
        _input: &ModelInput,
        _metadata: &VariableMetadata,
        _config: &InterpretConfig,
    ) -> Result<ExtractedAnalysisData, InterpretError> {
        Err(InterpretError::missing_operation(self.type_id(), ops::EXTRACT))
    }

    /// Persona and standing rules, built once per call or once per session.
    fn build_system_prompt(&self, _config: &InterpretConfig) -> Result<String, InterpretError> {
        Err(InterpretError::missing_operation(
            self.type_id(),
            ops::BUILD_SYSTEM_PROMPT,
        ))
    }

    /// The data-bearing main prompt for one exchange.
    fn build_main_prompt(
        &self,
        _data: &ExtractedAnalysisData,
        _metadata: &VariableMetadata,
        _word_limit: usize,
        _extra_context: Option<&str>,
    ) -> Result<String, InterpretError> {
        Err(InterpretError::missing_operation(
            self.type_id(),
            ops::BUILD_MAIN_PROMPT,
        ))
    }

    /// The validator contract for this family's responses.
    fn validation_rules(&self) -> Result<ValidationRules, InterpretError> {
        Err(InterpretError::missing_operation(
            self.type_id(),
            ops::VALIDATION_RULES,
        ))
    }

    /// Ordered fallback matcher strategies, strictest first.
    fn matcher_strategies(&self) -> Result<Vec<MatcherStrategy>, InterpretError> {
        Err(InterpretError::missing_operation(
            self.type_id(),
            ops::MATCHER_STRATEGIES,
        ))
    }

    /// Default-tier placeholder entry for one component id. Must be
    /// deterministic for a given id.
    fn placeholder(&self, _component_id: &str) -> Result<ComponentInterpretation, InterpretError> {
        Err(InterpretError::missing_operation(
            self.type_id(),
            ops::PLACEHOLDER,
        ))
    }

    /// Type-specific diagnostics summary text.
    fn summarize(
        &self,
        _data: &ExtractedAnalysisData,
        _recovered: &RecoveredResult,
    ) -> Result<String, InterpretError> {
        Err(InterpretError::missing_operation(self.type_id(), ops::SUMMARIZE))
    }

    /// The rendered report in the requested format.
    fn render_report(
        &self,
        _data: &ExtractedAnalysisData,
        _recovered: &RecoveredResult,
        _diagnostics: &DiagnosticsSummary,
        _format: ReportFormat,
    ) -> Result<String, InterpretError> {
        Err(InterpretError::missing_operation(
            self.type_id(),
            ops::RENDER_REPORT,
        ))
    }

    // ------------------------------------------------------------------
    // Optional operations
    // ------------------------------------------------------------------

    /// Additional family-specific guideline text appended to the standard
    /// guidelines section.
    fn extra_guidelines(&self) -> Result<Option<String>, InterpretError> {
        Ok(None)
    }

    /// Family default for the advisory word limit; the configured value
    /// takes precedence through `config::resolve`.
    fn default_word_limit(&self) -> Result<Option<usize>, InterpretError> {
        Ok(None)
    }

    /// Report title override.
    fn report_title(&self) -> Result<Option<String>, InterpretError> {
        Ok(None)
    }

    /// Structured payload for the plotting subsystem.
    fn plot_payload(
        &self,
        _data: &ExtractedAnalysisData,
        _recovered: &RecoveredResult,
    ) -> Result<Option<serde_json::Value>, InterpretError> {
        Ok(None)
    }

    /// Structured payload for the file-export subsystem.
    fn export_payload(
        &self,
        _result: &InterpretationResult,
    ) -> Result<Option<serde_json::Value>, InterpretError> {
        Ok(None)
    }
}

// ============================================================================
// Tests
// ============================================================================
