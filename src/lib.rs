//! ModelSage: LLM-Assisted Statistical Model Interpretation
//!
//! Orchestrates an LLM through a structured request/response cycle to produce
//! domain interpretations of fitted statistical models (factor analysis,
//! principal components, and further families by registration).
//!
//! ## Architecture
//!
//! - **Capability Registry**: pluggable per-analysis-type operation sets
//! - **Recovery Pipeline**: parse → validate → pattern-extract → default,
//!   never raising back to the caller
//! - **Token Ledger**: dual-tier, cache-aware token accounting
//! - **Session Manager**: long-lived conversations amortizing the one-time
//!   system preamble
//! - **Orchestrator**: the deterministic single-attempt sequence

pub mod analyses;
pub mod client;
pub mod config;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod prompt;
pub mod recovery;
pub mod registry;
pub mod report;
pub mod session;
pub mod types;

// Re-export the public surface
pub use analyses::{AnalysisCapabilities, FactorAnalysis, PrincipalComponents};
pub use client::{ChatClient, RawUsage, ScriptedClient, UsageFrame};
pub use config::InterpretConfig;
pub use error::InterpretError;
pub use ledger::UsageSnapshot;
pub use orchestrator::{interpret, interpret_in_session, interpret_with, InterpretOptions};
pub use prompt::PromptPair;
pub use recovery::ValidationRules;
pub use registry::CapabilityRegistry;
pub use report::ReportFormat;
pub use session::{Session, TokenTotals};

// Re-export the core data model
pub use types::{
    ComponentInterpretation, DiagnosticsSummary, ExtractedAnalysisData, FactorModel,
    InterpretationResult, ModelInput, PcaModel, RawModelPayload, RecoveredResult, RecoveryTier,
    VariableMetadata,
};
