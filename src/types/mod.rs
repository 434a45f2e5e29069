//! Core data model for the interpretation engine.
//!
//! - `data`: model inputs, variable metadata, and the normalized extraction
//!   output every analysis family produces.
//! - `recovery`: the validated-or-salvaged component interpretation map.
//! - `result`: what one orchestrator call returns to the caller.

pub mod data;
pub mod recovery;
pub mod result;

pub use data::{
    ExtractedAnalysisData, FactorModel, ModelInput, PcaModel, RawModelPayload, VariableMetadata,
};
pub use recovery::{ComponentInterpretation, RecoveredResult, RecoveryTier};
pub use result::{DiagnosticsSummary, InterpretationResult};
