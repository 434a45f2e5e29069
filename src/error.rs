//! The error taxonomy surfaced to callers of the interpretation engine.
//!
//! Every fallible public operation returns [`InterpretError`]. The variants
//! are intentionally coarse: callers branch on the failure *domain* (bad input
//! shape, an unimplemented capability, a transport failure, a session misuse)
//! rather than on fine-grained codes.
//!
//! `Display` messages name the offending values so a log line is actionable on
//! its own. The `LlmInvocation` variant carries the underlying transport
//! failure verbatim; because that failure arrives as an [`anyhow::Error`]
//! (which does not itself implement [`std::error::Error`]), the `Display` and
//! `Error` implementations are written by hand rather than derived.

use std::fmt;

/// A failure from any interpretation operation.
#[derive(Debug)]
pub enum InterpretError {
    /// The supplied model or metadata did not match the shape the engine
    /// requires. Both the expected and the observed shape are named.
    DataShape {
        /// What the engine required.
        expected: String,
        /// What it actually received.
        found: String,
        /// A human-readable note on why the shape matters.
        detail: String,
    },

    /// An analysis-type id resolved, but the requested operation has no
    /// implementation — or the type id itself is not registered at all
    /// (`operation` is then `None`).
    CapabilityNotImplemented {
        /// The analysis-type id involved.
        analysis_type: String,
        /// The missing operation, or `None` when the type is unregistered.
        operation: Option<String>,
    },

    /// The chat transport failed during an exchange. The provider-level error
    /// is preserved as the source.
    LlmInvocation {
        /// The underlying transport failure.
        source: anyhow::Error,
    },

    /// A session bound to one analysis type was asked to interpret another.
    SessionTypeMismatch {
        /// The type the session is bound to.
        session_type: String,
        /// The type that was requested.
        requested: String,
    },
}

impl InterpretError {
    /// An analysis-type id with no registered capability set.
    pub fn unregistered_type(analysis_type: &str) -> Self {
        Self::CapabilityNotImplemented {
            analysis_type: analysis_type.to_string(),
            operation: None,
        }
    }

    /// A registered analysis type that does not implement `operation`.
    pub fn missing_operation(analysis_type: &str, operation: &str) -> Self {
        Self::CapabilityNotImplemented {
            analysis_type: analysis_type.to_string(),
            operation: Some(operation.to_string()),
        }
    }

    /// Variable metadata whose row count disagrees with the model's variable
    /// count.
    pub fn metadata_row_mismatch(model_variables: usize, rows: usize) -> Self {
        Self::DataShape {
            expected: format!("metadata for {model_variables} variables"),
            found: format!("{rows} metadata rows"),
            detail: "one metadata row is required per model variable".to_string(),
        }
    }
}

impl fmt::Display for InterpretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataShape {
                expected,
                found,
                detail,
            } => write!(
                f,
                "data shape mismatch: expected {expected}, found {found} — {detail}"
            ),
            Self::CapabilityNotImplemented {
                analysis_type,
                operation: Some(operation),
            } => write!(
                f,
                "analysis type '{analysis_type}' does not implement operation '{operation}'"
            ),
            Self::CapabilityNotImplemented {
                analysis_type,
                operation: None,
            } => write!(f, "analysis type '{analysis_type}' is not registered"),
            Self::LlmInvocation { source } => write!(f, "LLM invocation failed: {source}"),
            Self::SessionTypeMismatch {
                session_type,
                requested,
            } => write!(
                f,
                "session is bound to analysis type '{session_type}' but '{requested}' was requested"
            ),
        }
    }
}

impl std::error::Error for InterpretError {}
