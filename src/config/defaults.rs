//! Named defaults for every tunable the engine consults.
//!
//! Each constant is the registered global default at the bottom of the
//! precedence chain: explicit argument > configuration field > these values.

/// Advisory per-component word limit embedded in the prompt text.
pub const WORD_LIMIT: usize = 150;

/// Fraction of expected component ids that must be present for the validate
/// tier to accept a parsed response. Heuristic, deliberately configurable.
pub const VALIDATION_THRESHOLD: f64 = 0.5;

/// Absolute loading magnitude at which a variable is considered salient for
/// a component.
pub const SALIENCE_CUTOFF: f64 = 0.40;

/// Uniqueness above which a variable is flagged as poorly explained by the
/// retained components.
pub const HIGH_UNIQUENESS: f64 = 0.70;

/// Maximum salient variables listed per component in prompts and reports.
pub const TOP_VARIABLES: usize = 10;

/// Sampling temperature suggested to the transport.
pub const TEMPERATURE: f64 = 0.2;

/// Placeholder label for components nothing could be recovered for.
pub const PLACEHOLDER_LABEL: &str = "(no label)";

/// Placeholder interpretation text for unrecoverable components. Fixed so the
/// default tier is idempotent.
pub const PLACEHOLDER_TEXT: &str =
    "Unable to interpret this component from the model response. Re-run the \
     interpretation or inspect the raw response for this component.";
