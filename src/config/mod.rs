//! Layered configuration with one precedence rule everywhere.
//!
//! Tunables resolve as: explicit argument > field in a supplied configuration
//! object > registered global default. The single `resolve` function applies
//! that chain wherever a tunable is consulted; nothing resolves precedence
//! ad hoc.
//!
//! ## Usage
//!
//! Call `config::init()` once at startup if the host wants a non-default
//! global; otherwise `config::get_or_default()` lazily installs the built-in
//! defaults on first use:
//!
//! ```ignore
//! // In host setup (optional):
//! config::init(InterpretConfig::load());
//!
//! // Anywhere in the engine:
//! let limit = config::resolve(explicit, cfg.llm.word_limit, defaults::WORD_LIMIT);
//! ```

pub mod defaults;
mod settings;

pub use settings::{
    AnalysisSettings, ConfigError, InterpretConfig, LlmSettings, OutputSettings,
};

use std::sync::OnceLock;

/// Global configuration, installed once.
static GLOBAL_CONFIG: OnceLock<InterpretConfig> = OnceLock::new();

/// Install the global configuration.
///
/// Call at most once, before any interpretation runs. A second call (or a
/// call after the lazy default has been taken) is ignored with a warning.
pub fn init(config: InterpretConfig) {
    if GLOBAL_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called after the global config was already set — ignoring");
    }
}

/// The global configuration, installing built-in defaults on first use.
pub fn get_or_default() -> &'static InterpretConfig {
    GLOBAL_CONFIG.get_or_init(InterpretConfig::default)
}

/// Whether a global configuration has been installed or defaulted yet.
pub fn is_initialized() -> bool {
    GLOBAL_CONFIG.get().is_some()
}

/// The one precedence-resolution rule: explicit argument > configured field >
/// registered default.
pub fn resolve<T>(explicit: Option<T>, configured: Option<T>, fallback: T) -> T {
    explicit.or(configured).unwrap_or(fallback)
}

// ============================================================================
// Tests
// ============================================================================
