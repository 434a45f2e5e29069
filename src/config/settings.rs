//! Layered configuration structs and TOML loading.
//!
//! Every tunable lives in one of three sections: LLM settings (provider,
//! model, word limit, sampling), analysis settings (numeric thresholds), and
//! output settings (render mode, verbosity). All fields are optional; a
//! missing field defers to the registered global default through
//! `config::resolve`.

use crate::report::ReportFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// Top-level config
// ============================================================================

/// Root configuration for the interpretation engine.
///
/// Load with `InterpretConfig::load()` which searches:
/// 1. `$MODELSAGE_CONFIG` env var
/// 2. `./modelsage.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterpretConfig {
    /// LLM request settings.
    #[serde(default)]
    pub llm: LlmSettings,

    /// Analysis-specific numeric thresholds.
    #[serde(default)]
    pub analysis: AnalysisSettings,

    /// Report output settings.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Settings that shape the LLM request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Provider id, advisory (e.g. "anthropic"). The injected client decides.
    #[serde(default)]
    pub provider: Option<String>,
    /// Model id, advisory. The injected client decides.
    #[serde(default)]
    pub model: Option<String>,
    /// Advisory per-component word limit embedded in the prompt.
    #[serde(default)]
    pub word_limit: Option<usize>,
    /// Sampling temperature suggested to the transport.
    #[serde(default)]
    pub temperature: Option<f64>,
}

/// Numeric thresholds the extractors and the recovery pipeline consult.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Absolute loading magnitude at which a variable counts as salient.
    #[serde(default)]
    pub salience_cutoff: Option<f64>,
    /// Validate-tier acceptance threshold (fraction of expected ids present).
    #[serde(default)]
    pub validation_threshold: Option<f64>,
    /// Uniqueness above which a variable is flagged as poorly explained.
    #[serde(default)]
    pub high_uniqueness: Option<f64>,
    /// Maximum salient variables listed per component.
    #[serde(default)]
    pub top_variables: Option<usize>,
}

/// Report output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Render mode for the report.
    #[serde(default)]
    pub format: Option<ReportFormat>,
    /// Include informational notices in the rendered report (they always
    /// remain available on the returned result).
    #[serde(default)]
    pub verbose: Option<bool>,
}

// ============================================================================
// Loading
// ============================================================================

/// Error loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl InterpretConfig {
    /// Load configuration using the standard search order:
    /// 1. `$MODELSAGE_CONFIG` environment variable
    /// 2. `./modelsage.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("MODELSAGE_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from MODELSAGE_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from MODELSAGE_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "MODELSAGE_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("modelsage.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./modelsage.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./modelsage.toml, using defaults");
                }
            }
        }

        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_toml_gives_all_none() {
        let config: InterpretConfig = toml::from_str("").unwrap();
        assert!(config.llm.word_limit.is_none());
        assert!(config.analysis.validation_threshold.is_none());
        assert!(config.output.format.is_none());
    }

    #[test]
    fn test_partial_toml_fills_only_named_fields() {
        let config: InterpretConfig = toml::from_str(
            r#"
            [llm]
            word_limit = 80

            [analysis]
            validation_threshold = 0.75
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.word_limit, Some(80));
        assert_eq!(config.analysis.validation_threshold, Some(0.75));
        assert!(config.llm.model.is_none());
        assert!(config.analysis.salience_cutoff.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm]\nmodel = \"claude-sonnet\"\n[output]\nformat = \"markdown\"")
            .unwrap();
        let config = InterpretConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.llm.model.as_deref(), Some("claude-sonnet"));
        assert_eq!(config.output.format, Some(ReportFormat::Markdown));
    }

    #[test]
    fn test_load_from_file_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm\nmodel = ").unwrap();
        let err = InterpretConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
