//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use modelsage::{
    ChatClient, FactorModel, ModelInput, RawModelPayload, RawUsage, ScriptedClient, UsageFrame,
    VariableMetadata,
};
use std::sync::{Arc, Mutex};

/// Opt-in tracing output for test debugging: set `MODELSAGE_TEST_LOG=debug`.
pub fn init_test_logging() {
    if std::env::var("MODELSAGE_TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("MODELSAGE_TEST_LOG")
                    .unwrap_or_default(),
            )
            .try_init();
    }
}

/// Five-variable, two-factor fitted model.
pub fn five_variable_factor_model() -> ModelInput {
    ModelInput::Factor(FactorModel {
        loadings: vec![
            vec![0.72, 0.05],
            vec![0.68, -0.02],
            vec![0.10, 0.81],
            vec![0.04, 0.59],
            vec![0.45, 0.44],
        ],
        variable_names: None,
        factor_names: None,
        uniquenesses: Some(vec![0.4, 0.5, 0.3, 0.6, 0.5]),
        proportion_variance: Some(vec![0.28, 0.21]),
        factor_correlations: None,
        rotation: Some("oblimin".to_string()),
        extraction_method: Some("minres".to_string()),
        n_obs: Some(500),
    })
}

/// Metadata matching `five_variable_factor_model`.
pub fn five_variable_metadata() -> VariableMetadata {
    VariableMetadata::from_pairs([
        ("worry", "worries about many things"),
        ("tension", "feels tense and on edge"),
        ("social", "enjoys social gatherings"),
        ("talkative", "talks to many different people"),
        ("restless", "restless in groups and alone"),
    ])
}

/// Raw two-component payload with explicit C1/C2 ids.
pub fn raw_two_component_model() -> ModelInput {
    ModelInput::Raw(RawModelPayload {
        loadings: vec![vec![0.7, 0.1], vec![0.6, 0.0], vec![0.1, 0.8]],
        variable_names: None,
        component_names: Some(vec!["C1".to_string(), "C2".to_string()]),
    })
}

/// Metadata matching `raw_two_component_model`.
pub fn three_variable_metadata() -> VariableMetadata {
    VariableMetadata::from_pairs([
        ("worry", "worries a lot"),
        ("tension", "feels tense"),
        ("social", "enjoys parties"),
    ])
}

/// A well-formed response for ids F1/F2.
pub fn well_formed_factor_response() -> String {
    r#"{"F1": {"label": "Negative Affect", "interpretation": "Worry and tension items load here."},
        "F2": {"label": "Sociability", "interpretation": "Social engagement items load here."}}"#
        .to_string()
}

/// A usage frame with explicit cumulative and per-exchange counts.
pub fn frame(
    cumulative_in: f64,
    cumulative_out: f64,
    exchange_in: f64,
    exchange_out: f64,
) -> UsageFrame {
    UsageFrame {
        cumulative: RawUsage::counted(cumulative_in, cumulative_out),
        last_exchange: RawUsage::counted(exchange_in, exchange_out),
    }
}

/// Shared transcript of (system, user) pairs, observable after a `Session`
/// has taken ownership of the client.
pub type SharedTranscript = Arc<Mutex<Vec<(Option<String>, String)>>>;

/// A `ScriptedClient` wrapper that mirrors every exchange into a shared
/// transcript the test keeps a handle to.
pub struct RecordingClient {
    inner: ScriptedClient,
    transcript: SharedTranscript,
}

impl RecordingClient {
    pub fn new(inner: ScriptedClient) -> (Self, SharedTranscript) {
        let transcript: SharedTranscript = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                inner,
                transcript: Arc::clone(&transcript),
            },
            transcript,
        )
    }
}

#[async_trait]
impl ChatClient for RecordingClient {
    async fn submit(&mut self, system: Option<&str>, user: &str) -> Result<String> {
        let response = self.inner.submit(system, user).await?;
        self.transcript
            .lock()
            .unwrap()
            .push((system.map(str::to_string), user.to_string()));
        Ok(response)
    }

    fn cumulative_usage(&self) -> RawUsage {
        self.inner.cumulative_usage()
    }

    fn last_exchange_usage(&self) -> RawUsage {
        self.inner.last_exchange_usage()
    }

    fn provider(&self) -> &str {
        "recording"
    }
}
