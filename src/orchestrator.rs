//! The interpretation sequence.
//!
//! One deterministic, single-attempt pass per call: resolve capabilities,
//! extract, pre-fetch the recovery inputs, build prompts, invoke the LLM
//! (the only await), settle the token ledger, recover, update the session,
//! summarize and render. No internal retries beyond the recovery pipeline's
//! own tiering: capability, extraction and prompt errors are fatal before
//! the billed call; transport errors surface verbatim after it.

use crate::client::ChatClient;
use crate::config::{self, defaults, InterpretConfig};
use crate::error::InterpretError;
use crate::ledger;
use crate::prompt::PromptPair;
use crate::recovery;
use crate::registry::{self, CapabilityRegistry};
use crate::report::ReportFormat;
use crate::session::{Session, SessionState};
use crate::types::data::{ModelInput, VariableMetadata};
use crate::types::result::{DiagnosticsSummary, InterpretationResult};
use chrono::Utc;
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

/// Per-call options. Explicit fields here are the top of the precedence
/// chain; `config` (when supplied) overrides the process-wide configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpretOptions<'a> {
    /// Configuration object for this call; defaults to the global config.
    pub config: Option<&'a InterpretConfig>,
    /// Explicit advisory word limit.
    pub word_limit: Option<usize>,
    /// Caller context woven into the prompt (study population, instrument).
    pub extra_context: Option<&'a str>,
    /// Explicit report render mode.
    pub format: Option<ReportFormat>,
}

/// One-shot interpretation against the process-wide registry.
///
/// The system prompt is rebuilt and sent with the call; use a [`Session`]
/// to amortize that cost across repeated calls.
pub async fn interpret(
    client: &mut dyn ChatClient,
    analysis_type: &str,
    input: &ModelInput,
    metadata: &VariableMetadata,
    options: &InterpretOptions<'_>,
) -> Result<InterpretationResult, InterpretError> {
    run(registry::global(), client, None, analysis_type, input, metadata, options).await
}

/// One-shot interpretation against an explicit registry.
pub async fn interpret_with(
    registry: &CapabilityRegistry,
    client: &mut dyn ChatClient,
    analysis_type: &str,
    input: &ModelInput,
    metadata: &VariableMetadata,
    options: &InterpretOptions<'_>,
) -> Result<InterpretationResult, InterpretError> {
    run(registry, client, None, analysis_type, input, metadata, options).await
}

/// Interpretation within a long-lived session.
///
/// Fails with [`InterpretError::SessionTypeMismatch`] when `analysis_type`
/// differs from the session's declared type. On success the session is
/// updated in place: cumulative token totals, the one-time preamble cost on
/// the first call, and the interpretation counter.
pub async fn interpret_in_session(
    session: &mut Session,
    analysis_type: &str,
    input: &ModelInput,
    metadata: &VariableMetadata,
    options: &InterpretOptions<'_>,
) -> Result<InterpretationResult, InterpretError> {
    session.ensure_type(analysis_type)?;
    let (client, state) = session.parts();
    run(
        registry::global(),
        client,
        Some(state),
        analysis_type,
        input,
        metadata,
        options,
    )
    .await
}

/// The shared sequence behind every public entry point.
async fn run(
    registry: &CapabilityRegistry,
    client: &mut dyn ChatClient,
    mut session_state: Option<&mut SessionState>,
    analysis_type: &str,
    input: &ModelInput,
    metadata: &VariableMetadata,
    options: &InterpretOptions<'_>,
) -> Result<InterpretationResult, InterpretError> {
    let started = Instant::now();
    let caps = registry.resolve(analysis_type)?;
    let cfg = match options.config {
        Some(config) => config,
        None => config::get_or_default(),
    };

    let data = caps.extract(input, metadata, cfg)?;

    let word_limit = config::resolve(
        options.word_limit,
        cfg.llm.word_limit,
        caps.default_word_limit()?.unwrap_or(defaults::WORD_LIMIT),
    );

    // Everything the recovery pipeline needs is fetched before the billed
    // call, so recovery itself can never raise (a missing operation fails
    // here instead, before any tokens are spent).
    let rules = caps.validation_rules()?;
    let threshold = config::resolve(
        None,
        cfg.analysis.validation_threshold,
        rules.default_threshold.unwrap_or(defaults::VALIDATION_THRESHOLD),
    );
    let strategies = caps.matcher_strategies()?;
    let mut placeholders = HashMap::new();
    for id in &data.component_names {
        placeholders.insert(id.clone(), caps.placeholder(id)?);
    }

    let send_system = !session_state.as_ref().is_some_and(|s| s.system_sent);
    let prompts = PromptPair {
        system: if send_system {
            Some(caps.build_system_prompt(cfg)?)
        } else {
            None
        },
        main: caps.build_main_prompt(&data, metadata, word_limit, options.extra_context)?,
    };

    info!(
        analysis_type,
        components = data.n_components,
        variables = data.n_variables,
        session = session_state.is_some(),
        provider = client.provider(),
        "Dispatching interpretation request"
    );

    let before = ledger::open(client);
    let raw = client
        .submit(prompts.system.as_deref(), &prompts.main)
        .await
        .map_err(|source| InterpretError::LlmInvocation { source })?;
    let acct = ledger::settle(before, client);

    let recovered = recovery::recover(
        &raw,
        &data.component_names,
        threshold,
        &rules,
        &strategies,
        &placeholders,
    );

    if let Some(state) = session_state.as_deref_mut() {
        if send_system {
            state.system_sent = true;
        }
        state.record_call(&acct);
    }

    // Word limit is a soft target: overage is reported, never raised.
    let mut notices = Vec::new();
    for id in &data.component_names {
        if let Some(entry) = recovered.get(id) {
            let words = entry.interpretation.split_whitespace().count();
            if words > word_limit {
                notices.push(format!(
                    "interpretation for {id} runs {words} words against the advisory limit of {word_limit}"
                ));
            }
        }
    }

    let fallback_components = recovered.fallback_ids(&data.component_names);
    let diagnostics = DiagnosticsSummary {
        text: caps.summarize(&data, &recovered)?,
        recovery_tier: recovered.deepest_tier,
        fallback_components,
        notices,
    };

    let format = config::resolve(options.format, cfg.output.format, ReportFormat::default());
    // Non-verbose output keeps the notices in the returned result but leaves
    // them out of the rendered report.
    let verbose = config::resolve(None, cfg.output.verbose, true);
    let report = if verbose {
        caps.render_report(&data, &recovered, &diagnostics, format)?
    } else {
        let compact = DiagnosticsSummary {
            notices: Vec::new(),
            ..diagnostics.clone()
        };
        caps.render_report(&data, &recovered, &compact, format)?
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        analysis_type,
        tier = %recovered.deepest_tier,
        fallbacks = diagnostics.fallback_components.len(),
        tokens_in = acct.exchange.input,
        tokens_out = acct.exchange.output,
        elapsed_ms,
        "Interpretation complete"
    );

    Ok(InterpretationResult {
        analysis_type: analysis_type.to_string(),
        data,
        recovered,
        diagnostics,
        tokens: acct.exchange,
        report,
        elapsed_ms,
        timestamp: Utc::now(),
    })
}

// ============================================================================
// Tests
// ============================================================================
