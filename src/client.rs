//! The chat-transport seam.
//!
//! Network I/O, authentication, provider-level retries and timeouts all live
//! behind `ChatClient`; the engine sees one blocking exchange per call plus
//! two token-counter reads. Implementations wrap whatever provider SDK the
//! host uses.
//!
//! `ScriptedClient` is a deterministic stand-in with queued responses and
//! scripted usage counters, for tests and LLM-less operation.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;

// ============================================================================
// Usage reads
// ============================================================================

/// Raw token counts as a provider reports them: possibly absent, possibly
/// non-finite. `ledger::normalize_count` is the only place these are coerced.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawUsage {
    /// Input (prompt) tokens.
    pub input: Option<f64>,
    /// Output (completion) tokens.
    pub output: Option<f64>,
}

impl RawUsage {
    /// Both directions present and finite.
    pub fn counted(input: f64, output: f64) -> Self {
        Self {
            input: Some(input),
            output: Some(output),
        }
    }
}

// ============================================================================
// Transport trait
// ============================================================================

/// One conversation handle over an LLM provider.
///
/// The engine drives this serially: one `submit` in flight at a time, the
/// two usage reads consulted immediately around it. Implementations own the
/// message history; `system` is populated on the first exchange of a
/// conversation and omitted afterwards.
#[async_trait]
pub trait ChatClient: Send {
    /// One request/response exchange. Blocks (awaits) until the provider
    /// responds; timeouts are the implementation's concern and surface here
    /// as errors.
    async fn submit(&mut self, system: Option<&str>, user: &str) -> Result<String>;

    /// Cumulative provider-reported token counts for this conversation,
    /// including the one-time system-preamble cost.
    fn cumulative_usage(&self) -> RawUsage;

    /// Token counts for the most recent exchange only, excluding the
    /// preamble cost, even on a conversation's first exchange.
    fn last_exchange_usage(&self) -> RawUsage;

    /// Provider id, for logs.
    fn provider(&self) -> &str {
        "unknown"
    }

    /// Model id, for logs.
    fn model(&self) -> &str {
        "unknown"
    }
}

// ============================================================================
// Scripted stand-in
// ============================================================================

/// One scripted turn's counter state, applied after the exchange completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageFrame {
    /// Counter state for `cumulative_usage` after this exchange.
    pub cumulative: RawUsage,
    /// Counter state for `last_exchange_usage` after this exchange.
    pub last_exchange: RawUsage,
}

/// Deterministic `ChatClient` with queued responses and scripted counters.
///
/// Responses are served in order. Usage frames, when scripted, advance with
/// each exchange; without frames the counters grow by simple text-length
/// estimates, which is enough for callers that only need plausible non-zero
/// numbers.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    responses: VecDeque<String>,
    frames: VecDeque<UsageFrame>,
    current: UsageFrame,
    fail_next: Option<String>,
    exchanges: Vec<(Option<String>, String)>,
}

impl ScriptedClient {
    /// A client that will serve the given responses in order.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Script the counter states observed after each exchange.
    pub fn with_usage_frames<I>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = UsageFrame>,
    {
        self.frames = frames.into_iter().collect();
        self
    }

    /// Make the next `submit` fail with the given message.
    pub fn fail_next(&mut self, message: impl Into<String>) {
        self.fail_next = Some(message.into());
    }

    /// Exchanges submitted so far, as (system, user) pairs.
    pub fn exchanges(&self) -> &[(Option<String>, String)] {
        &self.exchanges
    }

    /// Number of completed exchanges.
    pub fn exchange_count(&self) -> usize {
        self.exchanges.len()
    }

    fn advance_counters(&mut self, system: Option<&str>, user: &str, response: &str) {
        if let Some(frame) = self.frames.pop_front() {
            self.current = frame;
            return;
        }
        // No scripted frames: estimate ~1 token per 4 chars.
        let estimate = |text: &str| (text.len() as f64 / 4.0).ceil();
        let in_tokens = estimate(user) + system.map_or(0.0, estimate);
        let out_tokens = estimate(response);
        let prev = self.current.cumulative;
        self.current = UsageFrame {
            cumulative: RawUsage::counted(
                prev.input.unwrap_or(0.0) + in_tokens,
                prev.output.unwrap_or(0.0) + out_tokens,
            ),
            last_exchange: RawUsage::counted(estimate(user), out_tokens),
        };
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn submit(&mut self, system: Option<&str>, user: &str) -> Result<String> {
        if let Some(message) = self.fail_next.take() {
            anyhow::bail!("{message}");
        }
        let response = self
            .responses
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("scripted client exhausted: no response queued"))?;
        self.advance_counters(system, user, &response);
        self.exchanges
            .push((system.map(str::to_string), user.to_string()));
        Ok(response)
    }

    fn cumulative_usage(&self) -> RawUsage {
        self.current.cumulative
    }

    fn last_exchange_usage(&self) -> RawUsage {
        self.current.last_exchange
    }

    fn provider(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Tests
// ============================================================================
