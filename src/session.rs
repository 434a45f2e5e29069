//! Long-lived interpretation sessions.
//!
//! A session owns one conversation handle and amortizes the one-time system
//! preamble across repeated interpretations of the same analysis type. The
//! orchestrator mutates it in place through `&mut Session`; lifetime is
//! caller-controlled with no implicit teardown beyond drop.

use crate::client::ChatClient;
use crate::error::InterpretError;
use crate::ledger::CallAccounting;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cumulative token totals for a session. Monotonically non-decreasing:
/// only clamped per-call deltas are ever added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotals {
    /// Cumulative input tokens across all calls.
    pub input: u64,
    /// Cumulative output tokens across all calls.
    pub output: u64,
}

/// Counters and flags the orchestrator updates after each call.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionState {
    pub analysis_type: String,
    pub totals: TokenTotals,
    pub preamble_tokens: Option<u64>,
    pub interpretations: u32,
    pub system_sent: bool,
}

impl SessionState {
    /// Fold one call's accounting into the session counters.
    ///
    /// Totals take the clamped delta only. The preamble cost is derived once,
    /// on the first successful call, as the part of that call's input delta
    /// the exchange read does not explain; it is never re-added afterwards
    /// even though the delta keeps being computed against the
    /// preamble-inclusive counters.
    pub fn record_call(&mut self, acct: &CallAccounting) {
        self.totals.input += acct.delta.input;
        self.totals.output += acct.delta.output;
        if self.preamble_tokens.is_none() {
            let preamble = acct.delta.input.saturating_sub(acct.exchange.input);
            self.preamble_tokens = Some(preamble);
            debug!(preamble_tokens = preamble, "Recorded one-time preamble cost");
        }
        self.interpretations += 1;
    }
}

/// A long-lived conversation handle for repeated interpretations of one
/// analysis type.
pub struct Session {
    client: Box<dyn ChatClient>,
    state: SessionState,
}

impl Session {
    /// Create a session bound to an analysis type. The type is immutable for
    /// the session's lifetime.
    pub fn new(client: Box<dyn ChatClient>, analysis_type: impl Into<String>) -> Self {
        Self {
            client,
            state: SessionState {
                analysis_type: analysis_type.into(),
                ..SessionState::default()
            },
        }
    }

    /// The analysis type this session was created for.
    pub fn analysis_type(&self) -> &str {
        &self.state.analysis_type
    }

    /// Cumulative token totals across all calls on this session.
    pub fn totals(&self) -> TokenTotals {
        self.state.totals
    }

    /// The one-time preamble cost, once the first call has recorded it.
    pub fn preamble_tokens(&self) -> Option<u64> {
        self.state.preamble_tokens
    }

    /// Number of completed interpretations on this session.
    pub fn interpretations(&self) -> u32 {
        self.state.interpretations
    }

    /// Whether the system preamble has already been sent on this conversation.
    pub fn system_sent(&self) -> bool {
        self.state.system_sent
    }

    /// Fail unless the requested type matches the session's declared type.
    pub(crate) fn ensure_type(&self, requested: &str) -> Result<(), InterpretError> {
        if self.state.analysis_type != requested {
            return Err(InterpretError::SessionTypeMismatch {
                session_type: self.state.analysis_type.clone(),
                requested: requested.to_string(),
            });
        }
        Ok(())
    }

    /// Split into the transport and the mutable counters, so the orchestrator
    /// can drive the client while updating session state.
    pub(crate) fn parts(&mut self) -> (&mut dyn ChatClient, &mut SessionState) {
        (self.client.as_mut(), &mut self.state)
    }

    /// Explicitly discard the session, reclaiming the transport client.
    pub fn into_client(self) -> Box<dyn ChatClient> {
        self.client
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("analysis_type", &self.state.analysis_type)
            .field("totals", &self.state.totals)
            .field("preamble_tokens", &self.state.preamble_tokens)
            .field("interpretations", &self.state.interpretations)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ScriptedClient;
    use crate::ledger::UsageSnapshot;

    fn acct(delta_in: u64, delta_out: u64, ex_in: u64, ex_out: u64) -> CallAccounting {
        CallAccounting {
            delta: UsageSnapshot {
                input: delta_in,
                output: delta_out,
            },
            exchange: UsageSnapshot {
                input: ex_in,
                output: ex_out,
            },
        }
    }

    #[test]
    fn test_preamble_recorded_exactly_once() {
        let mut state = SessionState::default();
        // First call: 90 input delta, 60 attributable to the exchange.
        state.record_call(&acct(90, 30, 60, 30));
        assert_eq!(state.preamble_tokens, Some(30));

        // Second call: delta fully explained by the exchange; preamble must
        // not be touched.
        state.record_call(&acct(55, 25, 55, 25));
        assert_eq!(state.preamble_tokens, Some(30));
        assert_eq!(state.interpretations, 2);
    }

    #[test]
    fn test_totals_take_delta_not_exchange() {
        let mut state = SessionState::default();
        // Cached preamble: delta clamps to 0 while the exchange still reports.
        state.record_call(&acct(0, 20, 45, 20));
        assert_eq!(state.totals.input, 0);
        assert_eq!(state.totals.output, 20);
    }

    #[test]
    fn test_totals_monotonic_across_sequence() {
        let mut state = SessionState::default();
        let mut last = TokenTotals::default();
        for call in [acct(90, 30, 60, 30), acct(0, 25, 50, 25), acct(40, 10, 40, 10)] {
            state.record_call(&call);
            assert!(state.totals.input >= last.input);
            assert!(state.totals.output >= last.output);
            last = state.totals;
        }
    }

    #[test]
    fn test_session_type_guard() {
        let session = Session::new(Box::new(ScriptedClient::default()), "factor");
        assert!(session.ensure_type("factor").is_ok());
        let err = session.ensure_type("pca").unwrap_err();
        assert!(matches!(err, InterpretError::SessionTypeMismatch { .. }));
    }

    #[test]
    fn test_into_client_reclaims_transport() {
        let session = Session::new(Box::new(ScriptedClient::default()), "factor");
        let client = session.into_client();
        assert_eq!(client.provider(), "scripted");
    }
}
