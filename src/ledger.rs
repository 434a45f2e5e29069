//! Dual-tier, cache-aware token accounting.
//!
//! Providers report two kinds of counts for a conversation: cumulative
//! counters that include the one-time system-preamble cost, and per-exchange
//! counts that exclude it. Prompt caching makes naive arithmetic on the
//! cumulative counters unreliable: a cached preamble can make the counter
//! advance by less than the exchange actually cost, or not at all. So every
//! call takes both reads and reconciles them:
//!
//! - the cumulative before/after delta, clamped at zero per direction, is the
//!   only thing ever added to a session's running totals (keeps them
//!   monotonic);
//! - the exchange read is what the caller sees as "this call's tokens", with
//!   the clamped delta substituted when the exchange read is zero but the
//!   delta is positive.
//!
//! `normalize_count` is the single place raw provider values (null, missing,
//! NaN, negative) are coerced to usable numbers.

use crate::client::{ChatClient, RawUsage};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// Normalization
// ============================================================================

/// Coerce one raw provider count to a token count.
///
/// Null/missing, NaN, infinities and negative values all become 0. Idempotent
/// over its own output.
pub fn normalize_count(raw: Option<f64>) -> u64 {
    match raw {
        Some(v) if v.is_finite() && v > 0.0 => v.round() as u64,
        _ => 0,
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Normalized token counts, one value per direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Input (prompt) tokens.
    pub input: u64,
    /// Output (completion) tokens.
    pub output: u64,
}

impl UsageSnapshot {
    /// Normalize a raw provider read.
    pub fn from_raw(raw: RawUsage) -> Self {
        Self {
            input: normalize_count(raw.input),
            output: normalize_count(raw.output),
        }
    }

    /// Per-direction `max(0, after - before)`.
    pub fn clamped_delta(before: Self, after: Self) -> Self {
        Self {
            input: after.input.saturating_sub(before.input),
            output: after.output.saturating_sub(before.output),
        }
    }

    /// Total across both directions.
    pub fn total(&self) -> u64 {
        self.input + self.output
    }

    /// True when both directions are zero.
    pub fn is_zero(&self) -> bool {
        self.input == 0 && self.output == 0
    }
}

// ============================================================================
// Per-call accounting
// ============================================================================

/// The reconciled accounting for one completed exchange.
#[derive(Debug, Clone, Copy)]
pub struct CallAccounting {
    /// Clamped cumulative delta, the only quantity added to session totals.
    pub delta: UsageSnapshot,
    /// The exchange's own counts (preamble excluded), after fallback
    /// substitution. This is what per-call reporting shows.
    pub exchange: UsageSnapshot,
}

/// Take the before-call snapshot of the preamble-inclusive counters.
pub fn open(client: &dyn ChatClient) -> UsageSnapshot {
    UsageSnapshot::from_raw(client.cumulative_usage())
}

/// Reconcile both counter reads after a completed exchange.
pub fn settle(before: UsageSnapshot, client: &dyn ChatClient) -> CallAccounting {
    let after = UsageSnapshot::from_raw(client.cumulative_usage());
    let delta = UsageSnapshot::clamped_delta(before, after);
    let mut exchange = UsageSnapshot::from_raw(client.last_exchange_usage());

    // Some providers report zero on the exchange read while the cumulative
    // counters still advanced; the delta is the better estimate then.
    if exchange.input == 0 && delta.input > 0 {
        exchange.input = delta.input;
    }
    if exchange.output == 0 && delta.output > 0 {
        exchange.output = delta.output;
    }

    debug!(
        delta_in = delta.input,
        delta_out = delta.output,
        exchange_in = exchange.input,
        exchange_out = exchange.output,
        "Token accounting settled"
    );

    CallAccounting { delta, exchange }
}

// ============================================================================
// Tests
// ============================================================================
