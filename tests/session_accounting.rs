//! Session and token-ledger integration tests.
//!
//! Drives repeated interpretations through one `Session` with scripted
//! provider counters, asserting the cache-aware accounting invariants:
//! monotone cumulative totals, preamble recorded exactly once, per-call
//! counts that never include the preamble, and the system prompt sent only
//! on the first exchange.

mod common;

use common::{
    frame, raw_two_component_model, three_variable_metadata, well_formed_factor_response,
    RecordingClient,
};
use modelsage::{
    interpret_in_session, InterpretError, InterpretOptions, ScriptedClient, Session,
};

fn two_component_response() -> String {
    r#"{"C1": {"label": "X", "interpretation": "First component text."},
        "C2": {"label": "Y", "interpretation": "Second component text."}}"#
        .to_string()
}

fn options() -> InterpretOptions<'static> {
    InterpretOptions::default()
}

/// Scenario D: on the second call the provider caches the preamble, so the
/// cumulative input counter does not advance (the clamped delta is 0 and
/// cumulative input is unchanged) while the per-call, preamble-excluded,
/// reading still reports the actual new-message cost.
#[tokio::test]
async fn cached_preamble_second_call_accounting() {
    common::init_test_logging();
    let client = ScriptedClient::with_responses([
        two_component_response(),
        two_component_response(),
    ])
    .with_usage_frames([
        // Call 1: 1000 cumulative input, of which 400 is the exchange; the
        // remaining 600 is the one-time preamble.
        frame(1000.0, 200.0, 400.0, 200.0),
        // Call 2: cached preamble, cumulative input counter unchanged.
        frame(1000.0, 450.0, 420.0, 250.0),
    ]);
    let mut session = Session::new(Box::new(client), "factor");

    let first = interpret_in_session(
        &mut session,
        "factor",
        &raw_two_component_model(),
        &three_variable_metadata(),
        &options(),
    )
    .await
    .unwrap();

    assert_eq!(first.tokens.input, 400, "per-call counts exclude the preamble");
    assert_eq!(session.totals().input, 1000);
    assert_eq!(session.preamble_tokens(), Some(600));

    let second = interpret_in_session(
        &mut session,
        "factor",
        &raw_two_component_model(),
        &three_variable_metadata(),
        &options(),
    )
    .await
    .unwrap();

    // Per-call reading still reports the actual new-message cost...
    assert_eq!(second.tokens.input, 420);
    assert_eq!(second.tokens.output, 250);
    // ...while cumulative input is unchanged (delta clamped to 0).
    assert_eq!(session.totals().input, 1000);
    assert_eq!(session.totals().output, 450);
    // The preamble is never re-derived or re-added.
    assert_eq!(session.preamble_tokens(), Some(600));
    assert_eq!(session.interpretations(), 2);
}

/// Cumulative counters never decrease, whatever the provider reports.
#[tokio::test]
async fn cumulative_totals_are_monotonic() {
    let client = ScriptedClient::with_responses([
        two_component_response(),
        two_component_response(),
        two_component_response(),
    ])
    .with_usage_frames([
        frame(800.0, 150.0, 300.0, 150.0),
        // Counter goes backwards (provider restarted / recounted).
        frame(700.0, 100.0, 310.0, 160.0),
        frame(900.0, 260.0, 200.0, 90.0),
    ]);
    let mut session = Session::new(Box::new(client), "factor");

    let mut previous = (0u64, 0u64);
    for _ in 0..3 {
        interpret_in_session(
            &mut session,
            "factor",
            &raw_two_component_model(),
            &three_variable_metadata(),
            &options(),
        )
        .await
        .unwrap();
        let totals = session.totals();
        assert!(totals.input >= previous.0, "input total decreased");
        assert!(totals.output >= previous.1, "output total decreased");
        previous = (totals.input, totals.output);
    }
}

/// A zero per-exchange reading with a positive delta substitutes the delta.
#[tokio::test]
async fn zero_exchange_reading_substitutes_delta() {
    let client = ScriptedClient::with_responses([two_component_response()])
        .with_usage_frames([frame(500.0, 120.0, 0.0, 0.0)]);
    let mut session = Session::new(Box::new(client), "factor");

    let result = interpret_in_session(
        &mut session,
        "factor",
        &raw_two_component_model(),
        &three_variable_metadata(),
        &options(),
    )
    .await
    .unwrap();

    assert_eq!(result.tokens.input, 500);
    assert_eq!(result.tokens.output, 120);
}

/// The system prompt goes out once per session, not once per call.
#[tokio::test]
async fn system_prompt_sent_once_per_session() {
    let scripted = ScriptedClient::with_responses([
        two_component_response(),
        two_component_response(),
    ]);
    let (client, transcript) = RecordingClient::new(scripted);
    let mut session = Session::new(Box::new(client), "factor");

    for _ in 0..2 {
        interpret_in_session(
            &mut session,
            "factor",
            &raw_two_component_model(),
            &three_variable_metadata(),
            &options(),
        )
        .await
        .unwrap();
    }

    let log = transcript.lock().unwrap();
    assert_eq!(log.len(), 2);
    assert!(log[0].0.is_some(), "first call must carry the system prompt");
    assert!(log[1].0.is_none(), "later calls must reuse the session preamble");
}

/// Reusing a session for a different analysis type fails before any work.
#[tokio::test]
async fn session_reuse_across_types_fails() {
    let scripted = ScriptedClient::with_responses([two_component_response()]);
    let (client, transcript) = RecordingClient::new(scripted);
    let mut session = Session::new(Box::new(client), "factor");

    let err = interpret_in_session(
        &mut session,
        "pca",
        &raw_two_component_model(),
        &three_variable_metadata(),
        &options(),
    )
    .await
    .unwrap_err();

    match err {
        InterpretError::SessionTypeMismatch {
            session_type,
            requested,
        } => {
            assert_eq!(session_type, "factor");
            assert_eq!(requested, "pca");
        }
        other => panic!("expected SessionTypeMismatch, got {other}"),
    }
    assert!(transcript.lock().unwrap().is_empty(), "no exchange should be billed");
    assert_eq!(session.interpretations(), 0);
}

/// A transport failure mid-session surfaces verbatim and leaves the session
/// counters untouched; the caller decides whether to retry.
#[tokio::test]
async fn transport_failure_leaves_session_unchanged() {
    let mut scripted = ScriptedClient::with_responses([two_component_response()]);
    scripted.fail_next("gateway timeout");
    let mut session = Session::new(Box::new(scripted), "factor");

    let err = interpret_in_session(
        &mut session,
        "factor",
        &raw_two_component_model(),
        &three_variable_metadata(),
        &options(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, InterpretError::LlmInvocation { .. }));
    assert!(err.to_string().contains("gateway timeout"));
    assert_eq!(session.interpretations(), 0);
    assert_eq!(session.totals().input, 0);
    assert_eq!(session.preamble_tokens(), None);

    // The session remains usable: the caller's retry succeeds.
    let result = interpret_in_session(
        &mut session,
        "factor",
        &raw_two_component_model(),
        &three_variable_metadata(),
        &options(),
    )
    .await
    .unwrap();
    assert_eq!(session.interpretations(), 1);
    assert!(result.recovered.fully_validated());
}

/// Sessionless calls report per-exchange counts that never include a
/// preamble, even on the first call.
#[tokio::test]
async fn sessionless_per_call_counts_exclude_preamble() {
    let mut client = ScriptedClient::with_responses([well_formed_factor_response()])
        .with_usage_frames([frame(900.0, 180.0, 350.0, 180.0)]);

    let result = modelsage::interpret(
        &mut client,
        "factor",
        &common::five_variable_factor_model(),
        &common::five_variable_metadata(),
        &options(),
    )
    .await
    .unwrap();

    assert_eq!(result.tokens.input, 350);
    assert_eq!(result.tokens.output, 180);
}
