//! Golden-file conformance tests
//!
//! A fixed object graph and event log must always produce the same script,
//! byte for byte.

use std::sync::Arc;

use smtrace_core::{
    InMemoryObjectModel, MemorySink, PropertiesToTrace, TraceContext, TraceEvent,
};

const MODEL: &str = include_str!("fixtures/pipeline/model.json");
const EVENTS: &str = include_str!("fixtures/pipeline/events.jsonl");
const EXPECTED_TRACE: &str = include_str!("fixtures/pipeline/expected-trace.py");
const EXPECTED_STATE: &str = include_str!("fixtures/pipeline/expected-state.py");

/// Context over the pipeline fixture, echoing into memory
fn pipeline_context() -> (TraceContext, Arc<MemorySink>) {
    let model = InMemoryObjectModel::from_json(MODEL).expect("fixture model parses");
    let sink = Arc::new(MemorySink::new());
    let ctx = TraceContext::new(Arc::new(model)).with_sink(sink.clone());
    (ctx, sink)
}

#[test]
fn test_fixture_events_parse() {
    let events = TraceEvent::parse_jsonl(EVENTS).unwrap();
    assert_eq!(events.len(), 7);
    assert_eq!(events[0].item_type, "RegisterViewProxy");
    assert_eq!(events[6].item_type, "CallFunction");
}

#[test]
fn test_replayed_trace_matches_golden() {
    let (ctx, _) = pipeline_context();
    ctx.start_trace();
    for event in TraceEvent::parse_jsonl(EVENTS).unwrap() {
        ctx.record(&event);
    }
    assert_eq!(ctx.stop_trace().unwrap(), EXPECTED_TRACE);
}

#[test]
fn test_state_matches_golden() {
    let (ctx, _) = pipeline_context();
    let state = ctx.get_state(PropertiesToTrace::Modified, true).unwrap();
    assert_eq!(state, EXPECTED_STATE);
}

#[test]
fn test_live_echo_matches_script_body() {
    let (ctx, sink) = pipeline_context();
    ctx.start_trace().set_log_to_stdout(true);
    for event in TraceEvent::parse_jsonl(EVENTS).unwrap() {
        ctx.record(&event);
    }
    let script = ctx.stop_trace().unwrap();

    let body: Vec<&str> = script.lines().skip(2).collect();
    assert_eq!(sink.lines(), body);
}

#[test]
fn test_model_survives_json_round_trip() {
    let model = InMemoryObjectModel::from_json(MODEL).unwrap();
    let again = InMemoryObjectModel::from_json(&model.to_json().unwrap()).unwrap();

    let ctx = TraceContext::new(Arc::new(again)).with_sink(Arc::new(MemorySink::new()));
    assert_eq!(
        ctx.get_state(PropertiesToTrace::Modified, true).unwrap(),
        EXPECTED_STATE
    );
}
