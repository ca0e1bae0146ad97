//! End-to-end tests for the assistant pipeline against in-process fakes
//!
//! Scenario: a user asks for a meeting; the capability is scripted per stage
//! and the calendar is an in-memory tool executor.

mod support;

use std::sync::Arc;

use calpilot_core::{
    AssistantPipeline, CheckpointStore, InMemoryCheckpointStore, Stage, StageRunner,
    ToolClientOptions,
};
use calpilot_domain::{ActionResult, CalPilotError, Intent, ValidationOutcome};
use serde_json::json;
use support::calendar::{timed_event, FakeCalendar};
use support::generation::{PromptKind, ScriptedCapability};

const CREATE_DATA: &str = r#"{"summary": "Team Sync", "start": "2025-09-25T15:00:00+05:30",
"end": "2025-09-25T16:00:00+05:30", "timezone": "Asia/Kolkata",
"attendees": ["priya@example.com", "sam@example.com"]}"#;

fn pipeline(
    capability: &ScriptedCapability,
    calendar: &FakeCalendar,
) -> (AssistantPipeline, Arc<InMemoryCheckpointStore>) {
    let checkpoints = Arc::new(InMemoryCheckpointStore::new());
    let stages = StageRunner::new(
        Arc::new(capability.clone()),
        Arc::new(calendar.clone()),
        ToolClientOptions::default(),
    );
    (AssistantPipeline::new(stages, checkpoints.clone()), checkpoints)
}

fn create_capability() -> ScriptedCapability {
    ScriptedCapability::new()
        .intent(r#"{"intent": "create_event"}"#)
        .data(CREATE_DATA)
        .validation(r#"{"valid": true, "errors": []}"#)
        .feedback("Event 'Team Sync' created on Sept 25, 3-4 PM IST with 2 attendees.")
}

#[tokio::test]
async fn create_request_lands_exactly_one_event() {
    let capability = create_capability();
    let calendar = FakeCalendar::new(vec![]);
    let (pipeline, _) = pipeline(&capability, &calendar);

    let response = pipeline
        .submit_query("Schedule Team Sync tomorrow 3pm IST with Priya and Sam")
        .await;

    let text = response.response.expect("response text");
    assert!(text.contains("Team Sync"));
    assert!(response.error.is_none());
    assert_eq!(calendar.tool_calls(), vec!["list_events", "create_event"]);
    let events = calendar.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].attendees.len(), 2);

    let feedback_ctx = &capability.calls_of(PromptKind::Feedback)[0];
    assert_eq!(feedback_ctx["result"]["status"], "created");
}

#[tokio::test]
async fn overlapping_request_is_aborted_without_mutation() {
    // 15:00-16:00 IST is 09:30-10:30 UTC.
    let existing = timed_event("standup", "Standup", "2025-09-25T10:00:00Z", "2025-09-25T11:00:00Z");
    let capability = create_capability().feedback("That slot clashes with Standup.");
    let calendar = FakeCalendar::new(vec![existing]);
    let (pipeline, _) = pipeline(&capability, &calendar);

    let state = pipeline.run("Schedule Team Sync tomorrow 3pm IST").await.expect("run");

    assert_eq!(calendar.mutating_calls(), 0);
    assert_eq!(calendar.events().len(), 1);
    let conflict = state.conflict.expect("conflict report");
    assert!(conflict.conflict);
    assert_eq!(conflict.conflicting_event.map(|e| e.id), Some("standup".to_string()));
    match state.action_result.expect("action result") {
        ActionResult::Rejected { errors } => assert!(errors[0].contains("Standup")),
        other => panic!("expected rejection, got {other:?}"),
    }
    let feedback_ctx = &capability.calls_of(PromptKind::Feedback)[0];
    assert_eq!(feedback_ctx["result"]["status"], "error");
}

#[tokio::test]
async fn back_to_back_event_is_not_a_conflict() {
    // Existing 08:30-09:30 UTC ends exactly when the new one starts.
    let existing = timed_event("early", "Early", "2025-09-25T08:30:00Z", "2025-09-25T09:30:00Z");
    let capability = create_capability();
    let calendar = FakeCalendar::new(vec![existing]);
    let (pipeline, _) = pipeline(&capability, &calendar);

    pipeline.run("Schedule Team Sync").await.expect("run");

    assert_eq!(calendar.events().len(), 2);
}

#[tokio::test]
async fn invalid_verdict_skips_remote_calls() {
    let capability = create_capability().validation(r#"{"valid": false, "errors": ["end is before start"]}"#);
    let calendar = FakeCalendar::new(vec![]);
    let (pipeline, _) = pipeline(&capability, &calendar);

    let state = pipeline.run("Schedule Team Sync").await.expect("run");

    assert_eq!(calendar.opens(), 0);
    assert_eq!(
        state.validation,
        Some(ValidationOutcome::Abort { errors: vec!["end is before start".into()] })
    );
}

#[tokio::test]
async fn missing_verdict_counts_as_invalid() {
    let capability = create_capability().validation("Looks fine to me!");
    let calendar = FakeCalendar::new(vec![]);
    let (pipeline, _) = pipeline(&capability, &calendar);

    let state = pipeline.run("Schedule Team Sync").await.expect("run");

    assert!(!state.validation.expect("validation").is_valid());
    assert_eq!(calendar.opens(), 0);
}

#[tokio::test]
async fn local_checks_run_before_the_capability() {
    let capability = create_capability().data(r#"{"summary": "Team Sync"}"#);
    let calendar = FakeCalendar::new(vec![]);
    let (pipeline, _) = pipeline(&capability, &calendar);

    let state = pipeline.run("Schedule Team Sync").await.expect("run");

    assert!(capability.calls_of(PromptKind::Validation).is_empty());
    let errors = state.validation.expect("validation").errors().to_vec();
    assert!(errors.iter().any(|e| e.contains("'start'")));
    assert_eq!(calendar.opens(), 0);
}

#[tokio::test]
async fn ambiguous_request_asks_for_clarification() {
    let capability = ScriptedCapability::new().intent("I am not sure what you mean").feedback("");
    let calendar = FakeCalendar::new(vec![]);
    let (pipeline, _) = pipeline(&capability, &calendar);

    let state = pipeline.run("hmm").await.expect("run");

    assert_eq!(state.intent(), None);
    assert!(capability.calls_of(PromptKind::Data).is_empty());
    let errors = state.validation.expect("validation").errors().to_vec();
    assert_eq!(errors, vec![CalPilotError::ClassificationAmbiguous.to_string()]);
    let message = state.feedback_message.expect("feedback");
    assert!(message.contains("list, create, update or delete"));
    assert_eq!(calendar.opens(), 0);
}

#[tokio::test]
async fn malformed_event_in_window_is_treated_as_busy() {
    let capability = create_capability();
    let calendar = FakeCalendar::new(vec![])
        .with_list_payload(json!({"events": [{"id": "weird", "start": {}, "end": {}}]}));
    let (pipeline, _) = pipeline(&capability, &calendar);

    let state = pipeline.run("Schedule Team Sync").await.expect("run");

    assert_eq!(calendar.mutating_calls(), 0);
    assert!(state.conflict.expect("report").conflict);
    assert!(!state.validation.expect("validation").is_valid());
}

#[tokio::test]
async fn transport_failure_yields_error_envelope_and_closes_once() {
    let capability = create_capability();
    let calendar = FakeCalendar::new(vec![]).failing_on("create_event");
    let (pipeline, _) = pipeline(&capability, &calendar);

    let response = pipeline.submit_query("Schedule Team Sync").await;

    assert!(response.response.is_none());
    assert!(response.error.expect("error").contains("Transport error"));
    // One session for the conflict check, one for the action; each closed exactly once.
    assert_eq!(calendar.opens(), 2);
    assert_eq!(calendar.closes(), 2);
}

#[tokio::test]
async fn list_request_passes_window_through() {
    let capability = ScriptedCapability::new()
        .intent(r#"{"intent": "list"}"#)
        .data(r#"{"time_min": "2025-09-25T00:00:00Z", "time_max": "2025-09-26T00:00:00Z"}"#)
        .validation(r#"{"valid": true}"#)
        .feedback("You have one event: Standup.");
    let calendar = FakeCalendar::new(vec![timed_event(
        "standup",
        "Standup",
        "2025-09-25T09:00:00Z",
        "2025-09-25T09:15:00Z",
    )]);
    let (pipeline, _) = pipeline(&capability, &calendar);

    let state = pipeline.run("What's on my calendar on the 25th?").await.expect("run");

    assert_eq!(state.intent(), Some(Intent::ListEvents));
    assert_eq!(calendar.tool_calls(), vec!["list_events"]);
    match state.action_result.expect("result") {
        ActionResult::Executed { result, .. } => assert_eq!(result["events"][0]["id"], "standup"),
        other => panic!("expected execution, got {other:?}"),
    }
}

#[tokio::test]
async fn update_ignores_its_own_slot_when_checking_conflicts() {
    let capability = ScriptedCapability::new()
        .intent(r#"{"intent": "update_event"}"#)
        .data(r#"{"event_id": "sync", "start": "2025-09-25T10:30:00Z", "end": "2025-09-25T11:30:00Z"}"#)
        .validation(r#"{"valid": true, "errors": []}"#)
        .feedback("Moved Team Sync to 10:30.");
    let calendar = FakeCalendar::new(vec![timed_event(
        "sync",
        "Team Sync",
        "2025-09-25T10:00:00Z",
        "2025-09-25T11:00:00Z",
    )]);
    let (pipeline, _) = pipeline(&capability, &calendar);

    pipeline.run("Push Team Sync back 30 minutes").await.expect("run");

    assert_eq!(calendar.tool_calls(), vec!["list_events", "update_event"]);
    assert_eq!(
        calendar.events()[0].start.date_time.as_deref(),
        Some("2025-09-25T10:30:00Z")
    );
}

#[tokio::test]
async fn finished_request_leaves_no_checkpoint_to_resume() {
    let capability = create_capability();
    let calendar = FakeCalendar::new(vec![]);
    let (pipeline, checkpoints) = pipeline(&capability, &calendar);

    let state = pipeline.run("Schedule Team Sync").await.expect("run");

    assert!(checkpoints.load(state.request_id).await.expect("load").is_none());
    assert!(checkpoints.is_empty());

    let err = pipeline.resume(state.request_id).await.expect_err("nothing to resume");
    assert!(matches!(err, CalPilotError::InvalidInput(_)), "got {err:?}");
    assert_eq!(calendar.mutating_calls(), 1, "resuming a finished request must not re-run it");
}

#[tokio::test]
async fn resume_continues_from_partial_checkpoint() {
    let capability = create_capability();
    let calendar = FakeCalendar::new(vec![]);
    let (pipeline, checkpoints) = pipeline(&capability, &calendar);

    let mut partial = calpilot_domain::RequestState::new("Schedule Team Sync");
    partial.set_intent(Intent::CreateEvent);
    checkpoints.save(Stage::Intent, &partial).await.expect("seed checkpoint");

    let state = pipeline.resume(partial.request_id).await.expect("resume");

    assert!(capability.calls_of(PromptKind::Intent).is_empty());
    assert_eq!(state.intent(), Some(Intent::CreateEvent));
    assert_eq!(calendar.events().len(), 1);
}

#[tokio::test]
async fn blank_query_is_rejected_at_the_boundary() {
    let capability = create_capability();
    let calendar = FakeCalendar::new(vec![]);
    let (pipeline, _) = pipeline(&capability, &calendar);

    let response = pipeline.submit_query("   ").await;

    assert!(response.response.is_none());
    assert!(capability.calls().is_empty());
}

#[tokio::test]
async fn feedback_falls_back_when_capability_fails() {
    let capability = ScriptedCapability::new()
        .intent(r#"{"intent": "create_event"}"#)
        .data(CREATE_DATA)
        .validation(r#"{"valid": true, "errors": []}"#);
    let calendar = FakeCalendar::new(vec![]);
    let (pipeline, _) = pipeline(&capability, &calendar);

    let response = pipeline.submit_query("Schedule Team Sync").await;

    assert_eq!(response.response.as_deref(), Some("Created 'Team Sync'."));
}

#[tokio::test]
async fn concurrent_overlapping_creates_both_land() {
    // Read-then-write race: both checks see a free calendar before either
    // create is applied, so both events are written.
    let capability = create_capability();
    let calendar = FakeCalendar::new(vec![]).with_create_barrier(2);
    let (pipeline, _) = pipeline(&capability, &calendar);
    let pipeline = Arc::new(pipeline);

    let first = tokio::spawn({
        let pipeline = Arc::clone(&pipeline);
        async move { pipeline.submit_query("Schedule Team Sync").await }
    });
    let second = tokio::spawn({
        let pipeline = Arc::clone(&pipeline);
        async move { pipeline.submit_query("Schedule Team Sync again").await }
    });

    let (first, second) = (first.await.expect("join"), second.await.expect("join"));
    assert!(first.error.is_none() && second.error.is_none());
    assert_eq!(calendar.events().len(), 2);
}
