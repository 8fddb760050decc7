//! Integration tests for the submission pipeline
//!
//! Tests cover:
//! - Location enrichment failure degrades to "unknown" and transmission proceeds
//! - Non-2xx transmission restores the form and writes no session state
//! - Analysis responses are stored with the submitted email
//! - Event ordering (quiz_completed before network, outcome event after)
//! - Resubmission guard against a rapid second trigger or a reset mid-flight
//! - Payload key collisions fail before any network call
//! - Final validation blocks submission without side effects

use async_trait::async_trait;
use quiz_common::collection::{CollectionEndpoint, CollectionResponse};
use quiz_common::location::{GeoLookup, LocationError};
use quiz_common::payload::SubmissionPayload;
use quiz_common::pipeline::{PipelineSettings, ResponseMode};
use quiz_common::session::SessionStore;
use quiz_common::{
    EventLog, FormValues, LocationInfo, QuizDefinition, QuizEvent, SubmissionOutcome,
    SubmissionPipeline, SubmitError, TransmissionError, ViewState,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// =============================================================================
// Test doubles
// =============================================================================

struct FailingLookup;

#[async_trait]
impl GeoLookup for FailingLookup {
    async fn lookup(&self) -> Result<LocationInfo, LocationError> {
        Err(LocationError::Network("dns failure".to_string()))
    }
}

struct FixedLookup(LocationInfo);

#[async_trait]
impl GeoLookup for FixedLookup {
    async fn lookup(&self) -> Result<LocationInfo, LocationError> {
        Ok(self.0.clone())
    }
}

/// Records every payload and answers with a canned result
struct RecordingEndpoint {
    response: Result<CollectionResponse, TransmissionError>,
    received: Mutex<Vec<SubmissionPayload>>,
    /// Events seen by the sink at the moment the request arrived
    events_at_send: Mutex<Vec<QuizEvent>>,
    log: Arc<EventLog>,
}

impl RecordingEndpoint {
    fn new(response: Result<CollectionResponse, TransmissionError>, log: Arc<EventLog>) -> Self {
        Self {
            response,
            received: Mutex::new(Vec::new()),
            events_at_send: Mutex::new(Vec::new()),
            log,
        }
    }

    fn ok(body: &str, log: Arc<EventLog>) -> Self {
        Self::new(
            Ok(CollectionResponse {
                status: 200,
                body: body.to_string(),
            }),
            log,
        )
    }

    fn payloads(&self) -> Vec<SubmissionPayload> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl CollectionEndpoint for RecordingEndpoint {
    async fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<CollectionResponse, TransmissionError> {
        self.received.lock().unwrap().push(payload.clone());
        *self.events_at_send.lock().unwrap() = self.log.events();
        self.response.clone()
    }
}

/// Holds every request until released
struct GatedEndpoint {
    entered: Notify,
    release: Notify,
    calls: AtomicUsize,
}

impl GatedEndpoint {
    fn new() -> Self {
        Self {
            entered: Notify::new(),
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CollectionEndpoint for GatedEndpoint {
    async fn submit(
        &self,
        _payload: &SubmissionPayload,
    ) -> Result<CollectionResponse, TransmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        Ok(CollectionResponse {
            status: 200,
            body: String::new(),
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn complete_form() -> FormValues {
    FormValues::new()
        .with("avatar", "coaches")
        .with("revenue", "10k_50k")
        .with("first_name", "Ann")
        .with("email", "a@b.com")
        .with("niche", "fitness for new parents")
        .with("challenge", "pricing")
        .with("goal", "double revenue")
        .with("timeline", "90_days")
}

struct Harness {
    pipeline: SubmissionPipeline,
    log: Arc<EventLog>,
    session: Arc<SessionStore>,
}

fn harness(
    geo: Arc<dyn GeoLookup>,
    endpoint: Arc<dyn CollectionEndpoint>,
    log: Arc<EventLog>,
    mode: ResponseMode,
) -> Harness {
    let session = Arc::new(SessionStore::new());
    let settings = PipelineSettings {
        response_mode: mode,
        lookup_timeout: Duration::from_millis(500),
        ..Default::default()
    };
    let pipeline = SubmissionPipeline::new(
        Arc::new(QuizDefinition::niche_quiz()),
        geo,
        endpoint,
        log.clone(),
        session.clone(),
        settings,
    );
    Harness {
        pipeline,
        log,
        session,
    }
}

// =============================================================================
// Enrichment
// =============================================================================

#[tokio::test]
async fn test_enrichment_failure_sends_unknown_location() {
    let log = Arc::new(EventLog::new());
    let endpoint = Arc::new(RecordingEndpoint::ok("", log.clone()));
    let h = harness(Arc::new(FailingLookup), endpoint.clone(), log, ResponseMode::Redirect);

    let outcome = h.pipeline.submit(complete_form()).await.unwrap();

    assert_eq!(
        outcome,
        SubmissionOutcome::Navigate {
            view: "thank-you.html".to_string()
        }
    );
    let payloads = endpoint.payloads();
    assert_eq!(payloads.len(), 1);
    let payload = &payloads[0];
    for field in ["ip", "city", "state", "country"] {
        assert_eq!(payload.get(field), Some("unknown"), "field {}", field);
    }
    assert_eq!(payload.get("email"), Some("a@b.com"));
    assert_eq!(payload.get("avatar"), Some("coaches"));
    assert_eq!(payload.get("revenue"), Some("10k_50k"));
    assert_eq!(payload.get("source"), Some("niche-quiz"));
    assert!(payload.get("timestamp").is_some_and(|t| t.ends_with('Z')));
}

#[tokio::test]
async fn test_location_merged_into_payload() {
    let log = Arc::new(EventLog::new());
    let endpoint = Arc::new(RecordingEndpoint::ok("", log.clone()));
    let location = LocationInfo {
        ip: "203.0.113.7".to_string(),
        city: "Austin".to_string(),
        state: "Texas".to_string(),
        country: "United States".to_string(),
    };
    let h = harness(
        Arc::new(FixedLookup(location)),
        endpoint.clone(),
        log,
        ResponseMode::Redirect,
    );

    h.pipeline.submit(complete_form()).await.unwrap();

    let payload = &endpoint.payloads()[0];
    assert_eq!(payload.get("ip"), Some("203.0.113.7"));
    assert_eq!(payload.get("state"), Some("Texas"));
}

#[tokio::test]
async fn test_optional_fields_from_all_steps_are_sent() {
    let log = Arc::new(EventLog::new());
    let endpoint = Arc::new(RecordingEndpoint::ok("", log.clone()));
    let h = harness(Arc::new(FailingLookup), endpoint.clone(), log, ResponseMode::Redirect);

    let form = complete_form().with("notes", "").with("referral", "podcast");
    h.pipeline.submit(form).await.unwrap();

    let payload = &endpoint.payloads()[0];
    assert_eq!(payload.get("notes"), Some(""));
    assert_eq!(payload.get("referral"), Some("podcast"));
}

// =============================================================================
// Transmission failure
// =============================================================================

#[tokio::test]
async fn test_http_500_restores_form_without_session_state() {
    let log = Arc::new(EventLog::new());
    let endpoint = Arc::new(RecordingEndpoint::new(
        Err(TransmissionError::Status(500)),
        log.clone(),
    ));
    let h = harness(Arc::new(FailingLookup), endpoint, log, ResponseMode::Analysis);

    let outcome = h.pipeline.submit(complete_form()).await.unwrap();

    match outcome {
        SubmissionOutcome::Restored { message, error } => {
            assert!(message.contains("support@trustfunnels.com"));
            assert!(error.contains("500"));
        }
        other => panic!("Expected Restored, got {:?}", other),
    }
    assert_eq!(h.pipeline.view_state().await, ViewState::Form);
    assert!(!h.pipeline.is_locked());
    assert!(h.session.is_empty().await);
    assert_eq!(h.log.count("analysis_error"), 1);
    assert_eq!(h.log.count("analysis_complete"), 0);
}

#[tokio::test]
async fn test_failed_submission_can_be_retried() {
    let log = Arc::new(EventLog::new());
    let failing = Arc::new(RecordingEndpoint::new(
        Err(TransmissionError::Network("connection reset".to_string())),
        log.clone(),
    ));
    let h = harness(Arc::new(FailingLookup), failing.clone(), log, ResponseMode::Redirect);

    h.pipeline.submit(complete_form()).await.unwrap();
    h.pipeline.submit(complete_form()).await.unwrap();

    // Each attempt transmits exactly once; no hidden retry
    assert_eq!(failing.payloads().len(), 2);
    assert_eq!(h.log.count("quiz_completed"), 2);
}

#[tokio::test]
async fn test_unparseable_analysis_body_is_failure() {
    let log = Arc::new(EventLog::new());
    let endpoint = Arc::new(RecordingEndpoint::ok("<html>ok</html>", log.clone()));
    let h = harness(Arc::new(FailingLookup), endpoint, log, ResponseMode::Analysis);

    let outcome = h.pipeline.submit(complete_form()).await.unwrap();

    assert!(matches!(outcome, SubmissionOutcome::Restored { .. }));
    assert!(h.session.analysis().await.is_none());
    assert_eq!(h.pipeline.view_state().await, ViewState::Form);
}

// =============================================================================
// Success variants
// =============================================================================

#[tokio::test]
async fn test_analysis_response_is_persisted_with_email() {
    let log = Arc::new(EventLog::new());
    let endpoint = Arc::new(RecordingEndpoint::ok(r#"{"niche":"fitness"}"#, log.clone()));
    let h = harness(Arc::new(FailingLookup), endpoint, log, ResponseMode::Analysis);

    let outcome = h.pipeline.submit(complete_form()).await.unwrap();

    assert_eq!(
        outcome,
        SubmissionOutcome::Navigate {
            view: "results.html".to_string()
        }
    );
    assert_eq!(h.session.analysis().await, Some(json!({"niche": "fitness"})));
    assert_eq!(h.session.email().await.as_deref(), Some("a@b.com"));
    assert_eq!(
        h.log.events().last(),
        Some(&QuizEvent::AnalysisComplete { success: true })
    );
    assert_eq!(
        h.pipeline.view_state().await,
        ViewState::Navigated {
            view: "results.html".to_string()
        }
    );
}

#[tokio::test]
async fn test_redirect_mode_ignores_body_and_session() {
    let log = Arc::new(EventLog::new());
    let endpoint = Arc::new(RecordingEndpoint::ok("Accepted", log.clone()));
    let h = harness(Arc::new(FailingLookup), endpoint, log, ResponseMode::Redirect);

    let outcome = h.pipeline.submit(complete_form()).await.unwrap();

    assert!(matches!(
        outcome,
        SubmissionOutcome::Navigate { ref view } if view == "thank-you.html"
    ));
    assert!(h.session.is_empty().await);
    assert_eq!(h.log.count("analysis_complete"), 0);
}

#[tokio::test]
async fn test_quiz_completed_emitted_before_transmission() {
    let log = Arc::new(EventLog::new());
    let endpoint = Arc::new(RecordingEndpoint::ok("", log.clone()));
    let h = harness(Arc::new(FailingLookup), endpoint.clone(), log, ResponseMode::Redirect);

    h.pipeline.submit(complete_form()).await.unwrap();

    let at_send = endpoint.events_at_send.lock().unwrap().clone();
    assert_eq!(at_send, vec![QuizEvent::QuizCompleted]);
}

// =============================================================================
// Guard and validation
// =============================================================================

#[tokio::test]
async fn test_second_submit_while_in_flight_is_rejected() {
    let log = Arc::new(EventLog::new());
    let endpoint = Arc::new(GatedEndpoint::new());
    let h = Arc::new(harness(
        Arc::new(FailingLookup),
        endpoint.clone(),
        log,
        ResponseMode::Redirect,
    ));

    let first = {
        let h = h.clone();
        tokio::spawn(async move { h.pipeline.submit(complete_form()).await })
    };

    endpoint.entered.notified().await;
    assert_eq!(h.pipeline.view_state().await, ViewState::Processing);
    assert_eq!(
        h.pipeline.submit(complete_form()).await,
        Err(SubmitError::AlreadySubmitting)
    );

    endpoint.release.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Navigate { .. }));
    assert_eq!(h.log.count("quiz_completed"), 1);
}

#[tokio::test]
async fn test_reset_is_refused_while_submission_in_flight() {
    let log = Arc::new(EventLog::new());
    let endpoint = Arc::new(GatedEndpoint::new());
    let h = Arc::new(harness(
        Arc::new(FailingLookup),
        endpoint.clone(),
        log,
        ResponseMode::Redirect,
    ));

    let first = {
        let h = h.clone();
        tokio::spawn(async move { h.pipeline.submit(complete_form()).await })
    };

    endpoint.entered.notified().await;
    assert!(h.pipeline.is_running());
    assert_eq!(h.pipeline.reset().await, Err(SubmitError::AlreadySubmitting));
    assert_eq!(h.pipeline.view_state().await, ViewState::Processing);
    assert_eq!(
        h.pipeline.submit(complete_form()).await,
        Err(SubmitError::AlreadySubmitting)
    );

    endpoint.release.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Navigate { .. }));
    assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
    assert!(!h.pipeline.is_running());
    assert!(h.pipeline.is_locked());

    // Terminal outcome reached; reset is allowed again
    assert!(h.pipeline.reset().await.is_ok());
    assert!(!h.pipeline.is_locked());
}

#[tokio::test]
async fn test_completed_session_stays_locked_until_reset() {
    let log = Arc::new(EventLog::new());
    let endpoint = Arc::new(RecordingEndpoint::ok("", log.clone()));
    let h = harness(Arc::new(FailingLookup), endpoint, log, ResponseMode::Redirect);

    h.pipeline.submit(complete_form()).await.unwrap();
    assert_eq!(
        h.pipeline.submit(complete_form()).await,
        Err(SubmitError::AlreadySubmitting)
    );

    h.pipeline.reset().await.unwrap();
    assert_eq!(h.pipeline.view_state().await, ViewState::Form);
    assert!(h.pipeline.submit(complete_form()).await.is_ok());
}

#[tokio::test]
async fn test_incomplete_form_is_rejected_without_side_effects() {
    let log = Arc::new(EventLog::new());
    let endpoint = Arc::new(RecordingEndpoint::ok("", log.clone()));
    let h = harness(Arc::new(FailingLookup), endpoint.clone(), log, ResponseMode::Redirect);

    let form = complete_form().with("goal", "  ");
    let result = h.pipeline.submit(form).await;

    match result {
        Err(SubmitError::Validation(failure)) => {
            assert_eq!(failure.step, 6);
            assert_eq!(failure.fields, vec!["goal".to_string()]);
        }
        other => panic!("Expected validation failure, got {:?}", other),
    }
    assert!(endpoint.payloads().is_empty());
    assert!(h.log.events().is_empty());
    assert!(!h.pipeline.is_locked());
}

// =============================================================================
// Payload assembly
// =============================================================================

#[tokio::test]
async fn test_reserved_key_in_answers_restores_without_network_call() {
    let log = Arc::new(EventLog::new());
    let endpoint = Arc::new(RecordingEndpoint::ok("", log.clone()));
    let h = harness(Arc::new(FailingLookup), endpoint.clone(), log, ResponseMode::Analysis);

    let outcome = h.pipeline.submit(complete_form().with("city", "X")).await.unwrap();

    match outcome {
        SubmissionOutcome::Restored { error, .. } => assert!(error.contains("city")),
        other => panic!("Expected Restored, got {:?}", other),
    }
    assert!(endpoint.payloads().is_empty());
    assert_eq!(h.log.count("analysis_error"), 1);
    assert_eq!(h.log.count("analysis_complete"), 0);
    assert!(!h.pipeline.is_locked());
    assert_eq!(h.pipeline.view_state().await, ViewState::Form);
    assert!(h.session.is_empty().await);
}
