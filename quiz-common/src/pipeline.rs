//! Submission pipeline
//!
//! Turns a completed form into one transmitted record and resolves the
//! visible outcome. Sequence per submission:
//!
//! 1. final validation of every step (nothing happens on failure)
//! 2. resubmission guard set, view switched to `Processing`
//! 3. `quiz_completed` emitted
//! 4. answer record built from the whole form
//! 5. location lookup (bounded, failures become "unknown")
//! 6. payload assembled and POSTed once
//! 7. success: navigate (thank-you view, or store analysis then results view)
//! 8. failure: `analysis_error` emitted, form restored, guard released

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::collection::CollectionEndpoint;
use crate::events::{EventSink, QuizEvent};
use crate::form::{AnswerRecord, FormValues};
use crate::location::{resolve_location, GeoLookup, LocationInfo, DEFAULT_LOOKUP_TIMEOUT_MS};
use crate::payload::{SubmissionPayload, DEFAULT_SOURCE_TAG};
use crate::session::{SessionStore, SubmissionResult};
use crate::steps::QuizDefinition;
use crate::{TransmissionError, ValidationFailure};

// Resubmission guard states
const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const FINISHED: u8 = 2;

/// Default fallback contact named in the failure message
pub const DEFAULT_SUPPORT_EMAIL: &str = "support@trustfunnels.com";

/// How an acknowledged response is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Body ignored; go to the thank-you view
    #[default]
    Redirect,
    /// Body is a JSON analysis; store it and go to the results view
    Analysis,
}

/// Pipeline tunables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub response_mode: ResponseMode,
    pub source_tag: String,
    pub support_email: String,
    pub thank_you_view: String,
    pub results_view: String,
    pub lookup_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            response_mode: ResponseMode::Redirect,
            source_tag: DEFAULT_SOURCE_TAG.to_string(),
            support_email: DEFAULT_SUPPORT_EMAIL.to_string(),
            thank_you_view: "thank-you.html".to_string(),
            results_view: "results.html".to_string(),
            lookup_timeout: Duration::from_millis(DEFAULT_LOOKUP_TIMEOUT_MS),
        }
    }
}

impl PipelineSettings {
    /// Message shown after a failed submission
    pub fn failure_message(&self) -> String {
        format!(
            "Something went wrong. Please try again or email us at {}",
            self.support_email
        )
    }
}

/// What the front-end should currently display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState {
    /// Quiz form visible and submittable
    Form,
    /// Loading indicator; form hidden
    Processing,
    /// Session finished; front-end moves to `view`
    Navigated { view: String },
}

/// Terminal outcome of a submission attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Record accepted; navigate to `view`
    Navigate { view: String },
    /// Record not accepted; form restored for another try
    Restored { message: String, error: String },
}

/// Reasons a submission never started
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("A submission is already in progress")]
    AlreadySubmitting,
}

/// Orchestrates enrichment, transmission and the resulting outcome
pub struct SubmissionPipeline {
    definition: Arc<QuizDefinition>,
    geo: Arc<dyn GeoLookup>,
    endpoint: Arc<dyn CollectionEndpoint>,
    sink: Arc<dyn EventSink>,
    session: Arc<SessionStore>,
    settings: PipelineSettings,
    /// `IDLE`, `RUNNING` or `FINISHED`
    guard: AtomicU8,
    view: RwLock<ViewState>,
}

impl SubmissionPipeline {
    pub fn new(
        definition: Arc<QuizDefinition>,
        geo: Arc<dyn GeoLookup>,
        endpoint: Arc<dyn CollectionEndpoint>,
        sink: Arc<dyn EventSink>,
        session: Arc<SessionStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            definition,
            geo,
            endpoint,
            sink,
            session,
            settings,
            guard: AtomicU8::new(IDLE),
            view: RwLock::new(ViewState::Form),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn view_state(&self) -> ViewState {
        self.view.read().await.clone()
    }

    /// Whether a submission is running or has already completed
    pub fn is_locked(&self) -> bool {
        self.guard.load(Ordering::Acquire) != IDLE
    }

    /// Whether a submission is waiting on enrichment or transmission
    pub fn is_running(&self) -> bool {
        self.guard.load(Ordering::Acquire) == RUNNING
    }

    /// Return to a fresh, submittable form
    ///
    /// Refused while a submission is running; it must reach its terminal
    /// outcome first.
    pub async fn reset(&self) -> Result<(), SubmitError> {
        // View lock held across the guard change so a new run cannot set
        // `Processing` in between
        let mut view = self.view.write().await;
        match self
            .guard
            .compare_exchange(FINISHED, IDLE, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) | Err(IDLE) => {
                *view = ViewState::Form;
                Ok(())
            }
            Err(_) => {
                debug!("Reset refused, submission in progress");
                Err(SubmitError::AlreadySubmitting)
            }
        }
    }

    /// Run one submission to a terminal outcome
    ///
    /// Returns `Err` only when the submission never started (invalid form or
    /// another submission holding the guard). Every failure after that point
    /// is reported as [`SubmissionOutcome::Restored`].
    pub async fn submit(&self, values: FormValues) -> Result<SubmissionOutcome, SubmitError> {
        self.definition.validate_all(&values)?;

        // Guard is taken before the first await
        if self
            .guard
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Submission rejected, another one holds the guard");
            return Err(SubmitError::AlreadySubmitting);
        }

        *self.view.write().await = ViewState::Processing;
        self.sink.emit(QuizEvent::QuizCompleted);

        let answers = AnswerRecord::from_form(&values);
        let email = answers
            .get(self.definition.email_field())
            .unwrap_or_default()
            .to_string();

        let location = resolve_location(self.geo.as_ref(), self.settings.lookup_timeout).await;

        match self.transmit(answers, &location, &email).await {
            Ok(view) => {
                info!(view = %view, "Submission accepted");
                *self.view.write().await = ViewState::Navigated { view: view.clone() };
                self.guard.store(FINISHED, Ordering::Release);
                Ok(SubmissionOutcome::Navigate { view })
            }
            Err(e) => {
                error!(error = %e, "Error submitting form");
                self.sink.emit(QuizEvent::AnalysisError {
                    error_message: e.to_string(),
                });
                *self.view.write().await = ViewState::Form;
                self.guard.store(IDLE, Ordering::Release);
                Ok(SubmissionOutcome::Restored {
                    message: self.settings.failure_message(),
                    error: e.to_string(),
                })
            }
        }
    }

    /// Assemble, send and interpret the response; returns the view to show
    async fn transmit(
        &self,
        answers: AnswerRecord,
        location: &LocationInfo,
        email: &str,
    ) -> Result<String, TransmissionError> {
        let payload =
            SubmissionPayload::assemble(answers, location, &self.settings.source_tag, Utc::now())
                .map_err(|e| TransmissionError::Payload(e.to_string()))?;

        debug!(fields = payload.len(), "Submitting data");
        let response = self.endpoint.submit(&payload).await?;

        match self.settings.response_mode {
            ResponseMode::Redirect => Ok(self.settings.thank_you_view.clone()),
            ResponseMode::Analysis => {
                let analysis: serde_json::Value = serde_json::from_str(&response.body)
                    .map_err(|e| TransmissionError::Parse(e.to_string()))?;

                self.session
                    .store_result(&SubmissionResult {
                        analysis,
                        email: email.to_string(),
                    })
                    .await;
                self.sink.emit(QuizEvent::AnalysisComplete { success: true });

                Ok(self.settings.results_view.clone())
            }
        }
    }
}
