//! Quiz navigation and submission API
//!
//! The browser owns the form controls and posts their current values with
//! every forward move and with the final submit; the service owns the step
//! index and everything after submit.

use axum::{
    extract::{Path, State},
    Json,
};
use quiz_common::{
    AdvanceOutcome, FormValues, QuizDefinition, QuizEvent, StepController, StepState,
    SubmissionOutcome, ViewState,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ApiError;
use crate::AppState;

/// Form values posted by the front-end
#[derive(Debug, Default, Deserialize)]
pub struct FormRequest {
    #[serde(default)]
    pub values: FormValues,
}

/// Full render state of the quiz
#[derive(Debug, Serialize)]
pub struct QuizStateResponse {
    pub current_step: usize,
    pub total_steps: usize,
    pub percentage: f64,
    pub steps: Vec<StepState>,
    pub view: ViewState,
}

/// Result of a forward move
#[derive(Debug, Serialize)]
pub struct AdvanceResponse {
    /// `advanced` or `last_step_reached`
    pub outcome: &'static str,
    #[serde(flatten)]
    pub state: QuizStateResponse,
}

async fn snapshot(state: &AppState, controller: &StepController) -> QuizStateResponse {
    let progress = controller.progress();
    QuizStateResponse {
        current_step: progress.current_step,
        total_steps: progress.total_steps,
        percentage: progress.percentage,
        steps: controller.step_states(),
        view: state.pipeline.view_state().await,
    }
}

/// GET /api/quiz
pub async fn get_quiz_state(State(state): State<AppState>) -> Json<QuizStateResponse> {
    let controller = state.controller.lock().await;
    Json(snapshot(&state, &controller).await)
}

/// GET /api/quiz/definition
pub async fn get_definition(State(state): State<AppState>) -> Json<QuizDefinition> {
    Json(state.definition.as_ref().clone())
}

/// POST /api/quiz/load
///
/// Page (re)load: back to step 1 with a fresh form and empty session.
/// 409 while a submission is still running; nothing is reset then.
pub async fn load_page(
    State(state): State<AppState>,
) -> Result<Json<QuizStateResponse>, ApiError> {
    let mut controller = state.controller.lock().await;
    state.pipeline.reset().await?;
    controller.reset();
    state.session.clear().await;
    state.sink().emit(QuizEvent::PageLoaded);
    Ok(Json(snapshot(&state, &controller).await))
}

/// POST /api/quiz/start
pub async fn start_quiz(State(state): State<AppState>) -> Json<QuizStateResponse> {
    state.sink().emit(QuizEvent::QuizStarted);
    let controller = state.controller.lock().await;
    Json(snapshot(&state, &controller).await)
}

/// POST /api/quiz/step/:n
///
/// Direct jump without validation. 400 when `n` is outside the quiz.
pub async fn go_to_step(
    State(state): State<AppState>,
    Path(n): Path<usize>,
) -> Result<Json<QuizStateResponse>, ApiError> {
    let mut controller = state.controller.lock().await;
    controller.go_to_step(n)?;
    Ok(Json(snapshot(&state, &controller).await))
}

/// POST /api/quiz/next
///
/// Validates the active step against the posted values. 422 with the
/// failing field names when a required answer is missing.
pub async fn next_step(
    State(state): State<AppState>,
    Json(request): Json<FormRequest>,
) -> Result<Json<AdvanceResponse>, ApiError> {
    let mut controller = state.controller.lock().await;
    let outcome = controller.advance(&request.values)?;
    let outcome = match outcome {
        AdvanceOutcome::Advanced(_) => "advanced",
        AdvanceOutcome::LastStepReached(_) => "last_step_reached",
    };
    Ok(Json(AdvanceResponse {
        outcome,
        state: snapshot(&state, &controller).await,
    }))
}

/// POST /api/quiz/prev
pub async fn prev_step(State(state): State<AppState>) -> Json<QuizStateResponse> {
    let mut controller = state.controller.lock().await;
    controller.retreat();
    Json(snapshot(&state, &controller).await)
}

/// POST /api/quiz/submit
///
/// Runs the submission pipeline to its terminal outcome. Transmission
/// failures are a normal 200 response with outcome `restored`; only an
/// invalid form (422) or a duplicate submit (409) are errors.
pub async fn submit_quiz(
    State(state): State<AppState>,
    Json(request): Json<FormRequest>,
) -> Result<Json<SubmissionOutcome>, ApiError> {
    info!(fields = request.values.len(), "Quiz submitted");
    let outcome = state.pipeline.submit(request.values).await?;
    Ok(Json(outcome))
}
