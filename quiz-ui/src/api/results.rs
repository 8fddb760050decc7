//! Stored analysis for the results view

use axum::{extract::State, Json};
use quiz_common::session::SubmissionResult;

use super::ApiError;
use crate::AppState;

/// GET /api/results
///
/// Returns the analysis stored by the last successful submission together
/// with the email it was submitted under.
pub async fn get_results(
    State(state): State<AppState>,
) -> Result<Json<SubmissionResult>, ApiError> {
    state
        .session
        .result()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No analysis stored for this session".to_string()))
}
