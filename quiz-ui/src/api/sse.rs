//! Server-Sent Events (SSE) for analytics events

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /api/events - live stream of quiz analytics events
///
/// Each frame's `event:` is the event name and `data:` the JSON record
/// (`{"event": ..., ...}`). Only events emitted after connecting are sent.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    quiz_common::sse::create_event_sse_stream("quiz-ui", state.events.subscribe())
}
