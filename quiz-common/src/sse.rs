//! Server-Sent Events (SSE) utilities
//!
//! Streams quiz analytics events to connected clients.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::events::QuizEvent;

/// Turn a quiz event into an SSE frame (`event:` name, `data:` JSON record)
pub fn to_sse_event(event: &QuizEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(event.name()).data(data)
}

/// Create an SSE stream forwarding every event from `rx`
///
/// Starts with a `ConnectionStatus` frame. Slow clients that fall behind the
/// channel capacity skip the missed events and keep streaming.
pub fn create_event_sse_stream(
    service_name: &'static str,
    mut rx: broadcast::Receiver<QuizEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} events", service_name);

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    debug!(event = event.name(), "SSE: forwarding event");
                    yield Ok(to_sse_event(&event));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: {} client lagged, skipped {} events", service_name, skipped);
                }
                Err(RecvError::Closed) => {
                    info!("SSE: {} event stream closed", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
