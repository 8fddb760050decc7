//! Analytics events and the sinks that receive them
//!
//! Events are fire-and-forget: emitting never fails and never blocks the
//! quiz. The wire form is a flat record `{"event": <name>, ...data}`, the
//! shape tag-manager style data layers expect.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Quiz analytics events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QuizEvent {
    /// Landing page finished loading
    PageLoaded,

    /// User asked to start the quiz
    QuizStarted,

    /// Contact email accepted at the lead capture step
    LeadCaptured {
        #[serde(rename = "user_email")]
        email: String,
    },

    /// Final submit fired, before any network activity
    QuizCompleted,

    /// Analysis response received and stored
    AnalysisComplete { success: bool },

    /// Submission failed; the form was restored
    AnalysisError { error_message: String },
}

impl QuizEvent {
    /// Event name as it appears in the `event` field
    pub fn name(&self) -> &'static str {
        match self {
            QuizEvent::PageLoaded => "page_loaded",
            QuizEvent::QuizStarted => "quiz_started",
            QuizEvent::LeadCaptured { .. } => "lead_captured",
            QuizEvent::QuizCompleted => "quiz_completed",
            QuizEvent::AnalysisComplete { .. } => "analysis_complete",
            QuizEvent::AnalysisError { .. } => "analysis_error",
        }
    }
}

/// Destination for analytics events
pub trait EventSink: Send + Sync {
    /// Record an event; must not fail or block
    fn emit(&self, event: QuizEvent);
}

/// Broadcast sink feeding live subscribers (SSE clients)
///
/// Events emitted while nobody is subscribed are dropped with a warning.
pub struct EventBus {
    tx: broadcast::Sender<QuizEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<QuizEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: QuizEvent) {
        let name = event.name();
        match self.tx.send(event) {
            Ok(receivers) => debug!(event = name, receivers, "Tracked event"),
            Err(_) => warn!(event = name, "No event subscribers, event not tracked"),
        }
    }
}

/// Append-only in-memory event log
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<QuizEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event recorded so far, oldest first
    pub fn events(&self) -> Vec<QuizEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of recorded events with the given name
    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name() == name).count()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: QuizEvent) {
        debug!(event = event.name(), "Tracked event");
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
