//! quiz-ui library - local quiz service
//!
//! Hosts one quiz session for the browser front-end: step navigation,
//! submission, the stored analysis and a live analytics event stream.

use std::sync::Arc;

use axum::Router;
use quiz_common::collection::CollectionEndpoint;
use quiz_common::location::GeoLookup;
use quiz_common::pipeline::PipelineSettings;
use quiz_common::session::SessionStore;
use quiz_common::{EventBus, EventSink, QuizDefinition, StepController, SubmissionPipeline};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;

/// Event bus capacity per SSE subscriber
pub const EVENT_BUS_CAPACITY: usize = 100;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub definition: Arc<QuizDefinition>,
    /// Navigation state; one quiz session per service
    pub controller: Arc<Mutex<StepController>>,
    pub pipeline: Arc<SubmissionPipeline>,
    pub session: Arc<SessionStore>,
    pub events: Arc<EventBus>,
}

impl AppState {
    /// Wire controller and pipeline to one event bus and session store
    pub fn new(
        definition: QuizDefinition,
        geo: Arc<dyn GeoLookup>,
        endpoint: Arc<dyn CollectionEndpoint>,
        settings: PipelineSettings,
    ) -> Self {
        let definition = Arc::new(definition);
        let events = Arc::new(EventBus::new(EVENT_BUS_CAPACITY));
        let sink: Arc<dyn EventSink> = events.clone();
        let session = Arc::new(SessionStore::new());

        let controller = StepController::new(definition.clone(), sink.clone());
        let pipeline = SubmissionPipeline::new(
            definition.clone(),
            geo,
            endpoint,
            sink,
            session.clone(),
            settings,
        );

        Self {
            definition,
            controller: Arc::new(Mutex::new(controller)),
            pipeline: Arc::new(pipeline),
            session,
            events,
        }
    }

    pub fn sink(&self) -> &dyn EventSink {
        self.events.as_ref()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let quiz = Router::new()
        .route("/api/quiz", get(api::get_quiz_state))
        .route("/api/quiz/definition", get(api::get_definition))
        .route("/api/quiz/load", post(api::load_page))
        .route("/api/quiz/start", post(api::start_quiz))
        .route("/api/quiz/step/:n", post(api::go_to_step))
        .route("/api/quiz/next", post(api::next_step))
        .route("/api/quiz/prev", post(api::prev_step))
        .route("/api/quiz/submit", post(api::submit_quiz))
        .route("/api/results", get(api::get_results))
        .route("/api/events", get(api::event_stream))
        .route("/api/buildinfo", get(api::get_build_info));

    Router::new()
        .merge(quiz)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        // Quiz pages may be hosted on a different origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
