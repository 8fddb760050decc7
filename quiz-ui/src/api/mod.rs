//! HTTP API handlers for quiz-ui

pub mod buildinfo;
pub mod error;
pub mod health;
pub mod quiz;
pub mod results;
pub mod sse;

pub use buildinfo::get_build_info;
pub use error::ApiError;
pub use health::health_routes;
pub use quiz::{
    get_definition, get_quiz_state, go_to_step, load_page, next_step, prev_step, start_quiz,
    submit_quiz,
};
pub use results::get_results;
pub use sse::event_stream;
