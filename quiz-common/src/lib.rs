//! # Quiz Common Library
//!
//! Domain core of the multi-step quiz:
//! - Quiz definition (steps and their required fields)
//! - Step controller (validated forward navigation, progress)
//! - Submission pipeline (location enrichment, transmission, outcome)
//! - Analytics events and sinks
//! - Session-scoped result storage
//! - Configuration loading

pub mod collection;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod form;
pub mod location;
pub mod payload;
pub mod pipeline;
pub mod session;
pub mod sse;
pub mod steps;

pub use controller::{AdvanceOutcome, Progress, StepController, StepState};
pub use error::{Error, Result, TransmissionError, ValidationFailure};
pub use events::{EventBus, EventLog, EventSink, QuizEvent};
pub use form::{AnswerRecord, FormValues};
pub use location::LocationInfo;
pub use pipeline::{SubmissionOutcome, SubmissionPipeline, SubmitError, ViewState};
pub use steps::QuizDefinition;
