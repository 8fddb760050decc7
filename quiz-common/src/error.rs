//! Common error types for the quiz
//!
//! Three failure classes reach callers:
//! - [`ValidationFailure`]: a required field is unmet; blocks navigation, no network activity
//! - [`TransmissionError`]: the collection endpoint rejected or never received the record
//! - [`Error`]: configuration and definition problems detected before any quiz runs
//!
//! Geolocation failures never appear here; they degrade to sentinel values
//! inside [`crate::location`].

use serde::Serialize;
use thiserror::Error;

/// Common result type for quiz operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown when the active step has unmet required fields
pub const VALIDATION_MESSAGE: &str = "Please answer this question before continuing.";

/// Common error types across the quiz crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Quiz definition violates numbering or naming rules
    #[error("Invalid quiz definition: {0}")]
    InvalidDefinition(String),

    /// Requested step index outside 1..=total
    #[error("Step {requested} out of range (1..={total})")]
    StepOutOfRange { requested: usize, total: usize },

    /// An answer field shares its name with a location or metadata field
    #[error("Field name collision in submission payload: {0}")]
    FieldCollision(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Required fields unmet on a step
///
/// `fields` lists every failing field name in definition order so the
/// front-end can highlight all of them at once.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("Step {step} has unanswered required fields: {}", fields.join(", "))]
pub struct ValidationFailure {
    /// Step index the failing fields belong to
    pub step: usize,
    /// Names of the failing fields
    pub fields: Vec<String>,
}

impl ValidationFailure {
    /// User-facing message for the failure
    pub fn message(&self) -> &'static str {
        VALIDATION_MESSAGE
    }
}

/// Collection endpoint failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransmissionError {
    /// Request never completed (connect, TLS, body write)
    #[error("Network error: {0}")]
    Network(String),

    /// Endpoint answered with a non-2xx status
    #[error("Submission failed with status {0}")]
    Status(u16),

    /// Success body could not be parsed as JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// Payload could not be assembled or encoded
    #[error("Payload error: {0}")]
    Payload(String),
}
