//! Submission payload assembly

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::form::AnswerRecord;
use crate::location::LocationInfo;
use crate::{Error, Result};

/// Default value of the `source` field
pub const DEFAULT_SOURCE_TAG: &str = "niche-quiz";

/// Field names added to the answers; answer fields may not use them
pub const RESERVED_FIELDS: [&str; 6] = ["ip", "city", "state", "country", "timestamp", "source"];

/// Flat JSON record sent to the collection endpoint
///
/// Answers, location, `timestamp` and `source` share one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubmissionPayload(BTreeMap<String, String>);

impl SubmissionPayload {
    /// Merge answers, location and metadata
    ///
    /// `timestamp` is taken from `now` (the moment of assembly) and rendered
    /// as RFC 3339 UTC with milliseconds. Fails without building anything if
    /// an answer field uses a reserved name.
    pub fn assemble(
        answers: AnswerRecord,
        location: &LocationInfo,
        source: &str,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if let Some(name) = RESERVED_FIELDS.iter().find(|name| answers.contains(name)) {
            return Err(Error::FieldCollision((*name).to_string()));
        }

        let mut fields = answers.into_inner();
        for (name, value) in location.fields() {
            fields.insert(name.to_string(), value.to_string());
        }
        fields.insert(
            "timestamp".to_string(),
            now.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        fields.insert("source".to_string(), source.to_string());

        Ok(Self(fields))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
