//! Session-scoped persisted state
//!
//! Holds values handed from the quiz to a later view (the results page).
//! Lives only as long as the hosting session; nothing is written to disk.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

/// Key of the analysis object returned by the collection endpoint
pub const ANALYSIS_KEY: &str = "quiz_analysis";

/// Key of the email submitted with the analysis
pub const EMAIL_KEY: &str = "user_email";

/// Analysis payload paired with the email it was requested for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionResult {
    pub analysis: Value,
    pub email: String,
}

/// Key/value store cleared at session end
#[derive(Default)]
pub struct SessionStore {
    items: RwLock<HashMap<String, Value>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_item(&self, key: &str) -> Option<Value> {
        self.items.read().await.get(key).cloned()
    }

    pub async fn set_item(&self, key: impl Into<String>, value: Value) {
        self.items.write().await.insert(key.into(), value);
    }

    pub async fn remove_item(&self, key: &str) -> Option<Value> {
        self.items.write().await.remove(key)
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Drop every stored value
    pub async fn clear(&self) {
        self.items.write().await.clear();
    }

    /// Persist an analysis and its email under the well-known keys
    pub async fn store_result(&self, result: &SubmissionResult) {
        let mut items = self.items.write().await;
        items.insert(ANALYSIS_KEY.to_string(), result.analysis.clone());
        items.insert(EMAIL_KEY.to_string(), Value::String(result.email.clone()));
    }

    /// Stored analysis, if any
    pub async fn analysis(&self) -> Option<Value> {
        self.get_item(ANALYSIS_KEY).await
    }

    /// Stored email, if any
    pub async fn email(&self) -> Option<String> {
        match self.get_item(EMAIL_KEY).await {
            Some(Value::String(email)) => Some(email),
            _ => None,
        }
    }

    /// Analysis and email together; `None` unless both are present
    pub async fn result(&self) -> Option<SubmissionResult> {
        let items = self.items.read().await;
        let analysis = items.get(ANALYSIS_KEY)?.clone();
        let email = items.get(EMAIL_KEY)?.as_str()?.to_string();
        Some(SubmissionResult { analysis, email })
    }
}
