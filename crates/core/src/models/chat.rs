use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::chart::ChartConfiguration;

/// Inbound chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    /// Opaque caller-chosen identifier, echoed back.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// What the chat endpoint hands back to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: String,
    pub chart_data: Option<ChartConfiguration>,
    /// Snake-case intent kind, e.g. `"token_balance"`.
    pub intent: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
}
