use thiserror::Error;

/// Unified error type for the entire chain-chat-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Inbound / Validation ────────────────────────────────────────
    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Unsupported chain: {chain}. Supported chains: {}", supported.join(", "))]
    UnsupportedChain {
        chain: String,
        supported: Vec<String>,
    },

    #[error("Unsupported intent kind: {kind}. Supported kinds: {}", supported.join(", "))]
    UnsupportedIntentKind {
        kind: String,
        supported: Vec<String>,
    },

    #[error("Missing required parameter(s): {}", fields.join(", "))]
    MissingParameter { fields: Vec<String> },

    // ── Data fetch ──────────────────────────────────────────────────
    /// `cause` is kept for logs only and never rendered by `Display`.
    #[error("Failed to fetch data for {subject_address} on {chain}")]
    DataFetchFailed {
        chain: String,
        subject_address: String,
        cause: String,
        upstream_status: Option<u16>,
    },

    // ── LLM ─────────────────────────────────────────────────────────
    #[error("Intent extraction failed: {0}")]
    IntentExtractionFailed(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl CoreError {
    /// Shorthand for a single-field validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing(fields: &[&str]) -> Self {
        CoreError::MissingParameter {
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// HTTP-equivalent status class for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::Validation { .. }
            | CoreError::UnsupportedChain { .. }
            | CoreError::UnsupportedIntentKind { .. }
            | CoreError::MissingParameter { .. } => 400,
            CoreError::DataFetchFailed {
                upstream_status, ..
            } => match upstream_status {
                Some(status) if (400..600).contains(status) => *status,
                _ => 502,
            },
            _ => 500,
        }
    }

    /// Stable machine-readable code, used by the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation { .. } => "VALIDATION_ERROR",
            CoreError::UnsupportedChain { .. } => "UNSUPPORTED_CHAIN",
            CoreError::UnsupportedIntentKind { .. } => "UNSUPPORTED_INTENT_KIND",
            CoreError::MissingParameter { .. } => "MISSING_PARAMETER",
            CoreError::DataFetchFailed { .. } => "DATA_FETCH_FAILED",
            CoreError::IntentExtractionFailed(_) => "INTENT_EXTRACTION_FAILED",
            CoreError::Api { .. } => "EXTERNAL_API_ERROR",
            CoreError::Network(_) => "NETWORK_ERROR",
            CoreError::Deserialization(_) => "DESERIALIZATION_ERROR",
        }
    }

    /// Upstream HTTP status carried by provider errors, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            CoreError::Api { status, .. } => *status,
            CoreError::DataFetchFailed {
                upstream_status, ..
            } => *upstream_status,
            _ => None,
        }
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors often contain full URLs; strip the query so a key
        // passed as a query parameter never ends up in a log line.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        match e.status() {
            Some(status) => CoreError::Api {
                provider: "http".into(),
                status: Some(status.as_u16()),
                message: sanitized,
            },
            None => CoreError::Network(sanitized),
        }
    }
}
