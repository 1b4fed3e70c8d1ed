//! In-memory providers and request helpers for route tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chain_chat_core::{
    errors::CoreError,
    models::{chain::Chain, envelope::RequestEnvelope, settings::Settings},
    providers::traits::{BlockchainDataProvider, LanguageModel},
    ChainChat,
};
use serde_json::Value;
use tower::ServiceExt;

use super::{router, AppState};

pub const EVM_ADDR: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";
pub const XRPL_ADDR: &str = "rN7n7otQDd6FczFgLdSqtcsAUxDkw6fzRH";

/// Answers every request with one body and keeps what it was sent.
pub struct RecordingProvider {
    body: Value,
    calls: Mutex<Vec<RequestEnvelope>>,
}

impl RecordingProvider {
    pub fn new(body: Value) -> Arc<Self> {
        Arc::new(Self {
            body,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RequestEnvelope> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlockchainDataProvider for RecordingProvider {
    fn name(&self) -> &str {
        "Recording"
    }

    async fn send(&self, request: &RequestEnvelope) -> Result<Value, CoreError> {
        self.calls.lock().unwrap().push(request.clone());
        Ok(self.body.clone())
    }
}

/// Replies in order; errors once the script runs out.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedLlm {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
        })
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, CoreError> {
        self.replies.lock().unwrap().pop_front().ok_or(CoreError::Api {
            provider: "Scripted".into(),
            status: Some(500),
            message: "no more replies".into(),
        })
    }
}

pub fn app(
    data: Arc<dyn BlockchainDataProvider>,
    llm: Arc<dyn LanguageModel>,
    default_chain: Chain,
) -> Router {
    let settings = Settings {
        data_api_key: Some("test-key".into()),
        llm_api_key: Some("test-llm-key".into()),
        default_chain,
        ..Settings::default()
    };
    let chat = ChainChat::with_providers(Arc::new(settings), data, llm);
    router(AppState {
        chat: Arc::new(chat),
    })
}

/// Sends one request through `app` and returns the status and JSON body.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if body.is_some() {
        request = request.header("content-type", "application/json");
    }
    let request = request
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}
