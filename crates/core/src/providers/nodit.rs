use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::traits::BlockchainDataProvider;
use crate::errors::CoreError;
use crate::models::chain::Chain;
use crate::models::envelope::{ApiSurface, RequestEnvelope};
use crate::models::settings::Settings;

const PROVIDER: &str = "Nodit";
const API_KEY_HEADER: &str = "X-API-KEY";
/// Every JSON-RPC call is a standalone request, so the id is constant.
const JSON_RPC_ID: u64 = 1;
/// Upstream error bodies are cut to this many chars before logging.
const ERROR_BODY_LIMIT: usize = 300;

/// Nodit blockchain-data provider.
///
/// - **Web3 Data API**: `POST {web3_endpoint}{category}/{method}`, JSON object body.
/// - **Node API**: `POST {node_endpoint}` with a JSON-RPC 2.0 body.
/// - **Auth**: static `X-API-KEY` header taken from the request envelope.
///
/// Endpoint tables come from [`Settings`]; ledger chains only have a Web3 entry.
pub struct NoditProvider {
    client: Client,
    settings: Arc<Settings>,
}

impl NoditProvider {
    pub fn new(settings: Arc<Settings>) -> Self {
        let builder = match settings.request_timeout_secs {
            Some(secs) => Client::builder().timeout(Duration::from_secs(secs)),
            None => Client::builder(),
        };
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            settings,
        }
    }

    /// Resolve the URL a request is sent to.
    pub fn endpoint_for(&self, request: &RequestEnvelope) -> Result<String, CoreError> {
        let (table, base) = match request.surface {
            ApiSurface::Web3 => (
                &self.settings.web3_endpoints,
                self.settings.web3_endpoint(request.chain),
            ),
            ApiSurface::Node => (
                &self.settings.node_endpoints,
                self.settings.node_endpoint(request.chain),
            ),
        };
        let base = base.ok_or_else(|| CoreError::UnsupportedChain {
            chain: request.chain.to_string(),
            supported: table.keys().map(Chain::to_string).collect(),
        })?;

        Ok(match request.surface {
            ApiSurface::Web3 => format!("{base}{}/{}", request.category, request.method),
            ApiSurface::Node => base.to_string(),
        })
    }

    /// The JSON body sent for a request.
    pub fn request_body(request: &RequestEnvelope) -> Value {
        match request.surface {
            ApiSurface::Web3 => request.params.clone(),
            ApiSurface::Node => {
                let params = match &request.params {
                    Value::Array(_) => request.params.clone(),
                    _ => Value::Array(Vec::new()),
                };
                serde_json::to_value(JsonRpcRequest {
                    id: JSON_RPC_ID,
                    jsonrpc: "2.0",
                    method: request.rpc_method(),
                    params,
                })
                .unwrap_or(Value::Null)
            }
        }
    }
}

// ── Nodit wire types ────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonRpcRequest {
    id: u64,
    jsonrpc: &'static str,
    method: String,
    params: Value,
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}…")
    }
}

#[async_trait]
impl BlockchainDataProvider for NoditProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn send(&self, request: &RequestEnvelope) -> Result<Value, CoreError> {
        let api_key = request.api_key.as_deref().ok_or_else(|| CoreError::Api {
            provider: PROVIDER.into(),
            status: None,
            message: "API key not configured".into(),
        })?;
        let url = self.endpoint_for(request)?;
        let body = Self::request_body(request);

        tracing::debug!(
            chain = %request.chain,
            category = %request.category,
            method = %request.method,
            "sending data provider request"
        );

        let resp = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                status: Some(status.as_u16()),
                message: format!(
                    "{} returned {status}: {}",
                    request.method,
                    truncate(&text, ERROR_BODY_LIMIT)
                ),
            });
        }

        let value: Value = resp.json().await.map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            status: Some(status.as_u16()),
            message: format!("Failed to parse response for {}: {e}", request.method),
        })?;

        // JSON-RPC reports failures in-band with a 200.
        if request.surface == ApiSurface::Node {
            if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
                return Err(CoreError::Api {
                    provider: PROVIDER.into(),
                    status: None,
                    message: format!("{} failed: {err}", request.rpc_method()),
                });
            }
        }

        Ok(value)
    }
}
