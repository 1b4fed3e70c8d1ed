use async_trait::async_trait;
use serde_json::Value;

use crate::errors::CoreError;
use crate::models::envelope::RequestEnvelope;

/// Abstraction over the blockchain-data provider.
///
/// One call to `send` is exactly one outbound HTTP request: no retry,
/// no caching, no batching. Implementations return the raw JSON body and
/// leave shaping to the data service.
#[async_trait]
pub trait BlockchainDataProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    async fn send(&self, request: &RequestEnvelope) -> Result<Value, CoreError>;
}

/// Abstraction over the language model used for intent extraction and
/// prose replies.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    /// Single-shot text completion.
    async fn generate(&self, prompt: &str) -> Result<String, CoreError>;
}
