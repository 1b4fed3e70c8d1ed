use std::sync::Arc;

use crate::models::envelope::ResponseEnvelope;
use crate::models::intent::Intent;
use crate::providers::traits::LanguageModel;

pub const FALLBACK_REPLY: &str =
    "I'm sorry, I'm having trouble processing your request right now. Please try again later.";

/// Writes the conversational reply with a second LLM call, given the
/// canonical intent and whatever data was fetched for it.
pub struct ChatService {
    llm: Arc<dyn LanguageModel>,
}

impl ChatService {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Never fails: an LLM error yields [`FALLBACK_REPLY`].
    pub async fn generate_reply(
        &self,
        message: &str,
        intent: &Intent,
        envelope: Option<&ResponseEnvelope>,
    ) -> String {
        let prompt = build_reply_prompt(message, intent, envelope);
        match self.llm.generate(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(provider = self.llm.name(), error = %e, "reply generation failed");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

pub fn build_reply_prompt(
    message: &str,
    intent: &Intent,
    envelope: Option<&ResponseEnvelope>,
) -> String {
    let parameters = serde_json::to_string(intent).unwrap_or_default();
    let data = envelope
        .and_then(|e| serde_json::to_string_pretty(e).ok())
        .map(|json| format!("- Data available:\n{json}\n"))
        .unwrap_or_default();

    format!(
        "You are Chain Chat, an assistant that helps users understand blockchain data \
through natural language.

You can:
- analyse wallet balances, token holdings and transaction history
- explain what charts of that data show
- explain blockchain concepts in simple terms

When responding:
- be conversational and helpful
- if data is provided, explain it clearly; raw balances are in the chain's smallest unit
- keep answers concise but informative

Current context:
- Intent: {kind}
- Parameters: {parameters}
{data}
User message: {message}",
        kind = intent.kind,
    )
}
