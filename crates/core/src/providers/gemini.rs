use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::traits::LanguageModel;
use crate::errors::CoreError;
use crate::models::settings::Settings;

const PROVIDER: &str = "Gemini";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini `generateContent` client.
///
/// - **Requires**: API key (`GEMINI_API_KEY`), sent as a header rather than
///   a query parameter.
/// - **Model**: `Settings::llm_model`, `gemini-2.5-flash` by default.
pub struct GeminiProvider {
    client: Client,
    settings: Arc<Settings>,
}

impl GeminiProvider {
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

    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.llm_base_url, self.settings.llm_model
        )
    }
}

// ── Gemini API request/response types ───────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Concatenated text of the first candidate in a `generateContent` body.
pub fn parse_response_text(body: &str) -> Result<String, CoreError> {
    let resp: GenerateResponse = serde_json::from_str(body)?;
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(CoreError::Api {
            provider: PROVIDER.into(),
            status: None,
            message: "Empty response from model".into(),
        });
    }
    Ok(text)
}

#[async_trait]
impl LanguageModel for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, prompt: &str) -> Result<String, CoreError> {
        let api_key = self
            .settings
            .llm_api_key
            .as_deref()
            .ok_or_else(|| CoreError::Api {
                provider: PROVIDER.into(),
                status: None,
                message: "API key not configured".into(),
            })?;

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                status: Some(status.as_u16()),
                message: format!("generateContent returned {status}"),
            });
        }

        parse_response_text(&body)
    }
}
