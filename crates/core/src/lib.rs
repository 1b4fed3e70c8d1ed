pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod validation;

use std::sync::Arc;

use errors::CoreError;
use models::{
    chain::Chain,
    chat::{ChatRequest, ChatResponse},
    intent::Intent,
    settings::Settings,
};
use providers::{
    gemini::GeminiProvider,
    nodit::NoditProvider,
    traits::{BlockchainDataProvider, LanguageModel},
};
use services::{
    chart_service::select_chart,
    chat_service::ChatService,
    data_service::DataService,
    dispatch_service::{DispatchOutcome, DispatchService},
    intent_service::IntentService,
};

/// Main entry point for the Chain Chat core library.
///
/// Owns the configured providers and services and runs the chat pipeline:
/// free text → intent (LLM) → data fetch → reply (LLM) → optional chart.
/// Holds no per-request state, so one instance serves concurrent requests.
#[must_use]
pub struct ChainChat {
    settings: Arc<Settings>,
    data_service: Arc<DataService>,
    intent_service: IntentService,
    dispatch_service: DispatchService,
    chat_service: ChatService,
}

impl std::fmt::Debug for ChainChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainChat")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ChainChat {
    /// Wire up the default providers (Nodit for data, Gemini for the LLM).
    pub fn new(settings: Settings) -> Self {
        let settings = Arc::new(settings);
        let data_provider = Arc::new(NoditProvider::new(settings.clone()));
        let llm = Arc::new(GeminiProvider::new(settings.clone()));
        Self::with_providers(settings, data_provider, llm)
    }

    /// Wire up caller-supplied providers (alternate backends, tests).
    pub fn with_providers(
        settings: Arc<Settings>,
        data_provider: Arc<dyn BlockchainDataProvider>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        let data_service = Arc::new(DataService::new(data_provider, settings.clone()));
        Self {
            intent_service: IntentService::new(llm.clone(), settings.default_chain),
            dispatch_service: DispatchService::new(data_service.clone()),
            chat_service: ChatService::new(llm),
            data_service,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Direct access to the data-fetch operations (used by the data routes).
    #[must_use]
    pub fn data(&self) -> &DataService {
        &self.data_service
    }

    #[must_use]
    pub fn supported_chains() -> &'static [Chain] {
        &Chain::ALL
    }

    /// Extract a canonical intent. Never fails; see [`IntentService`].
    pub async fn extract_intent(&self, message: &str) -> Intent {
        self.intent_service.extract_intent(message).await
    }

    pub async fn dispatch(&self, intent: &Intent) -> Result<DispatchOutcome, CoreError> {
        self.dispatch_service.dispatch(intent).await
    }

    /// Run the full chat pipeline for one message.
    ///
    /// Validation, missing-parameter and data-fetch errors are returned;
    /// intent extraction and reply generation degrade instead of failing.
    /// A chart is attached only when data was fetched and a chart kind was
    /// requested.
    pub async fn process_chat_message(
        &self,
        request: &ChatRequest,
    ) -> Result<ChatResponse, CoreError> {
        validation::validate_chat_request(request)?;

        let intent = self.extract_intent(&request.message).await;
        let outcome = self.dispatch(&intent).await?;
        let envelope = outcome.envelope();

        let message = self
            .chat_service
            .generate_reply(&request.message, &intent, envelope)
            .await;

        let chart_data = match (envelope, intent.chart_kind) {
            (Some(envelope), Some(kind)) => Some(select_chart(envelope, Some(kind))),
            _ => None,
        };

        Ok(ChatResponse {
            message,
            chart_data,
            intent: intent.kind.as_str().to_string(),
            timestamp: chrono::Utc::now(),
            session_id: request
                .session_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        })
    }
}
