use std::collections::BTreeMap;

use super::chain::Chain;
use crate::errors::CoreError;

pub const DEFAULT_LLM_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Process-wide configuration, built once at startup and shared read-only
/// (behind an `Arc`) by every provider and service.
#[derive(Clone)]
pub struct Settings {
    /// Data-provider key, sent as `X-API-KEY`.
    pub data_api_key: Option<String>,

    /// Language-model key.
    pub llm_api_key: Option<String>,

    pub llm_model: String,

    pub llm_base_url: String,

    /// Substituted for missing or unsupported chains coming out of the LLM.
    pub default_chain: Chain,

    /// Indexed data API base URL per chain (with trailing slash).
    pub web3_endpoints: BTreeMap<Chain, String>,

    /// Node JSON-RPC URL per chain. Ledger chains have none.
    pub node_endpoints: BTreeMap<Chain, String>,

    /// Outbound HTTP timeout. `None` leaves calls unbounded.
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        let web3_endpoints = Chain::ALL
            .iter()
            .map(|c| (*c, format!("https://web3.nodit.io/v1/{c}/mainnet/")))
            .collect();
        let node_endpoints = Chain::ALL
            .iter()
            .filter(|c| **c != Chain::Xrpl)
            .map(|c| (*c, format!("https://{c}-mainnet.nodit.io/")))
            .collect();

        Self {
            data_api_key: None,
            llm_api_key: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            default_chain: Chain::PRIMARY,
            web3_endpoints,
            node_endpoints,
            request_timeout_secs: None,
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("data_api_key", &self.data_api_key.as_ref().map(|_| "<redacted>"))
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "<redacted>"))
            .field("llm_model", &self.llm_model)
            .field("default_chain", &self.default_chain)
            .field("web3_endpoints", &self.web3_endpoints.len())
            .field("node_endpoints", &self.node_endpoints.len())
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Settings {
    /// Defaults overlaid with process environment variables.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns.
    ///
    /// Recognised keys: `NODIT_API_KEY`, `GEMINI_API_KEY`, `GEMINI_MODEL`,
    /// `GEMINI_BASE_URL`, `DEFAULT_CHAIN`, `REQUEST_TIMEOUT_SECS`.
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = Self::default();

        settings.data_api_key = get("NODIT_API_KEY");
        settings.llm_api_key = get("GEMINI_API_KEY");
        if let Some(model) = get("GEMINI_MODEL") {
            settings.llm_model = model;
        }
        if let Some(url) = get("GEMINI_BASE_URL") {
            settings.llm_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(chain) = get("DEFAULT_CHAIN") {
            settings.default_chain = chain.to_lowercase().parse()?;
        }
        if let Some(secs) = get("REQUEST_TIMEOUT_SECS") {
            let secs = secs.parse::<u64>().map_err(|e| {
                CoreError::validation("REQUEST_TIMEOUT_SECS", format!("not a number: {e}"))
            })?;
            settings.request_timeout_secs = (secs > 0).then_some(secs);
        }

        if settings.data_api_key.is_none() {
            tracing::warn!("NODIT_API_KEY is not set; blockchain data requests will fail");
        }
        if settings.llm_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; language-model calls will fail");
        }

        Ok(settings)
    }

    pub fn web3_endpoint(&self, chain: Chain) -> Option<&str> {
        self.web3_endpoints.get(&chain).map(String::as_str)
    }

    pub fn node_endpoint(&self, chain: Chain) -> Option<&str> {
        self.node_endpoints.get(&chain).map(String::as_str)
    }
}
