// ═══════════════════════════════════════════════════════════════════
// Service Tests: Normalizer, IntentService, dispatch planning,
// DataService, ChartService, ChatService
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chain_chat_core::errors::CoreError;
use chain_chat_core::models::chain::Chain;
use chain_chat_core::models::chart::RenderKind;
use chain_chat_core::models::envelope::{
    ApiSurface, Payload, RequestEnvelope, ResponseEnvelope, TokenBalance,
};
use chain_chat_core::models::intent::{ChartKind, Intent, IntentKind};
use chain_chat_core::models::settings::Settings;
use chain_chat_core::providers::traits::{BlockchainDataProvider, LanguageModel};
use chain_chat_core::services::chart_service::{parse_amount, select_chart, MAX_BAR_ENTRIES};
use chain_chat_core::services::chat_service::{build_reply_prompt, ChatService, FALLBACK_REPLY};
use chain_chat_core::services::data_service::DataService;
use chain_chat_core::services::dispatch_service::{
    plan, DataOperation, DispatchOutcome, DispatchService,
};
use chain_chat_core::services::intent_service::{
    build_intent_prompt, parse_intent_response, IntentService,
};
use chain_chat_core::services::normalizer::{normalize, normalize_intent};

const EVM_ADDR: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";
const EVM_SPENDER: &str = "0x1111111254EEB25477B68fb85Ed929f73A960582";
const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
const XRPL_ADDR: &str = "rN7n7otQDd6FczFgLdSqtcsAUxDkw6fzRH";

// ═══════════════════════════════════════════════════════════════════
// Mock Providers
// ═══════════════════════════════════════════════════════════════════

/// Answers each provider method with a canned body and records every
/// request it receives.
struct MockDataProvider {
    responses: HashMap<String, Value>,
    calls: Mutex<Vec<RequestEnvelope>>,
}

impl MockDataProvider {
    fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn respond(mut self, method: &str, body: Value) -> Self {
        self.responses.insert(method.to_string(), body);
        self
    }

    fn calls(&self) -> Vec<RequestEnvelope> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlockchainDataProvider for MockDataProvider {
    fn name(&self) -> &str {
        "MockData"
    }

    async fn send(&self, request: &RequestEnvelope) -> Result<Value, CoreError> {
        self.calls.lock().unwrap().push(request.clone());
        self.responses
            .get(&request.method)
            .cloned()
            .ok_or_else(|| CoreError::Api {
                provider: "MockData".into(),
                status: Some(404),
                message: format!("no canned response for {}", request.method),
            })
    }
}

/// Always fails the way an overloaded upstream does.
struct FailingDataProvider;

#[async_trait]
impl BlockchainDataProvider for FailingDataProvider {
    fn name(&self) -> &str {
        "Failing"
    }

    async fn send(&self, _request: &RequestEnvelope) -> Result<Value, CoreError> {
        Err(CoreError::Api {
            provider: "Failing".into(),
            status: Some(503),
            message: "upstream body with secret-token".into(),
        })
    }
}

/// Replays scripted completions in order; errors once the script runs out.
struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, CoreError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(replies: Vec<Result<String, CoreError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    fn failing() -> Self {
        Self::new(vec![])
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, CoreError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(CoreError::Api {
                    provider: "Scripted".into(),
                    status: None,
                    message: "script exhausted".into(),
                })
            })
    }
}

fn test_settings() -> Arc<Settings> {
    Arc::new(Settings {
        data_api_key: Some("test-key".into()),
        ..Settings::default()
    })
}

fn data_service(provider: Arc<dyn BlockchainDataProvider>) -> DataService {
    DataService::new(provider, test_settings())
}

fn token(symbol: &str, balance: &str) -> TokenBalance {
    TokenBalance::from_value(&json!({ "symbol": symbol, "balance": balance }))
}

fn tokens_envelope(tokens: Vec<TokenBalance>) -> ResponseEnvelope {
    ResponseEnvelope::new(
        Chain::Ethereum,
        Some(EVM_ADDR.to_string()),
        Payload::Tokens(tokens),
        None,
    )
}

fn balance_envelope(balance: &str) -> ResponseEnvelope {
    ResponseEnvelope::new(
        Chain::Ethereum,
        Some(EVM_ADDR.to_string()),
        Payload::Balance(balance.to_string()),
        None,
    )
}

// ═══════════════════════════════════════════════════════════════════
// Normalizer
// ═══════════════════════════════════════════════════════════════════

mod normalizer {
    use super::*;

    #[test]
    fn empty_object_is_general_question() {
        assert_eq!(normalize(&json!({})), Intent::general_question());
    }

    #[test]
    fn non_object_is_general_question() {
        assert_eq!(normalize(&json!("wallet_balance")), Intent::general_question());
        assert_eq!(normalize(&Value::Null), Intent::general_question());
    }

    #[test]
    fn unknown_kind_is_general_question() {
        let intent = normalize(&json!({ "kind": "swap_tokens", "chain": "ethereum" }));
        assert_eq!(intent, Intent::general_question());
    }

    #[test]
    fn general_question_drops_every_field() {
        let intent = normalize(&json!({
            "kind": "general_question",
            "chain": "ethereum",
            "address": EVM_ADDR,
            "chartKind": "pie"
        }));
        assert_eq!(intent, Intent::general_question());
    }

    #[test]
    fn wallet_balance_keeps_valid_address() {
        let intent = normalize(&json!({
            "kind": "WalletBalance",
            "chain": "ethereum",
            "address": EVM_ADDR
        }));
        assert_eq!(intent.kind, IntentKind::WalletBalance);
        assert!(intent.requires_external_data);
        assert_eq!(intent.chain, Some(Chain::Ethereum));
        assert_eq!(intent.address.as_deref(), Some(EVM_ADDR));
    }

    #[test]
    fn short_address_is_dropped() {
        let intent = normalize(&json!({
            "kind": "wallet_balance",
            "chain": "ethereum",
            "address": "0x123"
        }));
        assert_eq!(intent.kind, IntentKind::WalletBalance);
        assert_eq!(intent.address, None);
    }

    #[test]
    fn address_of_wrong_family_is_dropped() {
        let intent = normalize(&json!({
            "kind": "token_balance",
            "chain": "polygon",
            "address": XRPL_ADDR
        }));
        assert_eq!(intent.address, None);
    }

    #[test]
    fn unsupported_chain_falls_back_to_default() {
        let intent = normalize(&json!({
            "kind": "token_balance",
            "chain": "solana",
            "address": EVM_ADDR
        }));
        assert_eq!(intent.chain, Some(Chain::Ethereum));
        assert_eq!(intent.address.as_deref(), Some(EVM_ADDR));
    }

    #[test]
    fn chain_name_is_trimmed_and_lowercased() {
        let intent = normalize(&json!({ "kind": "wallet_balance", "chain": " Polygon " }));
        assert_eq!(intent.chain, Some(Chain::Polygon));
    }

    #[test]
    fn missing_chain_uses_configured_default() {
        let intent = normalize_intent(&json!({ "kind": "wallet_balance" }), Chain::Base);
        assert_eq!(intent.chain, Some(Chain::Base));
    }

    #[test]
    fn balance_changes_default_to_ledger_chain() {
        let intent = normalize(&json!({
            "kind": "token_balance_changes",
            "address": XRPL_ADDR
        }));
        assert_eq!(intent.chain, Some(Chain::Xrpl));
        assert_eq!(intent.address.as_deref(), Some(XRPL_ADDR));
    }

    #[test]
    fn requires_flag_is_derived_from_kind() {
        let intent = normalize(&json!({
            "kind": "wallet_balance",
            "requiresExternalData": false
        }));
        assert!(intent.requires_external_data);
    }

    #[test]
    fn legacy_field_names_are_accepted() {
        let intent = normalize(&json!({
            "method": "token_balance",
            "chain": "base",
            "accountAddress": EVM_ADDR,
            "chartType": "Bar",
            "params": { "limit": 5 }
        }));
        assert_eq!(intent.kind, IntentKind::TokenBalance);
        assert_eq!(intent.chain, Some(Chain::Base));
        assert_eq!(intent.address.as_deref(), Some(EVM_ADDR));
        assert_eq!(intent.chart_kind, Some(ChartKind::Bar));
        assert_eq!(intent.extra_u64("limit"), Some(5));
    }

    #[test]
    fn unknown_chart_kind_is_none() {
        let intent = normalize(&json!({ "kind": "token_balance", "chartKind": "histogram" }));
        assert_eq!(intent.chart_kind, None);
    }

    #[test]
    fn extra_params_keep_only_primitives() {
        let intent = normalize(&json!({
            "kind": "custom_query",
            "extraParams": {
                "category": "eth",
                "method": "getBalance",
                "params": [EVM_ADDR, "latest"],
                "nested": { "a": 1 },
                "mixed": [1, { "b": 2 }]
            }
        }));
        assert_eq!(intent.extra_str("category"), Some("eth"));
        assert_eq!(intent.extra_params["params"], json!([EVM_ADDR, "latest"]));
        assert!(!intent.extra_params.contains_key("nested"));
        assert!(!intent.extra_params.contains_key("mixed"));
    }

    #[test]
    fn every_kind_satisfies_intent_invariants() {
        for kind in IntentKind::ALL {
            let intent = normalize(&json!({ "kind": kind.as_str(), "chain": "nowhere" }));
            assert_eq!(intent.kind, kind);
            assert_eq!(
                intent.requires_external_data,
                kind != IntentKind::GeneralQuestion
            );
            assert_eq!(intent.chain.is_none(), kind == IntentKind::GeneralQuestion);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// IntentService
// ═══════════════════════════════════════════════════════════════════

mod intent_service {
    use super::*;

    #[test]
    fn parse_accepts_bare_object_with_whitespace() {
        let value = parse_intent_response("  \n{\"kind\":\"wallet_balance\"}\n ").unwrap();
        assert_eq!(value["kind"], "wallet_balance");
    }

    #[test]
    fn parse_rejects_fenced_json() {
        let err = parse_intent_response("```json\n{\"kind\":\"wallet_balance\"}\n```").unwrap_err();
        assert!(matches!(err, CoreError::IntentExtractionFailed(_)));
    }

    #[test]
    fn parse_rejects_prose_and_arrays() {
        assert!(parse_intent_response("Sure! Here it is").is_err());
        assert!(parse_intent_response("[1, 2]").is_err());
        assert!(parse_intent_response("{not json}").is_err());
    }

    #[test]
    fn prompt_lists_chains_and_message() {
        let prompt = build_intent_prompt("how much ETH do I have?");
        for chain in Chain::ALL {
            assert!(prompt.contains(&format!("\"{chain}\"")), "{chain}");
        }
        assert!(prompt.contains("\"scatter\""));
        assert!(prompt.ends_with("User message: how much ETH do I have?"));
    }

    #[tokio::test]
    async fn extracts_and_normalizes() {
        let reply = json!({
            "kind": "token_balance",
            "chain": "arbitrum",
            "address": EVM_ADDR,
            "chartKind": "pie",
            "requiresExternalData": true,
            "extraParams": {}
        })
        .to_string();
        let llm = Arc::new(ScriptedLlm::replying(&reply));
        let service = IntentService::new(llm.clone(), Chain::Ethereum);

        let intent = service.extract_intent("pie chart of my arbitrum tokens").await;
        assert_eq!(
            intent,
            Intent::new(IntentKind::TokenBalance)
                .on_chain(Chain::Arbitrum)
                .with_address(EVM_ADDR)
                .with_chart_kind(ChartKind::Pie)
        );
        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("pie chart of my arbitrum tokens"));
    }

    #[tokio::test]
    async fn llm_failure_degrades_to_general_question() {
        let service = IntentService::new(Arc::new(ScriptedLlm::failing()), Chain::Ethereum);
        assert_eq!(service.extract_intent("hi").await, Intent::general_question());
    }

    #[tokio::test]
    async fn fenced_reply_degrades_to_general_question() {
        let llm = ScriptedLlm::replying("```json\n{\"kind\":\"wallet_balance\"}\n```");
        let service = IntentService::new(Arc::new(llm), Chain::Ethereum);
        assert_eq!(service.extract_intent("hi").await, Intent::general_question());
    }

    #[tokio::test]
    async fn extract_raw_reports_llm_errors() {
        let service = IntentService::new(Arc::new(ScriptedLlm::failing()), Chain::Ethereum);
        let err = service.extract_raw("hi").await.unwrap_err();
        assert!(matches!(err, CoreError::IntentExtractionFailed(_)));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Dispatch planning
// ═══════════════════════════════════════════════════════════════════

mod dispatch_plan {
    use super::*;

    fn missing_fields(intent: &Intent) -> Vec<String> {
        match plan(intent) {
            Err(CoreError::MissingParameter { fields }) => fields,
            other => panic!("expected MissingParameter, got {other:?}"),
        }
    }

    #[test]
    fn general_question_needs_no_data() {
        assert_eq!(plan(&Intent::general_question()).unwrap(), DataOperation::NoDataRequired);
    }

    #[test]
    fn wallet_balance() {
        let intent = Intent::new(IntentKind::WalletBalance)
            .on_chain(Chain::Ethereum)
            .with_address(EVM_ADDR);
        assert_eq!(
            plan(&intent).unwrap(),
            DataOperation::WalletBalance {
                chain: Chain::Ethereum,
                address: EVM_ADDR.to_string()
            }
        );
    }

    #[test]
    fn missing_address_is_reported() {
        let intent = Intent::new(IntentKind::WalletBalance).on_chain(Chain::Ethereum);
        assert_eq!(missing_fields(&intent), vec!["address"]);
    }

    #[test]
    fn allowance_reports_every_missing_field_at_once() {
        let intent = Intent::new(IntentKind::TokenAllowance);
        assert_eq!(
            missing_fields(&intent),
            vec!["chain", "contractAddress", "ownerAddress", "spenderAddress"]
        );
    }

    #[test]
    fn transaction_history_defaults() {
        let intent = Intent::new(IntentKind::TransactionHistory)
            .on_chain(Chain::Optimism)
            .with_address(EVM_ADDR);
        assert_eq!(
            plan(&intent).unwrap(),
            DataOperation::TransactionHistory {
                chain: Chain::Optimism,
                address: EVM_ADDR.to_string(),
                limit: 50,
                offset: 0
            }
        );
    }

    #[test]
    fn transaction_history_reads_paging_params() {
        let intent = Intent::new(IntentKind::TransactionHistory)
            .on_chain(Chain::Optimism)
            .with_address(EVM_ADDR)
            .with_extra_param("limit", json!(10))
            .with_extra_param("offset", json!("20"));
        match plan(&intent).unwrap() {
            DataOperation::TransactionHistory { limit, offset, .. } => {
                assert_eq!((limit, offset), (10, 20));
            }
            other => panic!("unexpected operation: {other:?}"),
        }
    }

    #[test]
    fn balance_changes_on_evm_chain_is_unsupported() {
        let intent = Intent::new(IntentKind::TokenBalanceChanges)
            .on_chain(Chain::Ethereum)
            .with_address(EVM_ADDR);
        match plan(&intent).unwrap_err() {
            CoreError::UnsupportedChain { chain, supported } => {
                assert_eq!(chain, "ethereum");
                assert_eq!(supported, vec!["xrpl"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn normalized_ledger_address_on_evm_chain_reports_chain() {
        let intent = normalize(&json!({
            "kind": "token_balance_changes",
            "chain": "ethereum",
            "address": XRPL_ADDR
        }));
        assert_eq!(intent.address, None);
        match plan(&intent).unwrap_err() {
            CoreError::UnsupportedChain { chain, supported } => {
                assert_eq!(chain, "ethereum");
                assert_eq!(supported, vec!["xrpl"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn balance_changes_without_address_on_ledger_chain_is_missing() {
        let intent = normalize(&json!({ "kind": "token_balance_changes", "chain": "xrpl" }));
        assert_eq!(missing_fields(&intent), vec!["address"]);
    }

    #[test]
    fn custom_query_carries_params_array() {
        let intent = Intent::new(IntentKind::CustomQuery)
            .on_chain(Chain::Ethereum)
            .with_extra_param("category", json!("eth"))
            .with_extra_param("method", json!("getBalance"))
            .with_extra_param("params", json!([EVM_ADDR, "latest"]));
        assert_eq!(
            plan(&intent).unwrap(),
            DataOperation::CustomQuery {
                chain: Chain::Ethereum,
                category: "eth".into(),
                method: "getBalance".into(),
                params: vec![json!(EVM_ADDR), json!("latest")]
            }
        );
    }

    #[test]
    fn custom_query_requires_category_and_method() {
        let intent = Intent::new(IntentKind::CustomQuery).on_chain(Chain::Ethereum);
        assert_eq!(missing_fields(&intent), vec!["category", "method"]);
    }

    #[test]
    fn every_normalized_intent_plans_without_panicking() {
        for kind in IntentKind::ALL {
            let intent = normalize(&json!({ "kind": kind.as_str() }));
            let planned = plan(&intent);
            if kind == IntentKind::GeneralQuestion {
                assert_eq!(planned.unwrap(), DataOperation::NoDataRequired);
            } else {
                assert!(matches!(planned, Err(CoreError::MissingParameter { .. })));
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// DataService
// ═══════════════════════════════════════════════════════════════════

mod data_service {
    use super::*;

    #[tokio::test]
    async fn wallet_balance_from_result_field() {
        let provider = Arc::new(
            MockDataProvider::new()
                .respond("getNativeBalanceByAccount", json!({ "result": "1000000000000000000" })),
        );
        let service = data_service(provider.clone());

        let envelope = service
            .get_wallet_balance(Chain::Ethereum, EVM_ADDR)
            .await
            .unwrap();
        assert_eq!(envelope.chain(), Chain::Ethereum);
        assert_eq!(envelope.subject_address(), Some(EVM_ADDR));
        assert_eq!(envelope.kind(), "balance");
        assert_eq!(
            envelope.payload(),
            &Payload::Balance("1000000000000000000".into())
        );

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].surface, ApiSurface::Web3);
        assert_eq!(calls[0].category, "native");
        assert_eq!(calls[0].method, "getNativeBalanceByAccount");
        assert_eq!(calls[0].params, json!({ "accountAddress": EVM_ADDR }));
        assert_eq!(calls[0].api_key.as_deref(), Some("test-key"));
    }

    #[tokio::test]
    async fn wallet_balance_from_balance_field() {
        let provider = Arc::new(
            MockDataProvider::new().respond("getNativeBalanceByAccount", json!({ "balance": 5 })),
        );
        let envelope = data_service(provider)
            .get_wallet_balance(Chain::Base, EVM_ADDR)
            .await
            .unwrap();
        assert_eq!(envelope.payload(), &Payload::Balance("5".into()));
    }

    #[tokio::test]
    async fn invalid_address_never_reaches_provider() {
        let provider = Arc::new(MockDataProvider::new());
        let err = data_service(provider.clone())
            .get_wallet_balance(Chain::Ethereum, "0x123")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "address"));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn token_balances_from_items() {
        let provider = Arc::new(MockDataProvider::new().respond(
            "getTokenBalancesByAccount",
            json!({
                "rpp": 2,
                "items": [
                    {
                        "contract": { "address": USDC, "symbol": "USDC", "decimals": 6 },
                        "balance": "2500000"
                    },
                    { "contract": { "symbol": "LINK" }, "balance": "7" }
                ]
            }),
        ));
        let envelope = data_service(provider)
            .get_token_balances(Chain::Ethereum, EVM_ADDR)
            .await
            .unwrap();
        match envelope.payload() {
            Payload::Tokens(tokens) => {
                assert_eq!(tokens.len(), 2);
                assert_eq!(tokens[0].symbol.as_deref(), Some("USDC"));
                assert_eq!(tokens[0].contract_address.as_deref(), Some(USDC));
                assert_eq!(tokens[1].balance, "7");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transaction_history_pagination() {
        let provider = Arc::new(MockDataProvider::new().respond(
            "getTransactionsByAccount",
            json!({ "total": 120, "items": [{ "transactionHash": "0xabc", "from": EVM_ADDR }] }),
        ));
        let service = data_service(provider.clone());
        let envelope = service
            .get_transaction_history(Chain::Ethereum, EVM_ADDR, None, None)
            .await
            .unwrap();

        let pagination = envelope.pagination().unwrap();
        assert_eq!(pagination.limit, Some(50));
        assert_eq!(pagination.offset, Some(0));
        assert_eq!(pagination.total, Some(120));
        match envelope.payload() {
            Payload::Transactions(txs) => assert_eq!(txs[0].hash.as_deref(), Some("0xabc")),
            other => panic!("unexpected payload: {other:?}"),
        }
        assert_eq!(
            provider.calls()[0].params,
            json!({ "accountAddress": EVM_ADDR, "limit": 50, "offset": 0 })
        );
    }

    #[tokio::test]
    async fn transaction_history_missing_total_is_zero() {
        let provider = Arc::new(
            MockDataProvider::new().respond("getTransactionsByAccount", json!({ "items": [] })),
        );
        let envelope = data_service(provider)
            .get_transaction_history(Chain::Ethereum, EVM_ADDR, Some(5), Some(10))
            .await
            .unwrap();
        let pagination = envelope.pagination().unwrap();
        assert_eq!(pagination.total, Some(0));
        assert_eq!(pagination.limit, Some(5));
        assert_eq!(pagination.offset, Some(10));
    }

    #[tokio::test]
    async fn allowance_subject_is_owner() {
        let provider = Arc::new(
            MockDataProvider::new().respond("getTokenAllowance", json!({ "allowance": "100" })),
        );
        let service = data_service(provider.clone());
        let envelope = service
            .get_token_allowance(Chain::Ethereum, USDC, EVM_ADDR, EVM_SPENDER)
            .await
            .unwrap();
        assert_eq!(envelope.subject_address(), Some(EVM_ADDR));
        assert_eq!(envelope.payload(), &Payload::Allowance("100".into()));
        assert_eq!(
            provider.calls()[0].params,
            json!({
                "contractAddress": USDC,
                "ownerAddress": EVM_ADDR,
                "spenderAddress": EVM_SPENDER
            })
        );
    }

    #[tokio::test]
    async fn allowance_names_the_bad_field() {
        let err = data_service(Arc::new(MockDataProvider::new()))
            .get_token_allowance(Chain::Ethereum, USDC, EVM_ADDR, "nope")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation { ref field, .. } if field == "spenderAddress"
        ));
    }

    #[tokio::test]
    async fn balance_changes_pass_params_through() {
        let provider = Arc::new(MockDataProvider::new().respond(
            "getTokenBalanceChangesByAccount",
            json!({
                "rpp": 10,
                "cursor": "next-page",
                "items": [{ "currency": "USD", "change": "-5" }]
            }),
        ));
        let service = data_service(provider.clone());
        let mut params = Map::new();
        params.insert("rpp".into(), json!(10));

        let envelope = service
            .get_token_balance_changes(Chain::Xrpl, XRPL_ADDR, &params)
            .await
            .unwrap();
        assert_eq!(envelope.kind(), "balance_changes");
        assert_eq!(
            envelope.payload(),
            &Payload::BalanceChanges(vec![json!({ "currency": "USD", "change": "-5" })])
        );
        let pagination = envelope.pagination().unwrap();
        assert_eq!(pagination.cursor.as_deref(), Some("next-page"));
        assert_eq!(pagination.rpp, Some(10));
        assert_eq!(
            provider.calls()[0].params,
            json!({ "rpp": 10, "accountAddress": XRPL_ADDR })
        );
    }

    #[tokio::test]
    async fn balance_changes_reject_evm_chain() {
        let provider = Arc::new(MockDataProvider::new());
        let err = data_service(provider.clone())
            .get_token_balance_changes(Chain::Ethereum, EVM_ADDR, &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedChain { .. }));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn custom_query_uses_node_surface() {
        let provider = Arc::new(MockDataProvider::new().respond(
            "blockNumber",
            json!({ "jsonrpc": "2.0", "id": 1, "result": "0x12a05f2" }),
        ));
        let service = data_service(provider.clone());
        let envelope = service
            .execute_custom_query(Chain::Arbitrum, "eth", "blockNumber", vec![])
            .await
            .unwrap();
        assert_eq!(envelope.subject_address(), None);
        assert_eq!(envelope.payload(), &Payload::Custom(json!("0x12a05f2")));

        let call = &provider.calls()[0];
        assert_eq!(call.surface, ApiSurface::Node);
        assert_eq!(call.rpc_method(), "eth_blockNumber");
        assert_eq!(call.params, json!([]));
    }

    #[tokio::test]
    async fn custom_query_rejects_blank_method() {
        let err = data_service(Arc::new(MockDataProvider::new()))
            .execute_custom_query(Chain::Ethereum, "eth", " ", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "method"));
    }

    #[tokio::test]
    async fn provider_failure_becomes_data_fetch_failed() {
        let err = data_service(Arc::new(FailingDataProvider))
            .get_token_balances(Chain::Polygon, EVM_ADDR)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 503);
        assert!(!err.to_string().contains("secret-token"));
        match err {
            CoreError::DataFetchFailed {
                chain,
                subject_address,
                cause,
                upstream_status,
            } => {
                assert_eq!(chain, "polygon");
                assert_eq!(subject_address, EVM_ADDR);
                assert!(cause.contains("secret-token"));
                assert_eq!(upstream_status, Some(503));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_service_routes_to_operation() {
        let provider = Arc::new(
            MockDataProvider::new().respond("getNativeBalanceByAccount", json!({ "result": "42" })),
        );
        let dispatcher = DispatchService::new(Arc::new(data_service(provider.clone())));

        let general = dispatcher.dispatch(&Intent::general_question()).await.unwrap();
        assert_eq!(general, DispatchOutcome::NoDataRequired);
        assert!(provider.calls().is_empty());

        let intent = Intent::new(IntentKind::WalletBalance)
            .on_chain(Chain::Kaia)
            .with_address(EVM_ADDR);
        let outcome = dispatcher.dispatch(&intent).await.unwrap();
        assert_eq!(outcome.envelope().map(|e| e.chain()), Some(Chain::Kaia));
        assert_eq!(provider.calls().len(), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// ChartService
// ═══════════════════════════════════════════════════════════════════

mod chart_service {
    use super::*;

    #[test]
    fn balance_line_chart() {
        let chart = select_chart(&balance_envelope("1000000000000000000"), Some(ChartKind::Line));
        assert_eq!(chart.kind, RenderKind::Line);
        assert_eq!(chart.labels, vec!["Current Balance"]);
        assert_eq!(chart.series[0].name, "ethereum Balance");
        assert_eq!(chart.series[0].values, vec![1e18]);
    }

    #[test]
    fn balance_area_chart() {
        let chart = select_chart(&balance_envelope("7"), Some(ChartKind::Area));
        assert_eq!(chart.kind, RenderKind::Area);
        assert_eq!(chart.title, "Cumulative Data");
    }

    #[test]
    fn no_requested_kind_picks_by_payload() {
        let tokens = tokens_envelope(vec![token("ETH", "1")]);
        assert_eq!(select_chart(&tokens, None).kind, RenderKind::Pie);
        assert_eq!(select_chart(&balance_envelope("1"), None).kind, RenderKind::Line);
        assert!(select_chart(&tokens_envelope(vec![]), None).is_placeholder());
    }

    #[test]
    fn bar_keeps_top_ten_descending() {
        let tokens = (1..=12)
            .map(|i| token(&format!("T{i}"), &(i * 100).to_string()))
            .collect();
        let chart = select_chart(&tokens_envelope(tokens), Some(ChartKind::Bar));

        assert_eq!(chart.kind, RenderKind::Bar);
        assert_eq!(chart.labels.len(), MAX_BAR_ENTRIES);
        assert_eq!(chart.labels[0], "T12");
        assert_eq!(chart.labels[9], "T3");
        let values = &chart.series[0].values;
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(values[0], 1200.0);
    }

    #[test]
    fn bar_ties_keep_upstream_order() {
        let tokens = vec![token("A", "5"), token("B", "9"), token("C", "5")];
        let chart = select_chart(&tokens_envelope(tokens), Some(ChartKind::Bar));
        assert_eq!(chart.labels, vec!["B", "A", "C"]);
    }

    #[test]
    fn pie_excludes_empty_and_unparsable_balances() {
        let tokens = vec![token("ETH", "3"), token("DUST", "0"), token("BAD", "n/a")];
        let chart = select_chart(&tokens_envelope(tokens), Some(ChartKind::Pie));
        assert_eq!(chart.labels, vec!["ETH"]);
        assert_eq!(chart.series[0].values, vec![3.0]);
    }

    #[test]
    fn scatter_uses_index_labels() {
        let tokens = vec![token("A", "2"), token("B", "0"), token("C", "4")];
        let chart = select_chart(&tokens_envelope(tokens), Some(ChartKind::Scatter));
        assert_eq!(chart.kind, RenderKind::Scatter);
        assert_eq!(chart.labels, vec!["0", "1"]);
        assert_eq!(chart.series[0].values, vec![2.0, 4.0]);
    }

    #[test]
    fn mismatched_kind_is_placeholder() {
        assert!(select_chart(&balance_envelope("1"), Some(ChartKind::Pie)).is_placeholder());
        let tokens = tokens_envelope(vec![token("ETH", "1")]);
        assert!(select_chart(&tokens, Some(ChartKind::Line)).is_placeholder());

        let txs = ResponseEnvelope::new(Chain::Ethereum, None, Payload::Transactions(vec![]), None);
        assert!(select_chart(&txs, Some(ChartKind::Bar)).is_placeholder());
        assert!(select_chart(&txs, None).is_placeholder());
    }

    #[test]
    fn selection_is_deterministic() {
        let envelope = tokens_envelope(vec![token("A", "1"), token("B", "2")]);
        for kind in ChartKind::ALL {
            assert_eq!(
                select_chart(&envelope, Some(kind)),
                select_chart(&envelope, Some(kind))
            );
        }
    }

    #[test]
    fn parse_amount_treats_garbage_as_zero() {
        assert_eq!(parse_amount("1.5"), 1.5);
        assert_eq!(parse_amount(" 10 "), 10.0);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount("inf"), 0.0);
        assert_eq!(parse_amount(""), 0.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// ChatService
// ═══════════════════════════════════════════════════════════════════

mod chat_service {
    use super::*;

    #[tokio::test]
    async fn reply_is_trimmed() {
        let service = ChatService::new(Arc::new(ScriptedLlm::replying("  You hold 1 ETH.\n")));
        let reply = service
            .generate_reply("balance?", &Intent::general_question(), None)
            .await;
        assert_eq!(reply, "You hold 1 ETH.");
    }

    #[tokio::test]
    async fn llm_failure_yields_fallback() {
        let service = ChatService::new(Arc::new(ScriptedLlm::failing()));
        let reply = service
            .generate_reply("balance?", &Intent::general_question(), None)
            .await;
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[test]
    fn prompt_includes_intent_and_data() {
        let intent = Intent::new(IntentKind::WalletBalance)
            .on_chain(Chain::Ethereum)
            .with_address(EVM_ADDR);
        let envelope = balance_envelope("1000000000000000000");
        let prompt = build_reply_prompt("what's my balance?", &intent, Some(&envelope));

        assert!(prompt.contains("Intent: wallet_balance"));
        assert!(prompt.contains("1000000000000000000"));
        assert!(prompt.ends_with("User message: what's my balance?"));
    }

    #[test]
    fn prompt_without_data_has_no_data_section() {
        let prompt = build_reply_prompt("what is gas?", &Intent::general_question(), None);
        assert!(!prompt.contains("Data available"));
    }
}
