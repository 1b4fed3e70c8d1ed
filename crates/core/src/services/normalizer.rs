use serde_json::{Map, Value};

use crate::models::chain::Chain;
use crate::models::intent::{ChartKind, Intent, IntentKind};
use crate::validation::is_valid_address_for;

// Field names the current prompt asks for come first; the rest are the
// names older prompt revisions produced.
const KIND_KEYS: &[&str] = &["kind", "method", "type"];
const CHAIN_KEYS: &[&str] = &["chain"];
const ADDRESS_KEYS: &[&str] = &["address", "accountAddress"];
const CONTRACT_KEYS: &[&str] = &["contractAddress"];
const OWNER_KEYS: &[&str] = &["ownerAddress"];
const SPENDER_KEYS: &[&str] = &["spenderAddress"];
const CHART_KEYS: &[&str] = &["chartKind", "chartType"];
const REQUIRES_DATA_KEYS: &[&str] = &["requiresExternalData", "requiresData"];
const EXTRA_PARAMS_KEYS: &[&str] = &["extraParams", "params"];

/// [`normalize_intent`] with the primary chain as default.
pub fn normalize(raw: &Value) -> Intent {
    normalize_intent(raw, Chain::PRIMARY)
}

/// Coerces an untrusted intent object (typically parsed LLM output) into a
/// canonical [`Intent`]. Never fails:
///
/// 1. Missing/unknown `kind` (or a non-object input) yields the empty
///    `GeneralQuestion` intent.
/// 2. `extraParams` defaults to empty; non-primitive values are dropped.
/// 3. `requiresExternalData` is always derived from `kind`.
/// 4. Missing or unsupported `chain` becomes the default for the kind.
/// 5. Address fields that fail validation for the chain are dropped.
/// 6. Unknown `chartKind` becomes `None`.
pub fn normalize_intent(raw: &Value, default_chain: Chain) -> Intent {
    let Some(obj) = raw.as_object() else {
        tracing::debug!("raw intent is not an object; falling back to general question");
        return Intent::general_question();
    };

    let kind = match field(obj, KIND_KEYS)
        .and_then(Value::as_str)
        .and_then(IntentKind::parse_lenient)
    {
        Some(kind) if kind.requires_external_data() => kind,
        Some(_) => return Intent::general_question(),
        None => {
            tracing::debug!(raw = %raw, "intent kind missing or unknown");
            return Intent::general_question();
        }
    };

    let mut intent = Intent::new(kind);

    intent.extra_params = field(obj, EXTRA_PARAMS_KEYS)
        .and_then(Value::as_object)
        .map(primitive_params)
        .unwrap_or_default();

    if let Some(Value::Bool(claimed)) = field(obj, REQUIRES_DATA_KEYS) {
        if *claimed != intent.requires_external_data {
            tracing::debug!(kind = %kind, claimed, "ignoring inconsistent requiresExternalData");
        }
    }

    let chain = resolve_chain(kind, field(obj, CHAIN_KEYS), default_chain);
    intent.chain = Some(chain);

    intent.address = address_field(obj, ADDRESS_KEYS, chain);
    intent.contract_address = address_field(obj, CONTRACT_KEYS, chain);
    intent.owner_address = address_field(obj, OWNER_KEYS, chain);
    intent.spender_address = address_field(obj, SPENDER_KEYS, chain);

    intent.chart_kind = field(obj, CHART_KEYS)
        .and_then(Value::as_str)
        .and_then(ChartKind::parse_lenient);

    intent
}

/// First non-null value among `keys`.
fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| obj.get(*key).filter(|v| !v.is_null()))
}

fn resolve_chain(kind: IntentKind, raw: Option<&Value>, default_chain: Chain) -> Chain {
    let parsed = raw
        .and_then(Value::as_str)
        .and_then(|s| s.trim().to_lowercase().parse::<Chain>().ok());
    if let Some(chain) = parsed {
        return chain;
    }

    if raw.is_some() {
        tracing::debug!(chain = ?raw, "unsupported chain in intent; using default");
    }
    kind.default_chain(default_chain)
}

fn address_field(obj: &Map<String, Value>, keys: &[&str], chain: Chain) -> Option<String> {
    let value = field(obj, keys)?;
    match value.as_str() {
        Some(address) if is_valid_address_for(address, chain) => Some(address.to_string()),
        _ => {
            tracing::debug!(address = %value, chain = %chain, "dropping invalid address");
            None
        }
    }
}

/// Keeps strings, numbers, booleans and flat arrays of those.
fn primitive_params(params: &Map<String, Value>) -> Map<String, Value> {
    fn is_primitive(v: &Value) -> bool {
        matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_))
    }

    params
        .iter()
        .filter(|(_, v)| match v {
            Value::Array(items) => items.iter().all(is_primitive),
            other => is_primitive(other),
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
