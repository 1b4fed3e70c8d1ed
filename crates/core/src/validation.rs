//! Pure predicates over chain names and account addresses, plus the
//! inbound-request checks built on them.

use crate::errors::CoreError;
use crate::models::chain::{Chain, ChainFamily};
use crate::models::chat::ChatRequest;

pub const MAX_MESSAGE_CHARS: usize = 1000;
pub const MAX_SESSION_ID_CHARS: usize = 100;

const EVM_ADDRESS_LEN: usize = 42;
const LEDGER_ADDRESS_LEN: std::ops::RangeInclusive<usize> = 25..=35;
const LEDGER_ADDRESS_PREFIX: char = 'r';

/// True iff `name` is exactly one of the supported chain names.
pub fn is_supported_chain(name: &str) -> bool {
    Chain::ALL.iter().any(|c| c.as_str() == name)
}

/// Format check for an account address of the given chain family.
///
/// - EVM: exactly `0x` followed by 40 hex digits (either case).
/// - Ledger: 25..=35 characters, starting with `r`.
pub fn is_valid_account_address(address: &str, family: ChainFamily) -> bool {
    match family {
        ChainFamily::Evm => {
            address.len() == EVM_ADDRESS_LEN
                && address.starts_with("0x")
                && address[2..].chars().all(|c| c.is_ascii_hexdigit())
        }
        ChainFamily::Ledger => {
            LEDGER_ADDRESS_LEN.contains(&address.chars().count())
                && address.starts_with(LEDGER_ADDRESS_PREFIX)
        }
    }
}

/// [`is_valid_account_address`] for the family of `chain`.
pub fn is_valid_address_for(address: &str, chain: Chain) -> bool {
    is_valid_account_address(address, chain.family())
}

/// Checks `address` for `chain`, naming `field` in the error.
pub fn require_valid_address(field: &str, address: &str, chain: Chain) -> Result<(), CoreError> {
    if is_valid_address_for(address, chain) {
        Ok(())
    } else {
        Err(CoreError::validation(
            field,
            format!("'{address}' is not a valid {chain} address"),
        ))
    }
}

/// Inbound chat message checks: non-empty message of at most
/// [`MAX_MESSAGE_CHARS`], optional session id of at most
/// [`MAX_SESSION_ID_CHARS`].
pub fn validate_chat_request(request: &ChatRequest) -> Result<(), CoreError> {
    let len = request.message.chars().count();
    if request.message.trim().is_empty() {
        return Err(CoreError::validation("message", "must not be empty"));
    }
    if len > MAX_MESSAGE_CHARS {
        return Err(CoreError::validation(
            "message",
            format!("must be at most {MAX_MESSAGE_CHARS} characters (got {len})"),
        ));
    }
    if let Some(session_id) = &request.session_id {
        if session_id.chars().count() > MAX_SESSION_ID_CHARS {
            return Err(CoreError::validation(
                "sessionId",
                format!("must be at most {MAX_SESSION_ID_CHARS} characters"),
            ));
        }
    }
    Ok(())
}
