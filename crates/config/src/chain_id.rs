//! Chain id normalization.
//!
//! Wallets report the active chain in several shapes: `eth_chainId` returns a `0x`-prefixed hex
//! string, some libraries hand out decimal strings and others arbitrary-width integers. All of
//! them are folded into a plain [`ChainId`] before any comparison happens.

use alloy_primitives::{ChainId, U256};
use serde_json::Value;

/// A chain id in one of the representations a wallet or client library may produce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawChainId {
    /// An integer of arbitrary width.
    Integer(U256),
    /// A decimal string or a `0x`-prefixed hex string.
    Text(String),
}

impl From<ChainId> for RawChainId {
    fn from(id: ChainId) -> Self {
        Self::Integer(U256::from(id))
    }
}

impl From<U256> for RawChainId {
    fn from(id: U256) -> Self {
        Self::Integer(id)
    }
}

impl From<&str> for RawChainId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RawChainId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChainIdError {
    #[error("chain id {0:?} is neither a decimal nor a 0x-prefixed hex number")]
    Invalid(String),
    #[error("chain id {0} does not fit into 64 bits")]
    Overflow(String),
}

/// Normalizes a chain id into its canonical decimal form.
///
/// `None` stands for a chain id that is not known (yet) and stays `None`; it is never mapped to
/// zero. Strings starting with `0x` (in any case) are read as base 16, all other strings as base
/// 10. Integers wider than 64 bits are rejected instead of being truncated.
///
/// Normalizing an already normalized value returns it unchanged.
pub fn normalize_chain_id<T: Into<RawChainId>>(
    raw: Option<T>,
) -> Result<Option<ChainId>, ChainIdError> {
    let Some(raw) = raw else { return Ok(None) };
    match raw.into() {
        RawChainId::Integer(value) => {
            if value.bit_len() > 64 {
                return Err(ChainIdError::Overflow(value.to_string()));
            }
            Ok(Some(value.as_limbs()[0]))
        }
        RawChainId::Text(s) => parse_chain_id(&s).map(Some),
    }
}

/// Parses a decimal or `0x`-prefixed hex chain id string.
pub fn parse_chain_id(s: &str) -> Result<ChainId, ChainIdError> {
    let trimmed = s.trim();
    let (digits, radix) = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (trimmed, 10),
    };

    let is_digit = |b: u8| if radix == 16 { b.is_ascii_hexdigit() } else { b.is_ascii_digit() };
    if digits.is_empty() || !digits.bytes().all(is_digit) {
        return Err(ChainIdError::Invalid(s.to_string()));
    }

    // only overflow is left once the digits are validated
    ChainId::from_str_radix(digits, radix).map_err(|_| ChainIdError::Overflow(s.to_string()))
}

/// Normalizes a chain id as it appears in a JSON-RPC result or event payload.
pub fn chain_id_from_json(value: &Value) -> Result<Option<ChainId>, ChainIdError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => parse_chain_id(s).map(Some),
        Value::Number(n) => {
            if let Some(id) = n.as_u64() {
                return Ok(Some(id));
            }
            let repr = n.to_string();
            if repr.bytes().all(|b| b.is_ascii_digit()) {
                Err(ChainIdError::Overflow(repr))
            } else {
                Err(ChainIdError::Invalid(repr))
            }
        }
        other => Err(ChainIdError::Invalid(other.to_string())),
    }
}

/// Renders a chain id the way wallets expect it in `wallet_*` requests, e.g. `0x4cef52`.
pub fn to_hex_chain_id(id: ChainId) -> String {
    format!("{id:#x}")
}
