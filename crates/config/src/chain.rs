//! The statically configured network the wallet must be brought onto.

use crate::chain_id::{ChainIdError, parse_chain_id, to_hex_chain_id};
use alloy_primitives::ChainId;
use serde::{Deserialize, Serialize};
use url::Url;

/// Chain id of the Arc Testnet.
pub const ARC_TESTNET_CHAIN_ID: ChainId = 5042002;

/// The token used to pay transaction fees on a chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    /// Not necessarily 18, USDC on Arc uses 6.
    pub decimals: u8,
}

/// Everything a wallet needs to know to switch to, or register, a chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainProfile {
    /// Canonical decimal chain id.
    pub chain_id: ChainId,
    /// The same chain id as a `0x`-prefixed hex string, sent verbatim to the wallet.
    pub chain_id_hex: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    /// RPC endpoints in the order they are offered to the wallet when registering the chain.
    pub rpc_urls: Vec<String>,
    /// Display only.
    #[serde(default)]
    pub block_explorer_urls: Vec<String>,
}

impl Default for ChainProfile {
    fn default() -> Self {
        Self::arc_testnet()
    }
}

impl ChainProfile {
    /// The Arc Testnet profile.
    pub fn arc_testnet() -> Self {
        Self {
            chain_id: ARC_TESTNET_CHAIN_ID,
            chain_id_hex: to_hex_chain_id(ARC_TESTNET_CHAIN_ID),
            chain_name: "Arc Testnet".to_string(),
            native_currency: NativeCurrency {
                name: "USDC".to_string(),
                symbol: "USDC".to_string(),
                decimals: 6,
            },
            rpc_urls: vec![
                "https://rpc.testnet.arc.network".to_string(),
                "https://rpc.blockdaemon.testnet.arc.network".to_string(),
                "https://rpc.drpc.testnet.arc.network".to_string(),
                "https://rpc.quicknode.testnet.arc.network".to_string(),
            ],
            block_explorer_urls: vec!["https://testnet.arcscan.app".to_string()],
        }
    }

    /// Returns `true` if `chain_id` is this profile's chain.
    pub fn is_chain(&self, chain_id: Option<ChainId>) -> bool {
        chain_id == Some(self.chain_id)
    }

    /// Checks the invariants of the profile.
    ///
    /// A failure here is a configuration defect and should abort startup.
    pub fn validate(&self) -> Result<(), ChainProfileError> {
        if self.chain_id == 0 {
            return Err(ChainProfileError::ZeroChainId);
        }

        if !self.chain_id_hex.starts_with("0x") && !self.chain_id_hex.starts_with("0X") {
            return Err(ChainProfileError::HexNotPrefixed(self.chain_id_hex.clone()));
        }
        let parsed = parse_chain_id(&self.chain_id_hex)?;
        if parsed != self.chain_id {
            return Err(ChainProfileError::HexMismatch {
                hex: self.chain_id_hex.clone(),
                parsed,
                expected: self.chain_id,
            });
        }

        if self.chain_name.trim().is_empty() {
            return Err(ChainProfileError::EmptyName);
        }

        if self.rpc_urls.is_empty() {
            return Err(ChainProfileError::NoRpcUrls);
        }
        for url in &self.rpc_urls {
            let parsed = Url::parse(url)
                .map_err(|err| ChainProfileError::InvalidRpcUrl(url.clone(), err.to_string()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ChainProfileError::InvalidRpcUrl(
                    url.clone(),
                    format!("unsupported scheme `{}`", parsed.scheme()),
                ));
            }
        }
        for url in &self.block_explorer_urls {
            if let Err(err) = Url::parse(url) {
                return Err(ChainProfileError::InvalidExplorerUrl(url.clone(), err.to_string()));
            }
        }

        Ok(())
    }
}

/// A chain profile that violates its invariants.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChainProfileError {
    #[error("chain id must be positive")]
    ZeroChainId,
    #[error("chain id hex {0:?} must start with 0x")]
    HexNotPrefixed(String),
    #[error("chain id hex {hex:?} encodes {parsed}, but the profile's chain id is {expected}")]
    HexMismatch { hex: String, parsed: ChainId, expected: ChainId },
    #[error(transparent)]
    ChainId(#[from] ChainIdError),
    #[error("chain name must not be empty")]
    EmptyName,
    #[error("at least one RPC URL is required")]
    NoRpcUrls,
    #[error("invalid RPC URL {0:?}: {1}")]
    InvalidRpcUrl(String, String),
    #[error("invalid block explorer URL {0:?}: {1}")]
    InvalidExplorerUrl(String, String),
}

impl ChainProfileError {
    /// The config key of the offending value.
    pub fn setting(&self) -> &'static str {
        match self {
            Self::ZeroChainId => "chain.chain_id",
            Self::HexNotPrefixed(_) | Self::HexMismatch { .. } | Self::ChainId(_) => {
                "chain.chain_id_hex"
            }
            Self::EmptyName => "chain.chain_name",
            Self::NoRpcUrls | Self::InvalidRpcUrl(..) => "chain.rpc_urls",
            Self::InvalidExplorerUrl(..) => "chain.block_explorer_urls",
        }
    }
}
