//! Where the NFT collection lives.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Deployed addresses of the collection contracts. Both are unset by default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractAddresses {
    /// The ERC-721 collection.
    pub nft: Option<Address>,
    /// Mints into the collection on behalf of the sender and indexes tokens by minter.
    pub minter: Option<Address>,
}
