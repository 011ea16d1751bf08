//! Minting and reading tokens of the Arc image collection through the connected wallet.
//!
//! The collection and its minter share one ABI. Calls are encoded with [`sol!`] bindings and
//! sent as plain `eth_call` / `eth_sendTransaction` requests, so any [`Eip1193Provider`] works.

use crate::{
    error::WalletError,
    provider::{Eip1193Provider, Eip1193ProviderExt, methods},
};
use alloy_primitives::{Address, B256, Bytes, U64, U256};
use alloy_sol_types::{SolCall, SolEvent, sol};
use arc_config::ContractAddresses;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::{borrow::Cow, time::Duration};

sol! {
    interface IArcCollection {
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);

        function totalSupply() external view returns (uint256);
        function ownerOf(uint256 tokenId) external view returns (address);
        function tokenURI(uint256 tokenId) external view returns (string);
        function mintImageNFT(string tokenURI) external returns (uint256);
        function getUserTokens(address user) external view returns (uint256[]);
    }
}

/// Gateway used to turn `ipfs://` URIs into fetchable URLs.
pub const IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// The ownership scan gives up on collections larger than this.
pub const MAX_SCANNED_TOKENS: u64 = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum NftError {
    #[error("the {0} contract address is not configured")]
    MissingContract(&'static str),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("could not decode the result of {method}: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: alloy_sol_types::Error,
    },
    #[error("transaction {0} has no receipt after {1} polls")]
    NotMined(B256, u32),
    #[error("transaction {0} reverted")]
    Reverted(B256),
    #[error("could not determine the token id minted by transaction {0}")]
    TokenIdNotFound(B256),
    #[error("collection has {0} tokens, too many to scan for owners")]
    TooManyTokens(U256),
}

/// How long to wait for a mint to be mined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiptPolicy {
    pub interval: Duration,
    pub polls: u32,
}

impl Default for ReceiptPolicy {
    fn default() -> Self {
        Self { interval: Duration::from_secs(1), polls: 120 }
    }
}

impl ReceiptPolicy {
    /// Polls without sleeping.
    pub fn immediate(polls: u32) -> Self {
        Self { interval: Duration::ZERO, polls }
    }
}

/// A mined mint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub token_id: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NftInfo {
    pub token_id: U256,
    pub token_uri: String,
    pub owner: Address,
}

impl NftInfo {
    /// The token URI, with `ipfs://` rewritten to the public gateway.
    pub fn http_uri(&self) -> Cow<'_, str> {
        ipfs_to_http(&self.token_uri)
    }
}

/// Rewrites `ipfs://<cid>` to a URL on [`IPFS_GATEWAY`]. Other URIs are returned unchanged.
pub fn ipfs_to_http(uri: &str) -> Cow<'_, str> {
    match uri.strip_prefix("ipfs://") {
        Some(path) => Cow::Owned(format!("{IPFS_GATEWAY}{path}")),
        None => Cow::Borrowed(uri),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    block_number: Option<U64>,
    #[serde(default)]
    status: Option<U64>,
    #[serde(default)]
    logs: Vec<ReceiptLog>,
}

#[derive(Debug, Deserialize)]
struct ReceiptLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
}

/// The collection contracts, seen through a wallet.
#[derive(Debug)]
pub struct NftClient<'a, P: ?Sized> {
    provider: &'a P,
    contracts: ContractAddresses,
    policy: ReceiptPolicy,
}

impl<'a, P> NftClient<'a, P>
where
    P: Eip1193Provider + ?Sized,
{
    pub fn new(provider: &'a P, contracts: ContractAddresses) -> Self {
        Self { provider, contracts, policy: ReceiptPolicy::default() }
    }

    pub fn with_policy(mut self, policy: ReceiptPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn nft(&self) -> Result<Address, NftError> {
        self.contracts.nft.ok_or(NftError::MissingContract("NFT"))
    }

    fn minter(&self) -> Result<Address, NftError> {
        self.contracts.minter.ok_or(NftError::MissingContract("minter"))
    }

    /// Mints a token pointing at `token_uri` from `from`, waits for the receipt and returns the
    /// new token id.
    ///
    /// The id is read from a `Transfer` log of the minter, then of the collection. If neither
    /// has one, the id is taken to be `totalSupply() - 1`.
    pub async fn mint(&self, from: Address, token_uri: &str) -> Result<MintReceipt, NftError> {
        let minter = self.minter()?;
        let data = IArcCollection::mintImageNFTCall { tokenURI: token_uri.to_string() };
        let tx = json!([{ "from": from, "to": minter, "data": Bytes::from(data.abi_encode()) }]);
        let tx_hash = self.provider.call(methods::ETH_SEND_TRANSACTION, Some(tx)).await?;
        let tx_hash: B256 = decode_value(methods::ETH_SEND_TRANSACTION, tx_hash)?;
        info!(target: "wallets::nft", %tx_hash, %minter, "mint sent");

        let receipt = self.wait_for_receipt(tx_hash).await?;
        if receipt.status == Some(U64::ZERO) {
            return Err(NftError::Reverted(tx_hash));
        }
        let block_number = receipt.block_number.map(|n| n.to::<u64>());

        let token_id = match self.minted_token_id(&receipt) {
            Some(token_id) => token_id,
            None => self.token_id_from_supply(tx_hash).await?,
        };
        info!(target: "wallets::nft", %tx_hash, %token_id, "mint confirmed");
        Ok(MintReceipt { tx_hash, block_number, token_id })
    }

    /// The tokens owned by `owner`.
    ///
    /// Asks the minter's `getUserTokens` first. If there is no minter or the call fails, every
    /// token id below `totalSupply()` is checked with `ownerOf`; ids that fail are skipped.
    pub async fn user_tokens(&self, owner: Address) -> Result<Vec<U256>, NftError> {
        if let Some(minter) = self.contracts.minter {
            match self.call(minter, IArcCollection::getUserTokensCall { user: owner }).await {
                Ok(tokens) => return Ok(tokens),
                Err(err) => {
                    warn!(target: "wallets::nft", %err, "getUserTokens failed, scanning owners");
                }
            }
        }

        let nft = self.nft()?;
        let supply = self.call(nft, IArcCollection::totalSupplyCall {}).await?;
        let supply = u64::try_from(supply)
            .ok()
            .filter(|n| *n <= MAX_SCANNED_TOKENS)
            .ok_or(NftError::TooManyTokens(supply))?;

        let mut tokens = Vec::new();
        for id in 0..supply {
            let token_id = U256::from(id);
            match self.call(nft, IArcCollection::ownerOfCall { tokenId: token_id }).await {
                Ok(token_owner) if token_owner == owner => tokens.push(token_id),
                Ok(_) => {}
                Err(err) => debug!(target: "wallets::nft", %token_id, %err, "skipping token"),
            }
        }
        Ok(tokens)
    }

    /// The URI and owner of `token_id`.
    pub async fn info(&self, token_id: U256) -> Result<NftInfo, NftError> {
        let nft = self.nft()?;
        let token_uri = self.call(nft, IArcCollection::tokenURICall { tokenId: token_id }).await?;
        let owner = self.call(nft, IArcCollection::ownerOfCall { tokenId: token_id }).await?;
        Ok(NftInfo { token_id, token_uri, owner })
    }

    async fn call<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return, NftError> {
        let params = json!([{ "to": to, "data": Bytes::from(call.abi_encode()) }, "latest"]);
        let ret = self.provider.call(methods::ETH_CALL, Some(params)).await?;
        let ret: Bytes = decode_value(methods::ETH_CALL, ret)?;
        C::abi_decode_returns(&ret)
            .map_err(|source| NftError::Decode { method: C::SIGNATURE, source })
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TransactionReceipt, NftError> {
        for poll in 0..self.policy.polls {
            if poll > 0 {
                tokio::time::sleep(self.policy.interval).await;
            }
            let receipt = self
                .provider
                .call(methods::ETH_GET_TRANSACTION_RECEIPT, Some(json!([tx_hash])))
                .await?;
            if !receipt.is_null() {
                return decode_value(methods::ETH_GET_TRANSACTION_RECEIPT, receipt);
            }
            trace!(target: "wallets::nft", %tx_hash, poll, "receipt pending");
        }
        Err(NftError::NotMined(tx_hash, self.policy.polls))
    }

    fn minted_token_id(&self, receipt: &TransactionReceipt) -> Option<U256> {
        use IArcCollection::Transfer;

        let emitters = [self.contracts.minter, self.contracts.nft];
        emitters.into_iter().flatten().find_map(|emitter| {
            receipt.logs.iter().find_map(|log| {
                let is_transfer = log.topics.first() == Some(&Transfer::SIGNATURE_HASH);
                if log.address != emitter || !is_transfer {
                    return None;
                }
                let transfer = Transfer::decode_raw_log(log.topics.iter().copied(), &log.data);
                transfer.ok().map(|transfer| transfer.tokenId)
            })
        })
    }

    async fn token_id_from_supply(&self, tx_hash: B256) -> Result<U256, NftError> {
        let Some(nft) = self.contracts.nft else {
            return Err(NftError::TokenIdNotFound(tx_hash));
        };
        match self.call(nft, IArcCollection::totalSupplyCall {}).await {
            Ok(supply) if !supply.is_zero() => Ok(supply - U256::from(1)),
            Ok(_) => Err(NftError::TokenIdNotFound(tx_hash)),
            Err(err) => {
                warn!(target: "wallets::nft", %tx_hash, %err, "totalSupply failed after mint");
                Err(NftError::TokenIdNotFound(tx_hash))
            }
        }
    }
}

fn decode_value<T: DeserializeOwned>(method: &'static str, value: Value) -> Result<T, NftError> {
    let malformed = value.to_string();
    serde_json::from_value(value)
        .map_err(|_| WalletError::MalformedResponse { method, value: malformed }.into())
}
