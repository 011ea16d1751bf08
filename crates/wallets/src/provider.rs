//! The EIP-1193 provider abstraction.
//!
//! Reference: <https://eips.ethereum.org/EIPS/eip-1193>

use crate::error::{ProviderRpcError, WalletError};
use alloy_primitives::{Address, ChainId};
use arc_config::chain_id_from_json;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use tokio::sync::broadcast;

/// Wallet methods used by this crate.
pub mod methods {
    pub const ETH_CHAIN_ID: &str = "eth_chainId";
    pub const ETH_ACCOUNTS: &str = "eth_accounts";
    pub const ETH_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const ETH_BLOCK_NUMBER: &str = "eth_blockNumber";
    pub const ETH_GAS_PRICE: &str = "eth_gasPrice";
    pub const ETH_CALL: &str = "eth_call";
    pub const ETH_SEND_TRANSACTION: &str = "eth_sendTransaction";
    pub const ETH_GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";
    pub const WALLET_SWITCH_ETHEREUM_CHAIN: &str = "wallet_switchEthereumChain";
    pub const WALLET_ADD_ETHEREUM_CHAIN: &str = "wallet_addEthereumChain";
}

/// The argument of `provider.request(..)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestArguments {
    pub method: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RequestArguments {
    /// A request without params.
    pub fn new(method: impl Into<Cow<'static, str>>) -> Self {
        Self { method: method.into(), params: None }
    }

    /// Attaches params, usually a JSON array.
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// Events emitted by a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    /// `accountsChanged`, the new list of exposed accounts. Empty once the wallet is locked.
    AccountsChanged(Vec<String>),
    /// `chainChanged`, the new chain id as a hex string.
    ChainChanged(String),
    /// `disconnect`, the provider lost connection to all chains.
    Disconnect(ProviderRpcError),
}

/// An EIP-1193 provider.
///
/// Implementations are supplied from the outside and only ever borrowed; nothing in this crate
/// closes or invalidates a provider.
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    /// Submits a request to the wallet and waits until it settles.
    ///
    /// Requests that open a wallet prompt may take arbitrarily long.
    async fn request(&self, args: RequestArguments) -> Result<Value, ProviderRpcError>;

    /// Subscribes to `accountsChanged`, `chainChanged` and `disconnect`.
    ///
    /// Dropping the receiver removes the listener.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Typed helpers on top of [`Eip1193Provider::request`].
#[async_trait]
pub trait Eip1193ProviderExt: Eip1193Provider {
    /// Sends `method` with optional params.
    async fn call(
        &self,
        method: &'static str,
        params: Option<Value>,
    ) -> Result<Value, WalletError> {
        let mut args = RequestArguments::new(method);
        args.params = params;
        trace!(target: "wallets::provider", %method, params = ?args.params, "request");
        let res = self.request(args).await;
        match &res {
            Ok(value) => trace!(target: "wallets::provider", %method, %value, "response"),
            Err(err) => debug!(target: "wallets::provider", %method, %err, "request failed"),
        }
        Ok(res?)
    }

    /// `eth_chainId`, normalized. `None` if the wallet reports no chain.
    async fn chain_id(&self) -> Result<Option<ChainId>, WalletError> {
        let value = self.call(methods::ETH_CHAIN_ID, None).await?;
        Ok(chain_id_from_json(&value)?)
    }

    /// `eth_accounts`, the accounts exposed without prompting.
    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        let value = self.call(methods::ETH_ACCOUNTS, None).await?;
        parse_accounts(methods::ETH_ACCOUNTS, value)
    }

    /// `eth_requestAccounts`, which may prompt the user to connect.
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let value = self.call(methods::ETH_REQUEST_ACCOUNTS, None).await?;
        parse_accounts(methods::ETH_REQUEST_ACCOUNTS, value)
    }
}

impl<P: Eip1193Provider + ?Sized> Eip1193ProviderExt for P {}

/// Parses a JSON array of account strings.
pub(crate) fn parse_accounts(
    method: &'static str,
    value: Value,
) -> Result<Vec<Address>, WalletError> {
    let Value::Array(items) = value else {
        return Err(WalletError::MalformedResponse { method, value: value.to_string() });
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => parse_account(&s),
            other => Err(WalletError::InvalidAccount(other.to_string())),
        })
        .collect()
}

/// Parses a single account; the checksum is not enforced since wallets commonly report lowercase.
pub(crate) fn parse_account(s: &str) -> Result<Address, WalletError> {
    s.parse::<Address>().map_err(|_| WalletError::InvalidAccount(s.to_string()))
}
