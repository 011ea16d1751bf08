//! Provider error bindings and the wallet error taxonomy.

use alloy_primitives::ChainId;
use arc_config::ChainIdError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An error returned by an EIP-1193 provider, shaped like a JSON-RPC error object.
///
/// The code and message are kept exactly as the wallet reported them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {})", .code.code())]
pub struct ProviderRpcError {
    pub code: ProviderErrorCode,
    /// error message
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ProviderRpcError {
    /// New [`ProviderRpcError`] with the given [`ProviderErrorCode`] and its default message.
    pub fn new(code: ProviderErrorCode) -> Self {
        Self { message: code.message().to_string(), code, data: None }
    }

    /// New [`ProviderRpcError`] with a custom message.
    pub fn with_message<M>(code: impl Into<ProviderErrorCode>, message: M) -> Self
    where
        M: Into<String>,
    {
        Self { code: code.into(), message: message.into(), data: None }
    }

    /// Creates a new `UserRejectedRequest` error.
    pub fn user_rejected() -> Self {
        Self::new(ProviderErrorCode::UserRejectedRequest)
    }

    /// Creates a new `UnrecognizedChain` error.
    pub fn unrecognized_chain() -> Self {
        Self::new(ProviderErrorCode::UnrecognizedChain)
    }

    /// Creates a new `MethodNotFound` error.
    pub fn method_not_found() -> Self {
        Self::new(ProviderErrorCode::MethodNotFound)
    }

    /// Creates a new `InternalError` error with a message.
    pub fn internal_error_with<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self::with_message(ProviderErrorCode::InternalError, message)
    }

    /// Returns `true` if the human operator declined the wallet prompt.
    pub fn is_user_rejected(&self) -> bool {
        self.code == ProviderErrorCode::UserRejectedRequest
    }

    /// Returns `true` if the wallet does not know the requested chain.
    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == ProviderErrorCode::UnrecognizedChain
    }
}

/// Error codes defined by EIP-1193 and JSON-RPC 2.0.
///
/// See also <https://github.com/MetaMask/rpc-errors/blob/main/src/error-constants.ts>
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The user rejected the request.
    UserRejectedRequest,
    /// The requested method and/or account has not been authorized by the user.
    Unauthorized,
    /// The provider does not support the requested method.
    UnsupportedMethod,
    /// The provider is disconnected from all chains.
    Disconnected,
    /// The provider is not connected to the requested chain.
    ChainDisconnected,
    /// The wallet does not know the requested chain; it has to be added first.
    UnrecognizedChain,
    /// Invalid JSON was received.
    ParseError,
    /// The JSON sent is not a valid request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameter(s).
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// Any other code.
    Other(i64),
}

impl ProviderErrorCode {
    /// Returns the error code as `i64`
    pub fn code(&self) -> i64 {
        match *self {
            Self::UserRejectedRequest => 4001,
            Self::Unauthorized => 4100,
            Self::UnsupportedMethod => 4200,
            Self::Disconnected => 4900,
            Self::ChainDisconnected => 4901,
            Self::UnrecognizedChain => 4902,
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::Other(c) => c,
        }
    }

    /// Returns the message associated with the error
    pub const fn message(&self) -> &'static str {
        match *self {
            Self::UserRejectedRequest => "User rejected the request",
            Self::Unauthorized => "Unauthorized",
            Self::UnsupportedMethod => "Unsupported method",
            Self::Disconnected => "Disconnected",
            Self::ChainDisconnected => "Chain disconnected",
            Self::UnrecognizedChain => "Unrecognized chain",
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::Other(_) => "Provider error",
        }
    }
}

impl Serialize for ProviderErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.code())
    }
}

impl<'a> Deserialize<'a> for ProviderErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'a>,
    {
        i64::deserialize(deserializer).map(Into::into)
    }
}

impl From<i64> for ProviderErrorCode {
    fn from(code: i64) -> Self {
        match code {
            4001 => Self::UserRejectedRequest,
            4100 => Self::Unauthorized,
            4200 => Self::UnsupportedMethod,
            4900 => Self::Disconnected,
            4901 => Self::ChainDisconnected,
            4902 => Self::UnrecognizedChain,
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            _ => Self::Other(code),
        }
    }
}

/// Why a single `wallet_addEthereumChain` attempt did not bring the wallet onto the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddChainFailure {
    /// The wallet answered the request with an error.
    Rpc(ProviderRpcError),
    /// The wallet acknowledged the request, but another chain is still active.
    Mismatch { actual: Option<ChainId> },
}

impl fmt::Display for AddChainFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rpc(err) => fmt::Display::fmt(err, f),
            Self::Mismatch { actual } => {
                write!(f, "wallet still reports chain {}", DisplayChain(actual))
            }
        }
    }
}

/// Coarse classification of a [`WalletError`], used to decide how to present it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalletErrorKind {
    UserRejected,
    ChainUnrecognized,
    ProviderUnavailable,
    VerificationMismatch,
    Transport,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("no wallet provider available, please install MetaMask or Rabby")]
    ProviderUnavailable,
    #[error("request rejected in the wallet: {0}")]
    UserRejected(ProviderRpcError),
    #[error(
        "wallet reported success but chain {} is active instead of {expected}; please switch networks manually",
        DisplayChain(.actual)
    )]
    VerificationMismatch { expected: ChainId, actual: Option<ChainId> },
    #[error(
        "failed to add {chain_name} after {attempts} attempt(s), please add the network manually in your wallet: {last}"
    )]
    AddChainExhausted { chain_name: String, attempts: usize, last: AddChainFailure },
    #[error("no accounts found, please unlock your wallet")]
    NoAccounts,
    #[error("wallet returned an invalid account {0:?}")]
    InvalidAccount(String),
    #[error("malformed `{method}` response: {value}")]
    MalformedResponse { method: &'static str, value: String },
    #[error("wallet returned a malformed chain id: {0}")]
    MalformedChainId(#[from] ChainIdError),
    #[error(transparent)]
    Provider(ProviderRpcError),
}

impl From<ProviderRpcError> for WalletError {
    fn from(err: ProviderRpcError) -> Self {
        if err.is_user_rejected() { Self::UserRejected(err) } else { Self::Provider(err) }
    }
}

impl WalletError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> WalletErrorKind {
        match self {
            Self::ProviderUnavailable => WalletErrorKind::ProviderUnavailable,
            Self::UserRejected(_) => WalletErrorKind::UserRejected,
            Self::VerificationMismatch { .. } => WalletErrorKind::VerificationMismatch,
            Self::AddChainExhausted { .. } => WalletErrorKind::ChainUnrecognized,
            Self::NoAccounts
            | Self::InvalidAccount(_)
            | Self::MalformedResponse { .. }
            | Self::MalformedChainId(_)
            | Self::Provider(_) => WalletErrorKind::Transport,
        }
    }

    /// Returns the provider error this error carries unchanged, if any.
    pub fn rpc_error(&self) -> Option<&ProviderRpcError> {
        match self {
            Self::UserRejected(err) | Self::Provider(err) => Some(err),
            Self::AddChainExhausted { last: AddChainFailure::Rpc(err), .. } => Some(err),
            _ => None,
        }
    }

    /// The chain the wallet was last seen on, if the error knows it.
    pub fn observed_chain_id(&self) -> Option<ChainId> {
        match self {
            Self::VerificationMismatch { actual, .. } => *actual,
            Self::AddChainExhausted { last: AddChainFailure::Mismatch { actual }, .. } => *actual,
            _ => None,
        }
    }
}

struct DisplayChain<'a>(&'a Option<ChainId>);

impl fmt::Display for DisplayChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => fmt::Display::fmt(&id, f),
            None => f.write_str("<unknown>"),
        }
    }
}
