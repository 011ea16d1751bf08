//! # arc-wallets
//!
//! Bringing an EIP-1193 wallet onto the Arc network.
//!
//! The wallet is always supplied by the caller as an [`Eip1193Provider`]; this crate only
//! borrows it. [`NetworkReconciler`] is the entry point: it reads the active chain, asks the
//! wallet to switch, registers the chain if the wallet does not know it, and verifies the result.
//!
//! ```no_run
//! # async fn run(wallet: &dyn arc_wallets::Eip1193Provider) -> Result<(), arc_wallets::WalletError> {
//! let config = arc_config::Config::load().expect("valid config");
//! let rec = arc_wallets::NetworkReconciler::from_config(&config).reconcile(wallet).await?;
//! println!("on chain {} ({:?})", rec.chain_id, rec.outcome);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod error;
pub use error::{
    AddChainFailure, ProviderErrorCode, ProviderRpcError, WalletError, WalletErrorKind,
};

pub mod provider;
pub use provider::{Eip1193Provider, Eip1193ProviderExt, ProviderEvent, RequestArguments};

pub mod reconcile;
pub use reconcile::{
    NetworkReconciler, ReconcileOutcome, ReconcileState, Reconciliation, ReconciliationResult,
    VerifyPolicy,
};

pub mod selection;
pub use selection::{
    InjectedEthereum, InjectedProvider, ProviderSelector, SelectionRule, WalletFlags,
};

pub mod session;
pub use session::{SharedWalletState, WalletState, WalletWatcher};

mod http;
pub use http::HttpProvider;

mod stats;
pub use stats::NetworkStats;

pub mod nft;
pub use nft::{MintReceipt, NftClient, NftError, NftInfo, ReceiptPolicy};

pub use arc_config::{ChainIdError, RawChainId, normalize_chain_id, to_hex_chain_id};
