//! Connecting to a wallet and tracking what it reports afterwards.

use crate::{
    error::WalletError,
    provider::{Eip1193Provider, Eip1193ProviderExt, ProviderEvent, parse_account},
    reconcile::NetworkReconciler,
    selection::{InjectedEthereum, InjectedProvider, ProviderSelector},
};
use alloy_primitives::{Address, ChainId};
use arc_config::{Config, normalize_chain_id};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

/// What is known about the connected wallet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletState {
    pub address: Option<Address>,
    pub chain_id: Option<ChainId>,
    pub is_connected: bool,
}

impl WalletState {
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Forgets the wallet. Wallets have no disconnect method, so this is local only.
    pub fn disconnect(&mut self) {
        *self = Self::disconnected();
    }

    /// Updates the state from a provider event.
    pub fn apply(&mut self, event: &ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    debug!(target: "wallets::session", "wallet locked or disconnected");
                    self.disconnect();
                }
                Some(account) => match parse_account(account) {
                    Ok(address) => {
                        self.address = Some(address);
                        self.is_connected = true;
                    }
                    Err(err) => warn!(target: "wallets::session", %err, "ignoring accountsChanged"),
                },
            },
            ProviderEvent::ChainChanged(chain_id) => {
                match normalize_chain_id(Some(chain_id.as_str())) {
                    Ok(id) => self.chain_id = id,
                    Err(err) => warn!(target: "wallets::session", %err, "ignoring chainChanged"),
                }
            }
            ProviderEvent::Disconnect(err) => {
                debug!(target: "wallets::session", %err, "provider disconnected");
                self.disconnect();
            }
        }
    }
}

/// Asks the wallet for its accounts, brings it onto the reconciler's chain and returns the
/// resulting state.
pub async fn connect<P>(
    provider: &P,
    reconciler: &NetworkReconciler<'_>,
) -> Result<WalletState, WalletError>
where
    P: Eip1193Provider + ?Sized,
{
    let accounts = provider.request_accounts().await?;
    let Some(&address) = accounts.first() else {
        return Err(WalletError::NoAccounts);
    };
    reconciler.reconcile(provider).await?;
    let chain_id = provider.chain_id().await?;
    info!(target: "wallets::session", %address, ?chain_id, "wallet connected");
    Ok(WalletState { address: Some(address), chain_id, is_connected: true })
}

/// Picks a wallet among the injected ones as `config` ranks them, then [`connect`]s it.
pub async fn connect_injected<'a>(
    injected: Option<&'a InjectedEthereum>,
    config: &Config,
) -> Result<(&'a InjectedProvider, WalletState), WalletError> {
    let selected = ProviderSelector::from_config(config).select(injected)?;
    let reconciler = NetworkReconciler::from_config(config);
    let state = connect(selected.provider.as_ref(), &reconciler).await?;
    Ok((selected, state))
}

/// Reads the state of a wallet that may already be connected, without prompting.
///
/// Failures are logged and reported as a disconnected wallet.
pub async fn current_state<P>(provider: &P) -> WalletState
where
    P: Eip1193Provider + ?Sized,
{
    let accounts = match provider.accounts().await {
        Ok(accounts) => accounts,
        Err(err) => {
            error!(target: "wallets::session", %err, "failed to read accounts");
            return WalletState::disconnected();
        }
    };
    let Some(&address) = accounts.first() else {
        return WalletState::disconnected();
    };
    match provider.chain_id().await {
        Ok(chain_id) => WalletState { address: Some(address), chain_id, is_connected: true },
        Err(err) => {
            error!(target: "wallets::session", %err, "failed to read chain id");
            WalletState::disconnected()
        }
    }
}

/// A [`WalletState`] shared between the event watcher and its readers.
#[derive(Clone, Debug, Default)]
pub struct SharedWalletState(Arc<RwLock<WalletState>>);

impl SharedWalletState {
    pub fn new(state: WalletState) -> Self {
        Self(Arc::new(RwLock::new(state)))
    }

    /// A snapshot of the current state.
    pub fn get(&self) -> WalletState {
        *self.0.read()
    }

    pub fn set(&self, state: WalletState) {
        *self.0.write() = state;
    }

    pub fn apply(&self, event: &ProviderEvent) {
        self.0.write().apply(event);
    }

    pub fn disconnect(&self) {
        self.0.write().disconnect();
    }
}

/// Keeps a [`SharedWalletState`] in sync with a provider's events.
#[derive(Debug)]
pub struct WalletWatcher {
    events: broadcast::Receiver<ProviderEvent>,
    state: SharedWalletState,
}

impl WalletWatcher {
    /// Subscribes to `provider`, starting from `initial`.
    pub fn new<P>(provider: &P, initial: WalletState) -> Self
    where
        P: Eip1193Provider + ?Sized,
    {
        Self { events: provider.subscribe(), state: SharedWalletState::new(initial) }
    }

    /// A handle to the watched state.
    pub fn state(&self) -> SharedWalletState {
        self.state.clone()
    }

    /// Applies events until the provider drops its sender, then returns the final state.
    pub async fn run(mut self) -> WalletState {
        loop {
            match self.events.recv().await {
                Ok(event) => {
                    trace!(target: "wallets::session", ?event, "provider event");
                    self.state.apply(&event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: "wallets::session", skipped, "missed provider events");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!(target: "wallets::session", "provider event stream closed");
        self.state.get()
    }
}
