//! Bringing a wallet onto the configured chain.
//!
//! The reconciler reads the active chain, and if it differs from the [`ChainProfile`] asks the
//! wallet to switch. A wallet that does not know the chain (`4902`) is asked to register it, once
//! per configured RPC URL and strictly in order, until one attempt is verified. Every switch or
//! add acknowledgment is verified by reading the chain id again; the wallet's word alone is never
//! trusted.
//!
//! Requests are sent one at a time and each is awaited until it settles, since wallets cannot
//! handle overlapping prompts. Callers must not run two reconciliations against the same wallet
//! concurrently.

use crate::{
    error::{AddChainFailure, ProviderRpcError, WalletError},
    provider::{Eip1193Provider, Eip1193ProviderExt, RequestArguments, methods},
};
use alloy_primitives::ChainId;
use arc_config::{ChainProfile, Config, NativeCurrency};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

/// How a successful switch or add is verified.
///
/// Wallets apply a switch asynchronously, so the chain id is only re-read after `settle_delay`.
/// If it does not match yet it is polled again, up to `polls` reads in total, doubling the wait
/// every time. The exact timing is wallet dependent; these are tunables, not guarantees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifyPolicy {
    pub settle_delay: Duration,
    pub polls: u32,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self { settle_delay: Duration::from_millis(Config::DEFAULT_SETTLE_DELAY_MS), polls: 1 }
    }
}

impl VerifyPolicy {
    /// The policy configured in `config`.
    pub fn from_config(config: &Config) -> Self {
        Self { settle_delay: config.settle_delay(), polls: config.verify_polls }
    }

    /// Re-reads the chain immediately, for wallets that switch synchronously and for tests.
    pub fn immediate() -> Self {
        Self { settle_delay: Duration::ZERO, polls: 1 }
    }
}

/// The states of a reconciliation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileState {
    /// The chain id has not been read yet.
    Unknown,
    /// `eth_chainId` in flight.
    Querying,
    /// The wallet is on the required chain.
    Matched,
    /// The wallet is on another chain.
    Mismatched,
    /// `wallet_switchEthereumChain` in flight.
    Switching,
    /// Re-reading the chain id after the wallet acknowledged the switch.
    SwitchVerifying,
    /// The wallet does not know the chain.
    Unrecognized,
    /// `wallet_addEthereumChain` in flight with the RPC URL at this index.
    AddingChain(usize),
    /// Re-reading the chain id after the wallet acknowledged the add with the RPC URL at this
    /// index.
    AddVerifying(usize),
    /// The run gave up.
    Failed,
}

impl ReconcileState {
    /// Returns `true` for `Matched` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Matched | Self::Failed)
    }
}

/// How the wallet ended up on the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing had to be done.
    AlreadyOnChain,
    /// The wallet switched to a chain it already knew.
    Switched,
    /// The chain was registered using this RPC URL.
    Added { rpc_url: String },
}

/// A successful reconciliation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    /// The verified active chain, always the profile's chain.
    pub chain_id: ChainId,
    pub outcome: ReconcileOutcome,
    /// Number of `wallet_switchEthereumChain` requests sent.
    pub switch_attempts: usize,
    /// Number of `wallet_addEthereumChain` requests sent.
    pub add_attempts: usize,
    /// Every state the run went through, ending in [`ReconcileState::Matched`].
    pub trace: Vec<ReconcileState>,
}

/// The flat summary of a run handed to UI code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub success: bool,
    pub final_chain_id: Option<ChainId>,
}

impl From<&Result<Reconciliation, WalletError>> for ReconciliationResult {
    fn from(res: &Result<Reconciliation, WalletError>) -> Self {
        match res {
            Ok(rec) => Self { success: true, final_chain_id: Some(rec.chain_id) },
            Err(err) => Self { success: false, final_chain_id: err.observed_chain_id() },
        }
    }
}

/// Params of `wallet_switchEthereumChain`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchEthereumChainParameter<'a> {
    pub chain_id: &'a str,
}

/// Params of `wallet_addEthereumChain`, see EIP-3085.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEthereumChainParameter<'a> {
    pub chain_id: &'a str,
    pub chain_name: &'a str,
    pub native_currency: &'a NativeCurrency,
    pub rpc_urls: [&'a str; 1],
    #[serde(skip_serializing_if = "is_empty")]
    pub block_explorer_urls: &'a [String],
}

impl<'a> AddEthereumChainParameter<'a> {
    /// The full profile, offering only `rpc_url` as endpoint.
    pub fn new(profile: &'a ChainProfile, rpc_url: &'a str) -> Self {
        Self {
            chain_id: &profile.chain_id_hex,
            chain_name: &profile.chain_name,
            native_currency: &profile.native_currency,
            rpc_urls: [rpc_url],
            block_explorer_urls: &profile.block_explorer_urls,
        }
    }
}

/// Brings wallets onto the chain described by a [`ChainProfile`].
#[derive(Clone, Debug)]
pub struct NetworkReconciler<'a> {
    profile: &'a ChainProfile,
    policy: VerifyPolicy,
}

impl<'a> NetworkReconciler<'a> {
    pub fn new(profile: &'a ChainProfile) -> Self {
        Self { profile, policy: VerifyPolicy::default() }
    }

    /// Uses the profile and verification policy from `config`.
    pub fn from_config(config: &'a Config) -> Self {
        Self { profile: &config.chain, policy: VerifyPolicy::from_config(config) }
    }

    pub fn with_policy(mut self, policy: VerifyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn profile(&self) -> &'a ChainProfile {
        self.profile
    }

    pub fn policy(&self) -> VerifyPolicy {
        self.policy
    }

    /// Like [`reconcile`](Self::reconcile), but fails with [`WalletError::ProviderUnavailable`]
    /// if there is no provider at all.
    pub async fn ensure<P>(&self, provider: Option<&P>) -> Result<Reconciliation, WalletError>
    where
        P: Eip1193Provider + ?Sized,
    {
        let Some(provider) = provider else {
            warn!(target: "wallets::reconcile", "no wallet provider available");
            return Err(WalletError::ProviderUnavailable);
        };
        self.reconcile(provider).await
    }

    /// Runs the reconciliation to a terminal state.
    ///
    /// Errors other than `4902` on the switch are returned unchanged. A failed add, or a failed
    /// read of the chain id after an add, moves on to the next RPC URL. A `4001` rejection on any
    /// request ends the run immediately. At most one switch and `rpc_urls.len()` add requests are
    /// sent.
    pub async fn reconcile<P>(&self, provider: &P) -> Result<Reconciliation, WalletError>
    where
        P: Eip1193Provider + ?Sized,
    {
        let profile = self.profile;
        let mut run = Run::default();
        let mut state = ReconcileState::Unknown;

        loop {
            run.enter(state);
            state = match state {
                ReconcileState::Unknown => ReconcileState::Querying,
                ReconcileState::Querying => {
                    let current = provider.chain_id().await.map_err(|err| run.fail(err))?;
                    debug!(
                        target: "wallets::reconcile",
                        current = ?current,
                        expected = profile.chain_id,
                        "read active chain"
                    );
                    if profile.is_chain(current) {
                        ReconcileState::Matched
                    } else {
                        ReconcileState::Mismatched
                    }
                }
                ReconcileState::Matched => {
                    info!(
                        target: "wallets::reconcile",
                        chain = %profile.chain_name,
                        outcome = ?run.outcome,
                        "wallet is on the required chain"
                    );
                    return Ok(run.finish(profile.chain_id));
                }
                ReconcileState::Mismatched => ReconcileState::Switching,
                ReconcileState::Switching => {
                    run.switch_attempts += 1;
                    let params = SwitchEthereumChainParameter { chain_id: &profile.chain_id_hex };
                    match provider.request(switch_request(&params)).await {
                        Ok(_) => ReconcileState::SwitchVerifying,
                        Err(err) if err.is_unrecognized_chain() => {
                            debug!(
                                target: "wallets::reconcile",
                                %err,
                                "chain unknown to the wallet"
                            );
                            run.last_add_failure = Some(AddChainFailure::Rpc(err));
                            ReconcileState::Unrecognized
                        }
                        Err(err) => return Err(run.fail(err.into())),
                    }
                }
                ReconcileState::SwitchVerifying => {
                    let actual = self.verify(provider).await.map_err(|err| run.fail(err))?;
                    if !profile.is_chain(actual) {
                        return Err(run.fail(WalletError::VerificationMismatch {
                            expected: profile.chain_id,
                            actual,
                        }));
                    }
                    run.outcome = ReconcileOutcome::Switched;
                    ReconcileState::Matched
                }
                ReconcileState::Unrecognized => {
                    if profile.rpc_urls.is_empty() {
                        return Err(run.exhausted(profile));
                    }
                    ReconcileState::AddingChain(0)
                }
                ReconcileState::AddingChain(idx) => {
                    let rpc_url = &profile.rpc_urls[idx];
                    run.add_attempts += 1;
                    let params = AddEthereumChainParameter::new(profile, rpc_url);
                    match provider.request(add_request(&params)).await {
                        Ok(_) => ReconcileState::AddVerifying(idx),
                        Err(err) if err.is_user_rejected() => {
                            return Err(run.fail(WalletError::UserRejected(err)));
                        }
                        Err(err) => {
                            warn!(
                                target: "wallets::reconcile",
                                %rpc_url,
                                %err,
                                "failed to add chain"
                            );
                            run.last_add_failure = Some(AddChainFailure::Rpc(err));
                            self.next_rpc_url(idx, &mut run)?
                        }
                    }
                }
                ReconcileState::AddVerifying(idx) => {
                    let actual = match self.verify(provider).await {
                        Ok(actual) => actual,
                        Err(err @ WalletError::UserRejected(_)) => return Err(run.fail(err)),
                        Err(err) => {
                            warn!(
                                target: "wallets::reconcile",
                                rpc_url = %profile.rpc_urls[idx],
                                %err,
                                "could not verify added chain"
                            );
                            let err = match err {
                                WalletError::Provider(err) => err,
                                err => ProviderRpcError::internal_error_with(err.to_string()),
                            };
                            run.last_add_failure = Some(AddChainFailure::Rpc(err));
                            state = self.next_rpc_url(idx, &mut run)?;
                            continue;
                        }
                    };
                    if profile.is_chain(actual) {
                        run.outcome =
                            ReconcileOutcome::Added { rpc_url: profile.rpc_urls[idx].clone() };
                        ReconcileState::Matched
                    } else {
                        warn!(
                            target: "wallets::reconcile",
                            rpc_url = %profile.rpc_urls[idx],
                            actual = ?actual,
                            "chain added but not active"
                        );
                        run.last_add_failure = Some(AddChainFailure::Mismatch { actual });
                        self.next_rpc_url(idx, &mut run)?
                    }
                }
                // every path into `Failed` returns above
                ReconcileState::Failed => unreachable!("failed reconciliation kept running"),
            };
        }
    }

    /// Moves on to the next RPC URL, or gives up if `idx` was the last one.
    fn next_rpc_url(&self, idx: usize, run: &mut Run) -> Result<ReconcileState, WalletError> {
        let next = idx + 1;
        if next < self.profile.rpc_urls.len() {
            Ok(ReconcileState::AddingChain(next))
        } else {
            Err(run.exhausted(self.profile))
        }
    }

    /// Waits for the wallet to settle and re-reads the chain id, see [`VerifyPolicy`].
    async fn verify<P>(&self, provider: &P) -> Result<Option<ChainId>, WalletError>
    where
        P: Eip1193Provider + ?Sized,
    {
        let mut delay = self.policy.settle_delay;
        let mut actual = None;
        for poll in 0..self.policy.polls.max(1) {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            actual = provider.chain_id().await?;
            trace!(target: "wallets::reconcile", poll, actual = ?actual, "verifying chain");
            if self.profile.is_chain(actual) {
                break;
            }
            delay = delay.saturating_mul(2);
        }
        Ok(actual)
    }
}

fn switch_request(params: &SwitchEthereumChainParameter<'_>) -> RequestArguments {
    RequestArguments::new(methods::WALLET_SWITCH_ETHEREUM_CHAIN).with_params(json!([params]))
}

fn add_request(params: &AddEthereumChainParameter<'_>) -> RequestArguments {
    RequestArguments::new(methods::WALLET_ADD_ETHEREUM_CHAIN).with_params(json!([params]))
}

fn is_empty(urls: &&[String]) -> bool {
    urls.is_empty()
}

/// Bookkeeping of a single run.
#[derive(Debug)]
struct Run {
    trace: Vec<ReconcileState>,
    outcome: ReconcileOutcome,
    switch_attempts: usize,
    add_attempts: usize,
    last_add_failure: Option<AddChainFailure>,
}

impl Default for Run {
    fn default() -> Self {
        Self {
            trace: Vec::new(),
            outcome: ReconcileOutcome::AlreadyOnChain,
            switch_attempts: 0,
            add_attempts: 0,
            last_add_failure: None,
        }
    }
}

impl Run {
    fn enter(&mut self, state: ReconcileState) {
        trace!(target: "wallets::reconcile", ?state, "enter");
        self.trace.push(state);
    }

    fn fail(&mut self, err: WalletError) -> WalletError {
        self.enter(ReconcileState::Failed);
        warn!(target: "wallets::reconcile", %err, trace = ?self.trace, "reconciliation failed");
        err
    }

    fn exhausted(&mut self, profile: &ChainProfile) -> WalletError {
        let last = self.last_add_failure.take().unwrap_or_else(|| {
            AddChainFailure::Rpc(ProviderRpcError::unrecognized_chain())
        });
        self.fail(WalletError::AddChainExhausted {
            chain_name: profile.chain_name.clone(),
            attempts: self.add_attempts,
            last,
        })
    }

    fn finish(self, chain_id: ChainId) -> Reconciliation {
        Reconciliation {
            chain_id,
            outcome: self.outcome,
            switch_attempts: self.switch_attempts,
            add_attempts: self.add_attempts,
            trace: self.trace,
        }
    }
}
