use crate::opts::BridgeOpts;
use arc_config::ChainProfile;
use arc_wallets::{
    HttpProvider, NetworkReconciler, ReconcileOutcome, Reconciliation, ReconciliationResult,
    WalletError,
};
use clap::Parser;
use eyre::{Result, WrapErr};
use std::time::Duration;
use tokio::time;

/// CLI arguments for `arcw ensure-network`.
#[derive(Clone, Debug, Parser)]
pub struct EnsureNetworkArgs {
    #[command(flatten)]
    bridge: BridgeOpts,

    /// Print `{ success, finalChainId }` as JSON.
    #[arg(long)]
    json: bool,

    /// Seconds to wait for the wallet before giving up. Prompts count towards this.
    #[arg(long, default_value = "300")]
    timeout: u64,
}

impl EnsureNetworkArgs {
    pub async fn run(self) -> Result<()> {
        let Self { bridge, json, timeout } = self;
        let config = bridge.load_config()?;
        let url = bridge.bridge_url(&config)?;
        let provider =
            HttpProvider::new(url).wrap_err_with(|| format!("invalid bridge URL {url}"))?;
        let profile = &config.chain;

        let reconciler = NetworkReconciler::from_config(&config);
        let res = time::timeout(Duration::from_secs(timeout), reconciler.reconcile(&provider))
            .await
            .map_err(|_| eyre::eyre!("the wallet did not respond within {timeout} seconds"))?;

        if json {
            let (out, code) = json_report(&res)?;
            println!("{out}");
            if let Err(err) = &res {
                // stdout already carries the outcome, keep stderr to the log
                warn!(%err, "failed to bring the wallet onto {}", profile.chain_name);
                std::process::exit(code);
            }
            return Ok(());
        }

        let rec = res
            .wrap_err_with(|| format!("failed to bring the wallet onto {}", profile.chain_name))?;
        println!("{}", describe(&rec, profile));
        Ok(())
    }
}

/// The `{ success, finalChainId }` summary and the exit code that goes with it.
fn json_report(res: &Result<Reconciliation, WalletError>) -> Result<(String, i32)> {
    let summary = ReconciliationResult::from(res);
    let code = if summary.success { 0 } else { 1 };
    Ok((serde_json::to_string_pretty(&summary)?, code))
}

fn describe(rec: &Reconciliation, profile: &ChainProfile) -> String {
    let chain = &profile.chain_name;
    match &rec.outcome {
        ReconcileOutcome::AlreadyOnChain => {
            format!("Wallet is already on {chain} ({})", rec.chain_id)
        }
        ReconcileOutcome::Switched => format!("Switched wallet to {chain} ({})", rec.chain_id),
        ReconcileOutcome::Added { rpc_url } => {
            format!("Added {chain} ({}) to the wallet using {rpc_url}", rec.chain_id)
        }
    }
}
