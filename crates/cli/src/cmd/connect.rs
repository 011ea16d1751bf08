use crate::{opts::BridgeOpts, utils};
use arc_wallets::{HttpProvider, NetworkReconciler, session};
use clap::Parser;
use eyre::{Result, WrapErr};

/// CLI arguments for `arcw connect`.
#[derive(Clone, Debug, Parser)]
pub struct ConnectArgs {
    #[command(flatten)]
    bridge: BridgeOpts,

    /// Print the wallet state as JSON.
    #[arg(long)]
    json: bool,
}

impl ConnectArgs {
    pub async fn run(self) -> Result<()> {
        let config = self.bridge.load_config()?;
        let url = self.bridge.bridge_url(&config)?;
        let provider =
            HttpProvider::new(url).wrap_err_with(|| format!("invalid bridge URL {url}"))?;

        let reconciler = NetworkReconciler::from_config(&config);
        let state = session::connect(&provider, &reconciler).await?;
        if self.json {
            return utils::print_json(&state);
        }

        if let Some(address) = state.address {
            println!("Address:  {address}");
        }
        match state.chain_id {
            Some(chain_id) => println!("Chain:    {} ({chain_id})", config.chain.chain_name),
            None => println!("Chain:    unknown"),
        }
        Ok(())
    }
}
