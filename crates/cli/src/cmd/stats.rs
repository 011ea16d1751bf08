use crate::utils;
use arc_config::Config;
use arc_wallets::NetworkStats;
use clap::Parser;
use eyre::Result;

/// CLI arguments for `arcw stats`.
#[derive(Clone, Debug, Parser)]
pub struct StatsArgs {
    /// Query this endpoint instead of the profile's RPC URLs.
    #[arg(long, value_name = "URL")]
    rpc_url: Option<String>,

    /// Print the stats as JSON.
    #[arg(long)]
    json: bool,
}

impl StatsArgs {
    pub async fn run(self) -> Result<()> {
        let config = Config::load()?;
        let profile = &config.chain;
        let stats = match &self.rpc_url {
            Some(url) => NetworkStats::fetch_from(profile, url).await?,
            None => NetworkStats::fetch(profile).await?,
        };
        if self.json {
            return utils::print_json(&stats);
        }

        println!("Network:    {}", profile.chain_name);
        println!("Endpoint:   {}", stats.rpc_url);
        println!("Block:      {}", stats.block_number);
        println!("Gas price:  {} {}", stats.gas_price_formatted, profile.native_currency.symbol);
        Ok(())
    }
}
