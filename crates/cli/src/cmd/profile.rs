use crate::utils;
use arc_config::Config;
use clap::Parser;
use eyre::Result;
use itertools::Itertools;

/// CLI arguments for `arcw profile`.
#[derive(Clone, Debug, Parser)]
pub struct ProfileArgs {
    /// Print the profile as JSON.
    #[arg(long)]
    json: bool,
}

impl ProfileArgs {
    pub fn run(self) -> Result<()> {
        let config = Config::load()?;
        let profile = &config.chain;
        if self.json {
            return utils::print_json(profile);
        }

        println!(
            "Chain:            {} ({}, {})",
            profile.chain_name, profile.chain_id, profile.chain_id_hex
        );
        let currency = &profile.native_currency;
        println!(
            "Native currency:  {} ({}, {} decimals)",
            currency.name, currency.symbol, currency.decimals
        );
        println!("RPC URLs:         {}", profile.rpc_urls.iter().format(", "));
        if !profile.block_explorer_urls.is_empty() {
            println!("Explorers:        {}", profile.block_explorer_urls.iter().format(", "));
        }
        Ok(())
    }
}
