use arc_config::{normalize_chain_id, to_hex_chain_id};
use clap::Parser;
use eyre::Result;

/// CLI arguments for `arcw chain-id`.
#[derive(Clone, Debug, Parser)]
pub struct ChainIdArgs {
    /// A chain id in decimal or `0x`-prefixed hex.
    value: String,

    /// Print the `0x`-prefixed hex form instead of decimal.
    #[arg(long)]
    hex: bool,
}

impl ChainIdArgs {
    pub fn run(self) -> Result<()> {
        let chain_id = normalize_chain_id(Some(self.value.as_str()))?
            .ok_or_else(|| eyre::eyre!("no chain id given"))?;
        if self.hex {
            println!("{}", to_hex_chain_id(chain_id));
        } else {
            println!("{chain_id}");
        }
        Ok(())
    }
}
