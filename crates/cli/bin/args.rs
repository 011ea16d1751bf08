use arc_cli::cmd::{
    chain_id::ChainIdArgs, connect::ConnectArgs, ensure::EnsureNetworkArgs, nft::NftArgs,
    profile::ProfileArgs, stats::StatsArgs,
};
use clap::{Parser, Subcommand};

/// Bring EIP-1193 wallets onto the Arc network.
#[derive(Parser)]
#[command(name = "arcw", version, next_display_order = None)]
pub struct Arcw {
    #[command(subcommand)]
    pub cmd: ArcwSubcommand,
}

#[derive(Subcommand)]
pub enum ArcwSubcommand {
    /// Prints the configured chain profile.
    #[command(visible_alias = "p")]
    Profile(ProfileArgs),

    /// Normalizes a chain id given in decimal or hex.
    #[command(visible_alias = "cid")]
    ChainId(ChainIdArgs),

    /// Switches the wallet behind a bridge to the configured chain, adding it if needed.
    #[command(visible_alias = "ensure")]
    EnsureNetwork(EnsureNetworkArgs),

    /// Connects to the wallet behind a bridge and brings it onto the configured chain.
    Connect(ConnectArgs),

    /// Prints the latest block number and gas price.
    Stats(StatsArgs),

    /// Mints and inspects tokens of the Arc image collection.
    Nft(NftArgs),
}
