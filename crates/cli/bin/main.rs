use arc_cli::{handler, utils};
use clap::Parser;
use eyre::Result;

mod args;
use args::{Arcw, ArcwSubcommand};

fn main() -> Result<()> {
    handler::install();
    utils::load_dotenv();
    utils::subscriber();
    let args = Arcw::parse();
    main_args(args)
}

#[tokio::main]
async fn main_args(args: Arcw) -> Result<()> {
    match args.cmd {
        ArcwSubcommand::Profile(cmd) => cmd.run(),
        ArcwSubcommand::ChainId(cmd) => cmd.run(),
        ArcwSubcommand::EnsureNetwork(cmd) => cmd.run().await,
        ArcwSubcommand::Connect(cmd) => cmd.run().await,
        ArcwSubcommand::Stats(cmd) => cmd.run().await,
        ArcwSubcommand::Nft(cmd) => cmd.run().await,
    }
}
