use crate::{opts::BridgeOpts, utils};
use alloy_primitives::{Address, U256};
use arc_config::{Config, ContractAddresses};
use arc_wallets::{HttpProvider, NetworkReconciler, NftClient, WalletError, session};
use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr};

/// CLI arguments for `arcw nft`.
#[derive(Clone, Debug, Parser)]
pub struct NftArgs {
    #[command(subcommand)]
    pub cmd: NftSubcommand,

    #[command(flatten)]
    bridge: BridgeOpts,

    /// Address of the NFT collection, overriding `contracts.nft`.
    #[arg(long, value_name = "ADDRESS", global = true)]
    nft: Option<Address>,

    /// Address of the minter, overriding `contracts.minter`.
    #[arg(long, value_name = "ADDRESS", global = true)]
    minter: Option<Address>,

    /// Print the result as JSON.
    #[arg(long, global = true)]
    json: bool,
}

/// Mint and inspect tokens of the Arc image collection.
#[derive(Clone, Debug, Subcommand)]
pub enum NftSubcommand {
    /// Mint a token from the connected account.
    #[command(visible_alias = "m")]
    Mint {
        /// URI of the token metadata, usually `ipfs://<cid>`.
        token_uri: String,
    },

    /// List the tokens owned by an account.
    #[command(visible_alias = "t")]
    Tokens {
        /// The owner. Defaults to the connected account.
        owner: Option<Address>,
    },

    /// Print the metadata URI and owner of a token.
    #[command(visible_alias = "i")]
    Info { token_id: U256 },
}

impl NftArgs {
    pub async fn run(self) -> Result<()> {
        let config = self.bridge.load_config()?;
        let url = self.bridge.bridge_url(&config)?;
        let provider =
            HttpProvider::new(url).wrap_err_with(|| format!("invalid bridge URL {url}"))?;
        let client = NftClient::new(&provider, self.contracts(&config));

        match self.cmd {
            NftSubcommand::Mint { token_uri } => {
                let from = connected_account(&provider, &config).await?;
                let minted = client.mint(from, &token_uri).await.wrap_err("failed to mint")?;
                if self.json {
                    return utils::print_json(&minted);
                }
                println!("Token:        {}", minted.token_id);
                println!("Transaction:  {}", minted.tx_hash);
                if let Some(block) = minted.block_number {
                    println!("Block:        {block}");
                }
            }
            NftSubcommand::Tokens { owner } => {
                let owner = match owner {
                    Some(owner) => owner,
                    None => connected_account(&provider, &config).await?,
                };
                let tokens = client.user_tokens(owner).await?;
                if self.json {
                    return utils::print_json(&tokens);
                }
                if tokens.is_empty() {
                    println!("{owner} owns no tokens");
                }
                for token_id in tokens {
                    println!("{token_id}");
                }
            }
            NftSubcommand::Info { token_id } => {
                let info = client.info(token_id).await?;
                if self.json {
                    return utils::print_json(&info);
                }
                println!("Token:  {}", info.token_id);
                println!("Owner:  {}", info.owner);
                println!("URI:    {}", info.http_uri());
            }
        }
        Ok(())
    }

    fn contracts(&self, config: &Config) -> ContractAddresses {
        ContractAddresses {
            nft: self.nft.or(config.contracts.nft),
            minter: self.minter.or(config.contracts.minter),
        }
    }
}

/// Connects to the wallet on the configured chain and returns its first account.
async fn connected_account(provider: &HttpProvider, config: &Config) -> Result<Address> {
    let reconciler = NetworkReconciler::from_config(config);
    let state = session::connect(provider, &reconciler).await?;
    Ok(state.address.ok_or(WalletError::NoAccounts)?)
}
