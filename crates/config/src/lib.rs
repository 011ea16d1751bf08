//! # arc-config
//!
//! The chain profile the wallet is reconciled against, and the layered configuration around it.
//!
//! Values are resolved in this order, later sources overriding earlier ones:
//! 1. built-in defaults ([`Config::default`], the Arc Testnet profile)
//! 2. `arc.toml` in the working directory (or the file named by `ARC_CONFIG`)
//! 3. `ARC_`-prefixed environment variables, nested keys separated by `__`
//!    (e.g. `ARC_CHAIN__CHAIN_NAME`)

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod chain;
pub mod chain_id;
pub mod contracts;

mod error;
pub use error::{ExtractConfigError, FAILED_TO_EXTRACT_CONFIG_MSG, LoadConfigError, SettingError};

pub use chain::{ARC_TESTNET_CHAIN_ID, ChainProfile, ChainProfileError, NativeCurrency};
pub use chain_id::{
    ChainIdError, RawChainId, chain_id_from_json, normalize_chain_id, parse_chain_id,
    to_hex_chain_id,
};
pub use contracts::ContractAddresses;

// reexport so consumers can layer their own providers
pub use figment;

use figment::{
    Figment, Metadata, Profile, Provider,
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Map},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Arc wallet tooling configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The network the wallet is brought onto.
    pub chain: ChainProfile,
    /// How long to wait after a successful switch/add response before re-reading the chain id.
    pub settle_delay_ms: u64,
    /// How many times the chain id is re-read before a verification is considered failed.
    pub verify_polls: u32,
    /// Name of the injected wallet to prefer, e.g. `Rabby`.
    pub preferred_wallet: Option<String>,
    /// URL of the EIP-1193 HTTP bridge used by the CLI.
    pub bridge_url: Option<String>,
    /// The NFT collection minted through the wallet.
    pub contracts: ContractAddresses,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain: ChainProfile::arc_testnet(),
            settle_delay_ms: Self::DEFAULT_SETTLE_DELAY_MS,
            verify_polls: 1,
            preferred_wallet: None,
            bridge_url: None,
            contracts: ContractAddresses::default(),
        }
    }
}

impl Config {
    /// The default config file name.
    pub const FILE_NAME: &'static str = "arc.toml";

    /// Environment variable prefix.
    pub const ENV_PREFIX: &'static str = "ARC_";

    /// Wallets apply switches asynchronously; one second has proven enough in practice.
    pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1_000;

    /// Loads the config from all sources and validates the chain profile.
    pub fn load() -> Result<Self, LoadConfigError> {
        Self::try_from(Self::figment())
    }

    /// Returns the default figment: defaults, then the toml file, then the environment.
    pub fn figment() -> Figment {
        let file = std::env::var_os("ARC_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(Self::FILE_NAME));
        trace!(?file, "building config figment");

        Figment::from(Self::default())
            .merge(Toml::file(file))
            .merge(Env::prefixed(Self::ENV_PREFIX).ignore(&["CONFIG"]).split("__"))
    }

    /// Attempts to extract a `Config` from `provider` and validates its chain profile.
    pub fn try_from<T: Provider>(provider: T) -> Result<Self, LoadConfigError> {
        let figment = Figment::from(provider);
        let config = figment.extract::<Self>().map_err(ExtractConfigError::new)?;
        config.chain.validate()?;
        debug!(
            chain_id = config.chain.chain_id,
            chain = %config.chain.chain_name,
            rpc_urls = config.chain.rpc_urls.len(),
            "loaded config"
        );
        Ok(config)
    }

    /// The settle delay as a [`Duration`].
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Provider for Config {
    fn metadata(&self) -> Metadata {
        Metadata::named("Arc Config")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }
}
