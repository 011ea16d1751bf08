use arc_config::{
    Config,
    figment::{
        Error, Metadata, Profile, Provider,
        value::{Dict, Map, Value},
    },
};
use clap::Parser;

/// Where to reach the wallet and how to verify its chain.
#[derive(Clone, Debug, Default, Parser)]
#[command(next_help_heading = "Wallet options")]
pub struct BridgeOpts {
    /// URL of the EIP-1193 bridge the wallet requests are sent to.
    #[arg(long, value_name = "URL", env = "ARC_BRIDGE_URL")]
    pub bridge: Option<String>,

    /// Milliseconds to wait after a switch or add before re-reading the chain id.
    #[arg(long, value_name = "MS")]
    pub settle_delay_ms: Option<u64>,

    /// How often to re-read the chain id before giving up on a switch or add.
    #[arg(long, value_name = "N")]
    pub verify_polls: Option<u32>,
}

impl BridgeOpts {
    /// Loads the config with these options merged on top.
    pub fn load_config(&self) -> eyre::Result<Config> {
        Ok(Config::try_from(Config::figment().merge(self))?)
    }

    /// The bridge URL from the command line, or else from the config.
    pub fn bridge_url<'a>(&'a self, config: &'a Config) -> eyre::Result<&'a str> {
        self.bridge.as_deref().or(config.bridge_url.as_deref()).ok_or_else(|| {
            eyre::eyre!("no bridge URL, pass `--bridge <URL>` or set `bridge_url` in arc.toml")
        })
    }

    fn dict(&self) -> Dict {
        let mut dict = Dict::new();
        if let Some(bridge) = &self.bridge {
            dict.insert("bridge_url".to_string(), Value::from(bridge.clone()));
        }
        if let Some(ms) = self.settle_delay_ms {
            dict.insert("settle_delay_ms".to_string(), Value::from(ms));
        }
        if let Some(polls) = self.verify_polls {
            dict.insert("verify_polls".to_string(), Value::from(polls));
        }
        dict
    }
}

impl Provider for BridgeOpts {
    fn metadata(&self) -> Metadata {
        Metadata::named("BridgeOpts")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        Ok(Map::from([(Profile::Default, self.dict())]))
    }
}
