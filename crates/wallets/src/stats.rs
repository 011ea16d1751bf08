//! Live network statistics read from the profile's RPC endpoints.

use crate::{
    error::{ProviderRpcError, WalletError},
    http::HttpProvider,
    provider::{Eip1193Provider, Eip1193ProviderExt, methods},
};
use alloy_primitives::{U256, utils::format_units};
use arc_config::ChainProfile;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    /// The endpoint that answered.
    pub rpc_url: String,
    pub block_number: u64,
    /// Gas price in the smallest unit of the native currency.
    pub gas_price: U256,
    /// Gas price in whole native-currency units, using the profile's decimals.
    pub gas_price_formatted: String,
}

impl NetworkStats {
    /// Reads the stats through `provider`, which is connected to `rpc_url`.
    pub async fn query<P>(
        provider: &P,
        profile: &ChainProfile,
        rpc_url: impl Into<String>,
    ) -> Result<Self, WalletError>
    where
        P: Eip1193Provider + ?Sized,
    {
        let block_number = provider.call(methods::ETH_BLOCK_NUMBER, None).await?;
        let block_number = parse_quantity(methods::ETH_BLOCK_NUMBER, &block_number)?;
        let block_number = u64::try_from(block_number).map_err(|_| {
            WalletError::MalformedResponse {
                method: methods::ETH_BLOCK_NUMBER,
                value: block_number.to_string(),
            }
        })?;

        let gas_price = provider.call(methods::ETH_GAS_PRICE, None).await?;
        let gas_price = parse_quantity(methods::ETH_GAS_PRICE, &gas_price)?;
        let decimals = profile.native_currency.decimals;
        let gas_price_formatted =
            format_units(gas_price, decimals).unwrap_or_else(|_| gas_price.to_string());

        Ok(Self { rpc_url: rpc_url.into(), block_number, gas_price, gas_price_formatted })
    }

    /// Queries the profile's RPC URLs in order and returns the first full answer.
    pub async fn fetch(profile: &ChainProfile) -> Result<Self, WalletError> {
        let providers = profile
            .rpc_urls
            .iter()
            .filter_map(|rpc_url| match HttpProvider::new(rpc_url) {
                Ok(provider) => Some((rpc_url.as_str(), provider)),
                Err(err) => {
                    warn!(target: "wallets::stats", %rpc_url, %err, "skipping invalid RPC URL");
                    None
                }
            })
            .collect::<Vec<_>>();
        Self::query_first(profile, providers.iter().map(|(url, provider)| (*url, provider))).await
    }

    /// Queries each `(rpc_url, provider)` pair in order until one answers both requests.
    ///
    /// Returns the last error if none does.
    pub async fn query_first<'a, P>(
        profile: &ChainProfile,
        endpoints: impl IntoIterator<Item = (&'a str, &'a P)>,
    ) -> Result<Self, WalletError>
    where
        P: Eip1193Provider + ?Sized + 'a,
    {
        let mut last_err = None;
        for (rpc_url, provider) in endpoints {
            match Self::query(provider, profile, rpc_url).await {
                Ok(stats) => return Ok(stats),
                Err(err) => {
                    warn!(target: "wallets::stats", %rpc_url, %err, "RPC endpoint failed");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            ProviderRpcError::internal_error_with("no RPC URLs configured").into()
        }))
    }

    /// Queries a single endpoint.
    pub async fn fetch_from(profile: &ChainProfile, rpc_url: &str) -> Result<Self, WalletError> {
        let provider = HttpProvider::new(rpc_url).map_err(|err| {
            WalletError::from(ProviderRpcError::internal_error_with(format!(
                "invalid RPC URL {rpc_url}: {err}"
            )))
        })?;
        Self::query(&provider, profile, rpc_url).await
    }
}

/// Parses a JSON-RPC quantity, a `0x`-prefixed hex string.
fn parse_quantity(method: &'static str, value: &Value) -> Result<U256, WalletError> {
    let malformed = || WalletError::MalformedResponse { method, value: value.to_string() };
    let s = value.as_str().ok_or_else(malformed)?;
    if !s.starts_with("0x") || s.len() < 3 {
        return Err(malformed());
    }
    s.parse::<U256>().map_err(|_| malformed())
}
