//! Block number and gas price read through a provider.

use alloy_primitives::U256;
use arc_config::ChainProfile;
use arc_test_utils::MockWallet;
use arc_wallets::{
    NetworkStats, ProviderRpcError, WalletError,
    provider::methods::{ETH_BLOCK_NUMBER, ETH_GAS_PRICE},
};
use serde_json::json;

/// A node at block 26 charging 160 USDC per gas.
fn node() -> MockWallet {
    MockWallet::default()
        .script(ETH_BLOCK_NUMBER, Ok(json!("0x1a")))
        .script(ETH_GAS_PRICE, Ok(json!("0x9896800")))
}

#[tokio::test]
async fn reads_block_and_gas_price() {
    let profile = ChainProfile::arc_testnet();
    let stats = NetworkStats::query(&node(), &profile, "https://rpc.testnet.arc.network")
        .await
        .unwrap();
    similar_asserts::assert_eq!(
        serde_json::to_value(&stats).unwrap(),
        json!({
            "rpcUrl": "https://rpc.testnet.arc.network",
            "blockNumber": 26,
            "gasPrice": "0x9896800",
            "gasPriceFormatted": "160.000000",
        })
    );
    assert_eq!(stats.gas_price, U256::from(160_000_000u64));
}

#[tokio::test]
async fn gas_price_follows_profile_decimals() {
    let mut profile = ChainProfile::arc_testnet();
    profile.native_currency.decimals = 9;
    let stats = NetworkStats::query(&node(), &profile, "x").await.unwrap();
    assert_eq!(stats.gas_price_formatted, "0.160000000");
}

#[tokio::test]
async fn malformed_quantities() {
    let profile = ChainProfile::arc_testnet();

    let wallet = MockWallet::default().script(ETH_BLOCK_NUMBER, Ok(json!(26)));
    let err = NetworkStats::query(&wallet, &profile, "x").await.unwrap_err();
    assert!(
        matches!(err, WalletError::MalformedResponse { method: "eth_blockNumber", .. }),
        "{err:?}"
    );

    // does not fit a block number
    let wallet = MockWallet::default()
        .script(ETH_BLOCK_NUMBER, Ok(json!("0x100000000000000000")))
        .script(ETH_GAS_PRICE, Ok(json!("0x1")));
    let err = NetworkStats::query(&wallet, &profile, "x").await.unwrap_err();
    assert!(
        matches!(err, WalletError::MalformedResponse { method: "eth_blockNumber", .. }),
        "{err:?}"
    );
    assert_eq!(wallet.count(ETH_GAS_PRICE), 0);

    let wallet = MockWallet::default()
        .script(ETH_BLOCK_NUMBER, Ok(json!("0x1")))
        .script(ETH_GAS_PRICE, Ok(json!("1000")));
    let err = NetworkStats::query(&wallet, &profile, "x").await.unwrap_err();
    assert!(
        matches!(err, WalletError::MalformedResponse { method: "eth_gasPrice", .. }),
        "{err:?}"
    );
}

#[tokio::test]
async fn first_answering_endpoint_wins() {
    let profile = ChainProfile::arc_testnet();
    let down = MockWallet::default()
        .script(ETH_BLOCK_NUMBER, Err(ProviderRpcError::internal_error_with("down")));
    let up = node();
    let unused = node();

    let stats = NetworkStats::query_first(
        &profile,
        [("https://a.example", &down), ("https://b.example", &up), ("https://c.example", &unused)],
    )
    .await
    .unwrap();
    assert_eq!(stats.rpc_url, "https://b.example");
    assert_eq!(stats.block_number, 26);
    assert_eq!(down.count(ETH_BLOCK_NUMBER), 1);
    assert!(unused.calls().is_empty());
}

#[tokio::test]
async fn every_endpoint_failing_returns_the_last_error() {
    let profile = ChainProfile::arc_testnet();
    let first = MockWallet::default()
        .script(ETH_BLOCK_NUMBER, Err(ProviderRpcError::internal_error_with("first")));
    let second = MockWallet::default()
        .script(ETH_BLOCK_NUMBER, Err(ProviderRpcError::internal_error_with("second")));

    let err = NetworkStats::query_first(&profile, [("a", &first), ("b", &second)])
        .await
        .unwrap_err();
    assert_eq!(err.rpc_error().unwrap().message, "second");

    let none: Vec<(&str, &MockWallet)> = Vec::new();
    let err = NetworkStats::query_first(&profile, none).await.unwrap_err();
    assert!(err.to_string().contains("no RPC URLs"), "{err}");
}
