//! Selecting among injected wallets and reconciling the chosen one.

use alloy_primitives::Address;
use arc_config::{ARC_TESTNET_CHAIN_ID, ChainProfile, Config, figment::Figment};
use arc_test_utils::MockWallet;
use arc_wallets::{
    InjectedEthereum, InjectedProvider, NetworkReconciler, ProviderSelector, VerifyPolicy,
    WalletErrorKind, WalletFlags, session,
};
use std::sync::Arc;

#[tokio::test]
async fn reconciles_only_the_selected_wallet() {
    let coinbase = Arc::new(MockWallet::on_chain(1));
    let rabby = Arc::new(MockWallet::on_chain(1));
    let injected = InjectedEthereum::Multi(vec![
        InjectedProvider::new(
            coinbase.clone(),
            WalletFlags { is_coinbase_wallet: true, ..Default::default() },
        ),
        InjectedProvider::new(rabby.clone(), WalletFlags { is_rabby: true, ..Default::default() }),
    ]);

    let selected = ProviderSelector::default().select(Some(&injected)).unwrap();
    assert_eq!(selected.name(), "Rabby");

    let profile = ChainProfile::arc_testnet();
    let reconciler = NetworkReconciler::new(&profile).with_policy(VerifyPolicy::immediate());
    let rec = reconciler.reconcile(selected.provider.as_ref()).await.unwrap();
    assert_eq!(rec.chain_id, ARC_TESTNET_CHAIN_ID);

    assert_eq!(rabby.active_chain(), Some(ARC_TESTNET_CHAIN_ID));
    assert!(coinbase.calls().is_empty());
}

fn config_with(preferred_wallet: Option<&str>) -> Config {
    let mut figment = Figment::from(Config::default()).merge(("settle_delay_ms", 0));
    if let Some(name) = preferred_wallet {
        figment = figment.merge(("preferred_wallet", name));
    }
    Config::try_from(figment).unwrap()
}

#[tokio::test]
async fn preferred_wallet_from_config() {
    let metamask = Arc::new(
        MockWallet::on_chain(ARC_TESTNET_CHAIN_ID).with_accounts([Address::repeat_byte(1)]),
    );
    let rabby = Arc::new(
        MockWallet::on_chain(ARC_TESTNET_CHAIN_ID).with_accounts([Address::repeat_byte(2)]),
    );
    let injected = InjectedEthereum::Multi(vec![
        InjectedProvider::new(
            metamask.clone(),
            WalletFlags { is_metamask: true, ..Default::default() },
        ),
        InjectedProvider::new(rabby.clone(), WalletFlags { is_rabby: true, ..Default::default() }),
    ]);

    let config = config_with(Some("rabby"));
    assert_eq!(config.preferred_wallet.as_deref(), Some("rabby"));
    let (selected, state) = session::connect_injected(Some(&injected), &config).await.unwrap();
    assert_eq!(selected.name(), "Rabby");
    assert_eq!(state.address, Some(Address::repeat_byte(2)));
    assert!(metamask.calls().is_empty());

    let config = config_with(None);
    let (selected, state) = session::connect_injected(Some(&injected), &config).await.unwrap();
    assert_eq!(selected.name(), "MetaMask");
    assert_eq!(state.address, Some(Address::repeat_byte(1)));
}

#[tokio::test]
async fn unknown_preference_falls_back_to_ranking() {
    let metamask = Arc::new(MockWallet::on_chain(ARC_TESTNET_CHAIN_ID));
    let injected = InjectedEthereum::Single(InjectedProvider::new(
        metamask,
        WalletFlags { is_metamask: true, ..Default::default() },
    ));
    let selector = ProviderSelector::from_config(&config_with(Some("Phantom")));
    assert_eq!(selector.rules()[0].name(), "preferred Phantom");
    assert_eq!(selector.select(Some(&injected)).unwrap().name(), "MetaMask");

    let err = session::connect_injected(None, &config_with(None)).await.unwrap_err();
    assert_eq!(err.kind(), WalletErrorKind::ProviderUnavailable);
}
