//! Connecting and following wallet events.

use alloy_primitives::{Address, address};
use arc_config::{ARC_TESTNET_CHAIN_ID, ChainProfile};
use arc_test_utils::MockWallet;
use arc_wallets::{
    NetworkReconciler, ProviderEvent, ProviderRpcError, VerifyPolicy, WalletError, WalletState,
    WalletWatcher,
    provider::methods::{ETH_ACCOUNTS, ETH_REQUEST_ACCOUNTS, WALLET_SWITCH_ETHEREUM_CHAIN},
    session,
};

const ALICE: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

#[tokio::test]
async fn connect_reconciles_onto_arc() {
    let profile = ChainProfile::arc_testnet();
    let reconciler = NetworkReconciler::new(&profile).with_policy(VerifyPolicy::immediate());
    let wallet = MockWallet::on_chain(1).with_accounts([ALICE]);

    let state = session::connect(&wallet, &reconciler).await.unwrap();
    assert_eq!(
        state,
        WalletState {
            address: Some(ALICE),
            chain_id: Some(ARC_TESTNET_CHAIN_ID),
            is_connected: true
        }
    );
    assert_eq!(wallet.methods()[0], ETH_REQUEST_ACCOUNTS);
    assert!(wallet.knows_chain(ARC_TESTNET_CHAIN_ID));
}

#[tokio::test]
async fn connect_without_accounts() {
    let profile = ChainProfile::arc_testnet();
    let reconciler = NetworkReconciler::new(&profile).with_policy(VerifyPolicy::immediate());
    let wallet = MockWallet::on_chain(1);

    let err = session::connect(&wallet, &reconciler).await.unwrap_err();
    assert_eq!(err, WalletError::NoAccounts);
    assert_eq!(wallet.count(WALLET_SWITCH_ETHEREUM_CHAIN), 0);

    let wallet = MockWallet::on_chain(1)
        .with_accounts([ALICE])
        .script(ETH_REQUEST_ACCOUNTS, Err(ProviderRpcError::user_rejected()));
    let err = session::connect(&wallet, &reconciler).await.unwrap_err();
    assert!(matches!(err, WalletError::UserRejected(_)), "{err:?}");
}

#[tokio::test]
async fn current_state_does_not_prompt() {
    let wallet = MockWallet::on_chain(ARC_TESTNET_CHAIN_ID).with_accounts([ALICE]);
    assert_eq!(session::current_state(&wallet).await, WalletState::disconnected());
    assert_eq!(wallet.count(ETH_REQUEST_ACCOUNTS), 0);

    let wallet = wallet.connected();
    let state = session::current_state(&wallet).await;
    assert_eq!(state.address, Some(ALICE));
    assert_eq!(state.chain_id, Some(ARC_TESTNET_CHAIN_ID));

    wallet.push_script(ETH_ACCOUNTS, Err(ProviderRpcError::internal_error_with("locked")));
    assert_eq!(session::current_state(&wallet).await, WalletState::disconnected());
}

#[tokio::test]
async fn watcher_follows_events() {
    let wallet = MockWallet::on_chain(1).with_accounts([ALICE]).connected();
    let initial = session::current_state(&wallet).await;
    let watcher = WalletWatcher::new(&wallet, initial);
    let shared = watcher.state();

    wallet.set_chain(ARC_TESTNET_CHAIN_ID);
    wallet.emit(ProviderEvent::AccountsChanged(vec![
        "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc".to_string(),
    ]));
    drop(wallet);

    let last = watcher.run().await;
    assert_eq!(last.chain_id, Some(ARC_TESTNET_CHAIN_ID));
    assert_eq!(last.address, Some(address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC")));
    assert!(last.is_connected);
    assert_eq!(shared.get(), last);
}

#[tokio::test]
async fn locking_the_wallet_disconnects() {
    let wallet = MockWallet::on_chain(ARC_TESTNET_CHAIN_ID).with_accounts([ALICE]).connected();
    let watcher = WalletWatcher::new(&wallet, session::current_state(&wallet).await);
    wallet.emit(ProviderEvent::AccountsChanged(vec![]));
    drop(wallet);

    assert_eq!(watcher.run().await, WalletState::disconnected());
}
