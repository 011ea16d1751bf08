//! Network reconciliation against a scripted wallet.

use arc_config::{ARC_TESTNET_CHAIN_ID, ChainProfile};
use arc_test_utils::MockWallet;
use arc_wallets::{
    AddChainFailure, NetworkReconciler, ProviderErrorCode, ProviderRpcError, ReconcileOutcome,
    ReconcileState, ReconciliationResult, VerifyPolicy, WalletError, WalletErrorKind,
    provider::methods::{ETH_CHAIN_ID, WALLET_ADD_ETHEREUM_CHAIN, WALLET_SWITCH_ETHEREUM_CHAIN},
};
use serde_json::{Value, json};
use std::time::Duration;

const ARC: u64 = ARC_TESTNET_CHAIN_ID;

fn reconciler(profile: &ChainProfile) -> NetworkReconciler<'_> {
    NetworkReconciler::new(profile).with_policy(VerifyPolicy::immediate())
}

fn rejected() -> ProviderRpcError {
    ProviderRpcError::user_rejected()
}

fn failed(message: &str) -> ProviderRpcError {
    ProviderRpcError::with_message(-32603i64, message)
}

/// The `rpcUrls` of every `wallet_addEthereumChain` request, in order.
fn added_rpc_urls(wallet: &MockWallet) -> Vec<Value> {
    wallet
        .params_of(WALLET_ADD_ETHEREUM_CHAIN)
        .into_iter()
        .map(|params| params.unwrap()[0]["rpcUrls"].clone())
        .collect()
}

#[tokio::test]
async fn already_on_chain_sends_nothing() {
    arc_test_utils::init_tracing();
    let profile = ChainProfile::arc_testnet();
    let wallet = MockWallet::on_chain(ARC);

    let rec = reconciler(&profile).reconcile(&wallet).await.unwrap();
    assert_eq!(rec.chain_id, ARC);
    assert_eq!(rec.outcome, ReconcileOutcome::AlreadyOnChain);
    assert_eq!(
        rec.trace,
        [ReconcileState::Unknown, ReconcileState::Querying, ReconcileState::Matched]
    );
    assert_eq!(wallet.methods(), [ETH_CHAIN_ID]);
}

#[tokio::test]
async fn any_chain_id_representation_matches() {
    let profile = ChainProfile::arc_testnet();
    for reported in [json!("0x4cef52"), json!("0X4CEF52"), json!("5042002"), json!(5042002)] {
        let wallet = MockWallet::on_chain(1).script(ETH_CHAIN_ID, Ok(reported.clone()));
        let rec = reconciler(&profile).reconcile(&wallet).await.unwrap();
        assert_eq!(rec.outcome, ReconcileOutcome::AlreadyOnChain, "{reported}");
        assert_eq!(wallet.count(WALLET_SWITCH_ETHEREUM_CHAIN), 0);
    }
}

#[tokio::test]
async fn switches_to_a_known_chain() {
    let profile = ChainProfile::arc_testnet();
    let wallet = MockWallet::on_chain(1).with_known_chain(ARC);

    let rec = reconciler(&profile).reconcile(&wallet).await.unwrap();
    assert_eq!(rec.outcome, ReconcileOutcome::Switched);
    assert_eq!((rec.switch_attempts, rec.add_attempts), (1, 0));
    assert_eq!(
        rec.trace,
        [
            ReconcileState::Unknown,
            ReconcileState::Querying,
            ReconcileState::Mismatched,
            ReconcileState::Switching,
            ReconcileState::SwitchVerifying,
            ReconcileState::Matched,
        ]
    );
    assert_eq!(
        wallet.params_of(WALLET_SWITCH_ETHEREUM_CHAIN),
        [Some(json!([{ "chainId": "0x4cef52" }]))]
    );
    assert_eq!(wallet.count(WALLET_ADD_ETHEREUM_CHAIN), 0);
    assert_eq!(wallet.active_chain(), Some(ARC));
}

#[tokio::test]
async fn unknown_active_chain_is_a_mismatch() {
    let profile = ChainProfile::arc_testnet();
    let wallet = MockWallet::default().with_known_chain(ARC);

    let rec = reconciler(&profile).reconcile(&wallet).await.unwrap();
    assert_eq!(rec.outcome, ReconcileOutcome::Switched);
}

#[tokio::test]
async fn adds_chain_with_second_url() {
    let profile = ChainProfile {
        rpc_urls: vec!["https://a.example".to_string(), "https://b.example".to_string()],
        ..ChainProfile::arc_testnet()
    };
    let wallet = MockWallet::on_chain(1)
        .script(WALLET_ADD_ETHEREUM_CHAIN, Err(ProviderRpcError::with_message(-1i64, "bad rpc")));

    let rec = reconciler(&profile).reconcile(&wallet).await.unwrap();
    assert_eq!(rec.outcome, ReconcileOutcome::Added { rpc_url: "https://b.example".to_string() });
    assert_eq!((rec.switch_attempts, rec.add_attempts), (1, 2));
    assert_eq!(
        wallet.methods(),
        [
            ETH_CHAIN_ID,
            WALLET_SWITCH_ETHEREUM_CHAIN,
            WALLET_ADD_ETHEREUM_CHAIN,
            WALLET_ADD_ETHEREUM_CHAIN,
            ETH_CHAIN_ID,
        ]
    );
    assert_eq!(
        added_rpc_urls(&wallet),
        [json!(["https://a.example"]), json!(["https://b.example"])]
    );
    assert_eq!(*rec.trace.last().unwrap(), ReconcileState::Matched);
    assert!(rec.trace.contains(&ReconcileState::AddVerifying(1)));
    assert!(!rec.trace.contains(&ReconcileState::AddVerifying(0)));
}

#[tokio::test]
async fn tries_urls_in_order_until_one_works() {
    let profile = ChainProfile::arc_testnet();
    let wallet = MockWallet::on_chain(1)
        .script(WALLET_ADD_ETHEREUM_CHAIN, Err(failed("first")))
        .script(WALLET_ADD_ETHEREUM_CHAIN, Err(failed("second")));

    let rec = reconciler(&profile).reconcile(&wallet).await.unwrap();
    assert_eq!(rec.add_attempts, 3);
    assert_eq!(rec.outcome, ReconcileOutcome::Added { rpc_url: profile.rpc_urls[2].clone() });
    let expected = profile.rpc_urls[..3].iter().map(|url| json!([url])).collect::<Vec<_>>();
    assert_eq!(added_rpc_urls(&wallet), expected);

    let params = wallet.params_of(WALLET_ADD_ETHEREUM_CHAIN).pop().flatten().unwrap();
    similar_asserts::assert_eq!(
        params,
        json!([{
            "chainId": "0x4cef52",
            "chainName": "Arc Testnet",
            "nativeCurrency": { "name": "USDC", "symbol": "USDC", "decimals": 6 },
            "rpcUrls": ["https://rpc.drpc.testnet.arc.network"],
            "blockExplorerUrls": ["https://testnet.arcscan.app"]
        }])
    );
}

#[tokio::test]
async fn gives_up_after_every_url_failed() {
    let profile = ChainProfile::arc_testnet();
    let mut wallet = MockWallet::on_chain(1);
    for n in 0..profile.rpc_urls.len() {
        wallet = wallet.script(WALLET_ADD_ETHEREUM_CHAIN, Err(failed(&format!("attempt {n}"))));
    }

    let err = reconciler(&profile).reconcile(&wallet).await.unwrap_err();
    assert_eq!(wallet.count(WALLET_ADD_ETHEREUM_CHAIN), profile.rpc_urls.len());
    assert_eq!(err.kind(), WalletErrorKind::ChainUnrecognized);
    let WalletError::AddChainExhausted { attempts, last, .. } = &err else {
        panic!("unexpected error: {err:?}")
    };
    assert_eq!(*attempts, 4);
    assert_eq!(*last, AddChainFailure::Rpc(failed("attempt 3")));
    assert!(err.to_string().contains("add the network manually"), "{err}");
}

#[tokio::test]
async fn acknowledged_add_that_does_not_activate_moves_on() {
    let profile = ChainProfile::arc_testnet();
    let mut wallet = MockWallet::on_chain(1);
    for _ in 0..profile.rpc_urls.len() {
        wallet = wallet.script(WALLET_ADD_ETHEREUM_CHAIN, Ok(Value::Null));
    }

    let err = reconciler(&profile).reconcile(&wallet).await.unwrap_err();
    assert_eq!(
        err,
        WalletError::AddChainExhausted {
            chain_name: "Arc Testnet".to_string(),
            attempts: 4,
            last: AddChainFailure::Mismatch { actual: Some(1) },
        }
    );
    // initial read plus one verification per add
    assert_eq!(wallet.count(ETH_CHAIN_ID), 5);
    assert_eq!(err.observed_chain_id(), Some(1));
}

#[tokio::test]
async fn failed_read_after_add_moves_on() {
    let profile = ChainProfile {
        rpc_urls: vec!["https://a.example".to_string(), "https://b.example".to_string()],
        ..ChainProfile::arc_testnet()
    };
    let wallet = MockWallet::on_chain(1)
        .script(ETH_CHAIN_ID, Ok(json!("0x1")))
        .script(ETH_CHAIN_ID, Err(failed("transient")));

    let rec = reconciler(&profile).reconcile(&wallet).await.unwrap();
    assert_eq!(rec.outcome, ReconcileOutcome::Added { rpc_url: "https://b.example".to_string() });
    assert_eq!(rec.add_attempts, 2);
    assert_eq!(
        added_rpc_urls(&wallet),
        [json!(["https://a.example"]), json!(["https://b.example"])]
    );
    assert!(rec.trace.contains(&ReconcileState::AddVerifying(0)));
    assert_eq!(wallet.count(ETH_CHAIN_ID), 3);
}

#[tokio::test]
async fn failed_read_after_last_add_is_reported() {
    let profile = ChainProfile {
        rpc_urls: vec!["https://a.example".to_string()],
        ..ChainProfile::arc_testnet()
    };
    let wallet = MockWallet::on_chain(1)
        .script(ETH_CHAIN_ID, Ok(json!("0x1")))
        .script(ETH_CHAIN_ID, Err(failed("transient")));

    let err = reconciler(&profile).reconcile(&wallet).await.unwrap_err();
    assert_eq!(
        err,
        WalletError::AddChainExhausted {
            chain_name: "Arc Testnet".to_string(),
            attempts: 1,
            last: AddChainFailure::Rpc(failed("transient")),
        }
    );
}

#[tokio::test]
async fn rejection_while_verifying_add_is_final() {
    let profile = ChainProfile::arc_testnet();
    let wallet = MockWallet::on_chain(1)
        .script(ETH_CHAIN_ID, Ok(json!("0x1")))
        .script(ETH_CHAIN_ID, Err(rejected()));

    let err = reconciler(&profile).reconcile(&wallet).await.unwrap_err();
    assert_eq!(err.kind(), WalletErrorKind::UserRejected);
    assert_eq!(wallet.count(WALLET_ADD_ETHEREUM_CHAIN), 1);
}

#[tokio::test]
async fn user_rejects_switch() {
    let profile = ChainProfile::arc_testnet();
    let wallet = MockWallet::on_chain(1).script(WALLET_SWITCH_ETHEREUM_CHAIN, Err(rejected()));

    let res = reconciler(&profile).reconcile(&wallet).await;
    let err = res.clone().unwrap_err();
    assert_eq!(err, WalletError::UserRejected(rejected()));
    assert_eq!(err.kind(), WalletErrorKind::UserRejected);
    assert_eq!(wallet.count(WALLET_ADD_ETHEREUM_CHAIN), 0);
    assert_eq!(
        ReconciliationResult::from(&res),
        ReconciliationResult { success: false, final_chain_id: None }
    );
}

#[tokio::test]
async fn user_rejects_add() {
    let profile = ChainProfile::arc_testnet();
    let wallet = MockWallet::on_chain(1)
        .script(WALLET_ADD_ETHEREUM_CHAIN, Err(failed("rpc down")))
        .script(WALLET_ADD_ETHEREUM_CHAIN, Err(rejected()));

    let err = reconciler(&profile).reconcile(&wallet).await.unwrap_err();
    assert_eq!(err.kind(), WalletErrorKind::UserRejected);
    assert_eq!(wallet.count(WALLET_ADD_ETHEREUM_CHAIN), 2);
}

#[tokio::test]
async fn switch_acknowledged_but_not_applied() {
    let profile = ChainProfile::arc_testnet();
    let wallet = MockWallet::on_chain(1).script(WALLET_SWITCH_ETHEREUM_CHAIN, Ok(Value::Null));

    let res = reconciler(&profile).reconcile(&wallet).await;
    assert_eq!(
        res.clone().unwrap_err(),
        WalletError::VerificationMismatch { expected: ARC, actual: Some(1) }
    );
    assert_eq!(wallet.count(WALLET_ADD_ETHEREUM_CHAIN), 0);
    assert_eq!(
        ReconciliationResult::from(&res),
        ReconciliationResult { success: false, final_chain_id: Some(1) }
    );
}

#[tokio::test]
async fn other_errors_are_forwarded_verbatim() {
    let profile = ChainProfile::arc_testnet();
    let pending = ProviderRpcError::with_message(-32002i64, "Request already pending");
    let wallet =
        MockWallet::on_chain(1).script(WALLET_SWITCH_ETHEREUM_CHAIN, Err(pending.clone()));

    let err = reconciler(&profile).reconcile(&wallet).await.unwrap_err();
    assert_eq!(err, WalletError::Provider(pending));
    assert_eq!(err.rpc_error().unwrap().code, ProviderErrorCode::Other(-32002));
    assert_eq!(err.to_string(), "Request already pending (code -32002)");
    assert_eq!(wallet.count(WALLET_ADD_ETHEREUM_CHAIN), 0);
}

#[tokio::test]
async fn malformed_chain_id_fails() {
    let profile = ChainProfile::arc_testnet();
    let wallet = MockWallet::on_chain(1).script(ETH_CHAIN_ID, Ok(json!("mainnet")));

    let err = reconciler(&profile).reconcile(&wallet).await.unwrap_err();
    assert!(matches!(err, WalletError::MalformedChainId(_)), "{err:?}");
    assert_eq!(wallet.count(WALLET_SWITCH_ETHEREUM_CHAIN), 0);
}

#[tokio::test]
async fn no_rpc_urls_to_add() {
    let profile = ChainProfile { rpc_urls: vec![], ..ChainProfile::arc_testnet() };
    let wallet = MockWallet::on_chain(1);

    let err = reconciler(&profile).reconcile(&wallet).await.unwrap_err();
    let WalletError::AddChainExhausted { attempts: 0, last: AddChainFailure::Rpc(last), .. } = &err
    else {
        panic!("unexpected error: {err:?}")
    };
    assert!(last.is_unrecognized_chain());
    assert_eq!(wallet.count(WALLET_ADD_ETHEREUM_CHAIN), 0);
}

#[tokio::test]
async fn no_provider() {
    let profile = ChainProfile::arc_testnet();
    let err = reconciler(&profile).ensure::<MockWallet>(None).await.unwrap_err();
    assert_eq!(err, WalletError::ProviderUnavailable);
    assert_eq!(err.kind(), WalletErrorKind::ProviderUnavailable);

    let wallet = MockWallet::on_chain(ARC);
    assert!(reconciler(&profile).ensure(Some(&wallet)).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn verification_waits_and_polls() {
    let profile = ChainProfile::arc_testnet();
    let wallet = MockWallet::on_chain(1)
        .script(WALLET_SWITCH_ETHEREUM_CHAIN, Ok(Value::Null))
        .script(ETH_CHAIN_ID, Ok(json!("0x1")))
        .script(ETH_CHAIN_ID, Ok(json!("0x1")))
        .script(ETH_CHAIN_ID, Ok(json!("0x4cef52")));
    let policy = VerifyPolicy { settle_delay: Duration::from_secs(1), polls: 3 };

    let start = tokio::time::Instant::now();
    let rec =
        NetworkReconciler::new(&profile).with_policy(policy).reconcile(&wallet).await.unwrap();
    assert_eq!(rec.outcome, ReconcileOutcome::Switched);
    // 1s before the first poll, 2s before the second
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert_eq!(wallet.count(ETH_CHAIN_ID), 3);
}

#[test]
fn result_is_reported_in_camel_case() {
    let res = ReconciliationResult { success: true, final_chain_id: Some(ARC) };
    assert_eq!(
        serde_json::to_value(res).unwrap(),
        json!({ "success": true, "finalChainId": 5042002 })
    );
}
