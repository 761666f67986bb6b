//! Integration tests for the operation lifecycle
//!
//! Full deposit and withdrawal flows against the scripted mock connector
//! and mock ledger; no network, virtual time. The harness mirrors a real
//! wiring: one connector, one ledger, one orchestrator per wallet session.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::time::Duration;

use crate::config::FundingConfig;
use crate::connector::MockConnector;
use crate::connector::mock::SubmitScript;
use crate::core_types::ActivationState;
use crate::ledger::{LedgerError, MockLedger, WithdrawalAccepted, WithdrawalProbe};
use crate::money::UNIT_SCALE;
use crate::orchestrator::{
    FailureClass, OperationError, OperationHandle, OperationStatus, Orchestrator,
};
use crate::rate::FixedRateProvider;

struct TestHarness {
    connector: Arc<MockConnector>,
    ledger: Arc<MockLedger>,
    orchestrator: Orchestrator,
}

impl TestHarness {
    /// Connected wallet, 3 fiat units per native unit, default policy.
    fn new() -> Self {
        Self::with_connector(Arc::new(MockConnector::connected("EQUserWallet")))
    }

    fn with_connector(connector: Arc<MockConnector>) -> Self {
        let ledger = Arc::new(MockLedger::new());
        let rates = Arc::new(FixedRateProvider {
            fiat_per_native: Decimal::from(3),
        });
        let settings = FundingConfig {
            custody_address: "EQCustodyVault".to_string(),
            ..FundingConfig::default()
        };
        let orchestrator =
            Orchestrator::new(connector.clone(), rates, ledger.clone(), settings);

        Self {
            connector,
            ledger,
            orchestrator,
        }
    }
}

async fn wait_until_confirming(handle: &OperationHandle) {
    let mut rx = handle.status();
    loop {
        if matches!(*rx.borrow_and_update(), OperationStatus::Confirming) {
            return;
        }
        rx.changed().await.expect("operation ended before confirming");
    }
}

fn probe_pending() -> WithdrawalProbe {
    WithdrawalProbe {
        success: true,
        seqno_increased: false,
        transaction_hash: None,
    }
}

fn probe_done(hash: &str) -> WithdrawalProbe {
    WithdrawalProbe {
        success: true,
        seqno_increased: true,
        transaction_hash: Some(hash.to_string()),
    }
}

// ============================================================================
// Deposit path
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_deposit_happy_path() {
    let harness = TestHarness::new();
    // First reading is the pre-submission snapshot (initial sequence 5);
    // the four that follow are polls: 5, 5, 5, then the advance.
    harness.connector.script_sequence(&[5, 5, 5, 5, 6], "txhash");

    let mut handle = harness.orchestrator.deposit("30").unwrap();
    let terminal = handle.wait_terminal().await.unwrap();

    assert_eq!(
        terminal,
        OperationStatus::Succeeded {
            chain_reference: "txhash".to_string()
        }
    );

    // The transfer was built once, at the submission-time rate:
    // 30 fiat / 3 per native = 10 native units.
    let submitted = harness.connector.submitted_requests();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].amount_minor_units, 10 * UNIT_SCALE);
    assert_eq!(submitted[0].destination.as_str(), "EQCustodyVault");

    // Settled exactly once, keyed by the confirmed chain reference.
    let settlements = harness.ledger.settlement_calls();
    assert_eq!(settlements.len(), 1);
    assert_eq!(settlements[0].chain_reference, "txhash");
    assert_eq!(settlements[0].fiat_amount, Decimal::from(30));

    // Snapshot + 4 confirmation polls: confirmed on the 4th poll, no
    // earlier false positive.
    assert_eq!(harness.connector.state_call_count(), 5);
}

#[tokio::test]
async fn test_deposit_rejects_amount_below_floor() {
    let harness = TestHarness::new();

    let mut handle = harness.orchestrator.deposit("5").unwrap();
    let terminal = handle.wait_terminal().await.unwrap();

    match terminal {
        OperationStatus::Failed { failure } => {
            assert_eq!(failure.class, FailureClass::Rejection);
            assert_eq!(failure.notice.title, "Invalid Amount");
        }
        other => panic!("expected failure, got {other}"),
    }

    // Nothing was submitted and nothing settled.
    assert!(harness.connector.submitted_requests().is_empty());
    assert!(harness.ledger.settlement_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dormant_account_floor_and_session_cache() {
    let harness = TestHarness::new();
    harness
        .ledger
        .script_activation(Ok(ActivationState::NotActivated));

    // 20 clears the activated floor but not the dormant one.
    let mut handle = harness.orchestrator.deposit("20").unwrap();
    let terminal = handle.wait_terminal().await.unwrap();
    assert!(matches!(terminal, OperationStatus::Failed { .. }));

    // 30 passes; activation is NOT re-probed for the second operation.
    harness.connector.script_sequence(&[5, 6], "txhash");
    let mut handle = harness.orchestrator.deposit("30").unwrap();
    let terminal = handle.wait_terminal().await.unwrap();
    assert!(matches!(terminal, OperationStatus::Succeeded { .. }));

    assert_eq!(harness.ledger.activation_call_count(), 1);
}

#[tokio::test]
async fn test_user_rejection() {
    let harness = TestHarness::new();
    harness.connector.script_sequence(&[5], "txhash");
    harness.connector.script_submit(SubmitScript::Reject);

    let mut handle = harness.orchestrator.deposit("30").unwrap();
    let terminal = handle.wait_terminal().await.unwrap();

    match terminal {
        OperationStatus::Failed { failure } => {
            assert_eq!(failure.class, FailureClass::Rejection);
            assert_eq!(failure.notice.title, "Transaction Rejected");
            assert_eq!(failure.notice.footer, "No funds were deducted");
        }
        other => panic!("expected failure, got {other}"),
    }

    // Only the pre-submission snapshot touched chain state; no poll loop
    // ever started.
    assert_eq!(harness.connector.state_call_count(), 1);
    assert!(harness.ledger.settlement_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_deposit_confirmation_timeout() {
    let harness = TestHarness::new();
    // Sequence never advances.
    harness.connector.script_sequence(&[5], "txhash");

    let mut handle = harness.orchestrator.deposit("30").unwrap();
    let terminal = handle.wait_terminal().await.unwrap();

    match terminal {
        OperationStatus::Failed { failure } => {
            assert_eq!(failure.class, FailureClass::Timeout);
            // Worded as unknown outcome, not definite failure.
            assert_eq!(failure.notice.title, "Transfer Status Unknown");
        }
        other => panic!("expected failure, got {other}"),
    }

    // Snapshot + the full attempt cap, then the loop tore down.
    assert_eq!(harness.connector.state_call_count(), 21);
    // Unknown outcome must not be settled.
    assert!(harness.ledger.settlement_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_operation_rejected_while_confirming() {
    let harness = TestHarness::new();
    harness.connector.script_sequence(&[5], "txhash");

    let handle = harness.orchestrator.deposit("30").unwrap();
    wait_until_confirming(&handle).await;

    // Same (account, kind): fail fast, no second poll loop.
    let err = harness.orchestrator.deposit("30").unwrap_err();
    assert_eq!(err, OperationError::OperationInProgress);

    // A different kind occupies its own slot and may start.
    harness.ledger.script_probes(vec![Ok(probe_done("wd"))]);
    let mut withdrawal = harness.orchestrator.withdraw("15").unwrap();
    let terminal = withdrawal.wait_terminal().await.unwrap();
    assert!(matches!(terminal, OperationStatus::Succeeded { .. }));

    handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_confirming_stops_polling() {
    let harness = TestHarness::new();
    harness.connector.script_sequence(&[5], "txhash");

    let mut handle = harness.orchestrator.deposit("30").unwrap();
    wait_until_confirming(&handle).await;

    // Let a few polls happen, then navigate away.
    tokio::time::sleep(Duration::from_secs(7)).await;
    handle.cancel();

    // No terminal state: the operation was dismissed.
    assert_eq!(handle.wait_terminal().await, None);

    let polls_at_cancel = harness.connector.state_call_count();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(
        harness.connector.state_call_count(),
        polls_at_cancel,
        "poll loop leaked past cancellation"
    );
    assert!(harness.ledger.settlement_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_late_confirmation_after_cancel_is_discarded() {
    let harness = TestHarness::new();
    // After the snapshot, confirmation would land on the third poll (t=6s).
    harness.connector.script_sequence(&[5, 5, 5, 6], "txhash");

    let mut handle = harness.orchestrator.deposit("30").unwrap();
    wait_until_confirming(&handle).await;

    // Cancel between the second and third poll.
    tokio::time::sleep(Duration::from_secs(4)).await;
    handle.cancel();
    assert_eq!(handle.wait_terminal().await, None);

    // Even though the chain would have confirmed, settlement never ran.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(harness.ledger.settlement_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_awaiting_signature() {
    let harness = TestHarness::new();
    harness.connector.script_sequence(&[5], "txhash");
    harness.connector.script_submit(SubmitScript::Hang);

    let mut handle = harness.orchestrator.deposit("30").unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    handle.cancel();
    assert_eq!(handle.wait_terminal().await, None);

    // No polling ever started past the snapshot.
    assert_eq!(harness.connector.state_call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slot_freed_after_terminal_state() {
    let harness = TestHarness::new();
    harness.connector.script_sequence(&[5, 6], "txhash-1");

    let mut handle = harness.orchestrator.deposit("30").unwrap();
    handle.wait_terminal().await.unwrap();

    // The slot is free again; a new deposit may start from idle.
    harness.connector.script_sequence(&[6, 7], "txhash-2");
    let mut handle = harness.orchestrator.deposit("45").unwrap();
    let terminal = handle.wait_terminal().await.unwrap();

    assert_eq!(
        terminal,
        OperationStatus::Succeeded {
            chain_reference: "txhash-2".to_string()
        }
    );
    assert_eq!(harness.ledger.settlement_calls().len(), 2);
}

#[tokio::test]
async fn test_wallet_not_connected_fails_fast() {
    let harness = TestHarness::with_connector(Arc::new(MockConnector::new(None)));

    let err = harness.orchestrator.deposit("30").unwrap_err();
    assert_eq!(err, OperationError::WalletNotConnected);

    let err = harness.orchestrator.withdraw("30").unwrap_err();
    assert_eq!(err, OperationError::WalletNotConnected);
}

#[tokio::test]
async fn test_account_change_is_observed_via_subscription() {
    let connector = Arc::new(MockConnector::new(None));
    let harness = TestHarness::with_connector(connector.clone());

    assert!(harness.orchestrator.deposit("30").is_err());

    // Wallet connects later; the orchestrator sees it without polling.
    connector.set_account(Some("EQLateWallet".into()));
    connector.script_sequence(&[1, 2], "txhash");
    let mut handle = harness.orchestrator.deposit("30").unwrap();
    assert!(matches!(
        handle.wait_terminal().await.unwrap(),
        OperationStatus::Succeeded { .. }
    ));
}

// ============================================================================
// Withdrawal path
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_withdraw_happy_path() {
    let harness = TestHarness::new();
    harness
        .ledger
        .script_probes(vec![Ok(probe_pending()), Ok(probe_done("wd-hash"))]);

    let mut handle = harness.orchestrator.withdraw("15").unwrap();
    let terminal = handle.wait_terminal().await.unwrap();

    assert_eq!(
        terminal,
        OperationStatus::Succeeded {
            chain_reference: "wd-hash".to_string()
        }
    );

    // The custodian signs: the wallet connector is never asked to.
    assert!(harness.connector.submitted_requests().is_empty());
    // And the probe is already backend-mediated: no settlement post.
    assert!(harness.ledger.settlement_calls().is_empty());
}

#[tokio::test]
async fn test_withdraw_declined_classifies_insufficient_funds() {
    let harness = TestHarness::new();
    harness.ledger.script_withdrawal_accept(Ok(WithdrawalAccepted {
        success: false,
        message: Some("Insufficient balance".to_string()),
    }));

    let mut handle = harness.orchestrator.withdraw("500").unwrap();
    let terminal = handle.wait_terminal().await.unwrap();

    match terminal {
        OperationStatus::Failed { failure } => {
            assert_eq!(failure.class, FailureClass::InsufficientFunds);
            assert_eq!(failure.notice.detail, "Insufficient balance");
        }
        other => panic!("expected failure, got {other}"),
    }
}

#[tokio::test]
async fn test_withdraw_probe_error_aborts() {
    let harness = TestHarness::new();
    harness
        .ledger
        .script_probes(vec![Err(LedgerError::Unreachable("503".to_string()))]);

    let mut handle = harness.orchestrator.withdraw("15").unwrap();
    let terminal = handle.wait_terminal().await.unwrap();

    match terminal {
        OperationStatus::Failed { failure } => {
            assert_eq!(failure.class, FailureClass::Network);
            assert_eq!(failure.notice.title, "Confirmation Check Failed");
        }
        other => panic!("expected failure, got {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_withdraw_poll_is_bounded() {
    let harness = TestHarness::new();
    // Default mock probe reading never confirms; the loop must still end.
    let mut handle = harness.orchestrator.withdraw("15").unwrap();
    let terminal = handle.wait_terminal().await.unwrap();

    match terminal {
        OperationStatus::Failed { failure } => {
            assert_eq!(failure.class, FailureClass::Timeout);
        }
        other => panic!("expected timeout, got {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_withdraw_cancel_stops_probe_loop() {
    let harness = TestHarness::new();

    let mut handle = harness.orchestrator.withdraw("15").unwrap();
    wait_until_confirming(&handle).await;

    tokio::time::sleep(Duration::from_secs(11)).await;
    handle.cancel();
    assert_eq!(handle.wait_terminal().await, None);

    // The slot frees on cancellation too.
    harness.ledger.script_probes(vec![Ok(probe_done("wd"))]);
    let mut handle = harness.orchestrator.withdraw("15").unwrap();
    assert!(matches!(
        handle.wait_terminal().await.unwrap(),
        OperationStatus::Succeeded { .. }
    ));
}
