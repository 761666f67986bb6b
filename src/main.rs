//! Demonstration run against the mock connector and mock ledger.
//!
//! Exercises both lifecycle paths offline: a deposit confirmed by
//! sequence advance and settled against the (mock) ledger, then a
//! withdrawal confirmed through the (mock) backend probe.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use fundbridge::config::AppConfig;
use fundbridge::connector::MockConnector;
use fundbridge::ledger::{MockLedger, WithdrawalProbe};
use fundbridge::logging::init_logging;
use fundbridge::orchestrator::{OperationStatus, Orchestrator};
use fundbridge::rate::FixedRateProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::args().nth(1).unwrap_or_else(|| "default".to_string());
    let config = AppConfig::load(&env);
    let _guard = init_logging(&config);

    info!("fundbridge demo starting (config: {})", env);

    // Wallet with a scripted chain: the sequence advances on the third
    // poll, as if the signed transfer landed ~6s after submission.
    let connector = Arc::new(MockConnector::connected("EQDemoUserWallet"));
    connector.script_sequence(&[5, 5, 6], "demo-tx-hash");

    let ledger = Arc::new(MockLedger::new());
    ledger.script_probes(vec![
        Ok(WithdrawalProbe {
            success: true,
            seqno_increased: false,
            transaction_hash: None,
        }),
        Ok(WithdrawalProbe {
            success: true,
            seqno_increased: true,
            transaction_hash: Some("demo-payout-hash".to_string()),
        }),
    ]);

    let rates = Arc::new(FixedRateProvider {
        fiat_per_native: Decimal::from(3),
    });

    let orchestrator = Orchestrator::new(connector, rates, ledger, config.funding.clone());

    // Deposit 30 fiat units
    let mut deposit = orchestrator.deposit("30")?;
    match deposit.wait_terminal().await {
        Some(OperationStatus::Succeeded { chain_reference }) => {
            info!(chain_reference = %chain_reference, "Deposit succeeded");
        }
        Some(OperationStatus::Failed { failure }) => {
            info!(
                title = %failure.notice.title,
                detail = %failure.notice.detail,
                "Deposit failed"
            );
        }
        other => info!(?other, "Deposit ended without a terminal state"),
    }

    // Withdraw 15 fiat units
    let mut withdrawal = orchestrator.withdraw("15")?;
    match withdrawal.wait_terminal().await {
        Some(OperationStatus::Succeeded { chain_reference }) => {
            info!(chain_reference = %chain_reference, "Withdrawal succeeded");
        }
        Some(OperationStatus::Failed { failure }) => {
            info!(
                title = %failure.notice.title,
                detail = %failure.notice.detail,
                "Withdrawal failed"
            );
        }
        other => info!(?other, "Withdrawal ended without a terminal state"),
    }

    Ok(())
}
