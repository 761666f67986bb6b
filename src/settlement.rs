//! Settlement reporting
//!
//! Posts proof of a confirmed transfer to the backend ledger exactly once.
//! The backend dedupes by chain reference as a second line of defense; the
//! reporter's own reservation set guarantees this process never issues two
//! reports for the same reference, even across racing callers.
//!
//! A reservation is permanent for the process lifetime. It is NOT released
//! on transport failure: after a send we cannot know whether the backend
//! recorded the credit, and a repeat post is the one thing this component
//! exists to prevent.

use dashmap::DashSet;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::core_types::AccountRef;
use crate::ledger::{LedgerApi, LedgerError, SettlementStatus};

#[derive(Debug, Error, Clone)]
pub enum SettlementError {
    #[error("Settlement unreachable: {0}")]
    Unreachable(String),
    #[error("Settlement rejected: {0}")]
    Rejected(String),
    #[error("Chain reference already reported: {0}")]
    AlreadyReported(String),
}

/// Backend acknowledgement of a settlement post.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementResult {
    pub message: String,
    pub reference_rate: Option<f64>,
}

pub struct SettlementReporter {
    ledger: Arc<dyn LedgerApi>,
    reported: DashSet<String>,
}

impl SettlementReporter {
    pub fn new(ledger: Arc<dyn LedgerApi>) -> Self {
        Self {
            ledger,
            reported: DashSet::new(),
        }
    }

    /// Post proof of the confirmed transfer identified by
    /// `chain_reference`.
    pub async fn report(
        &self,
        account: &AccountRef,
        fiat_amount: Decimal,
        chain_reference: &str,
    ) -> Result<SettlementResult, SettlementError> {
        // 1. Reserve the reference before touching the network so two
        //    racing callers cannot both reach the backend.
        if !self.reported.insert(chain_reference.to_string()) {
            warn!(chain_reference, "Refusing duplicate settlement report");
            return Err(SettlementError::AlreadyReported(
                chain_reference.to_string(),
            ));
        }

        // 2. Single idempotent-intent post.
        let reply = self
            .ledger
            .report_settlement(account, fiat_amount, chain_reference)
            .await
            .map_err(|e| match e {
                LedgerError::Unreachable(msg) | LedgerError::Malformed(msg) => {
                    SettlementError::Unreachable(msg)
                }
            })?;

        // 3. Interpret the parsed record.
        match reply.status {
            SettlementStatus::Success => {
                info!(
                    account = %account,
                    chain_reference,
                    amount = %fiat_amount,
                    "Settlement acknowledged"
                );
                Ok(SettlementResult {
                    message: reply.message,
                    reference_rate: reply.reference_rate,
                })
            }
            SettlementStatus::Failed => Err(SettlementError::Rejected(reply.message)),
        }
    }
}
