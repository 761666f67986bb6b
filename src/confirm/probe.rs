//! Probe-based confirmation (withdraw path)
//!
//! Withdrawal status is mediated by the backend: the custodian signs the
//! payout, so the client cannot watch its own sequence counter. Instead we
//! poll the backend's check-transaction probe until it reports the payout
//! seqno advanced. Any probe error aborts the loop.

use async_trait::async_trait;
use std::sync::Arc;

use super::{ConfirmError, ConfirmationStrategy};
use crate::core_types::ConfirmationResult;
use crate::ledger::LedgerApi;

pub struct ProbeConfirmation {
    ledger: Arc<dyn LedgerApi>,
}

impl ProbeConfirmation {
    pub fn new(ledger: Arc<dyn LedgerApi>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl ConfirmationStrategy for ProbeConfirmation {
    async fn check(&self) -> Result<Option<ConfirmationResult>, ConfirmError> {
        let probe = self
            .ledger
            .withdrawal_status()
            .await
            .map_err(|e| ConfirmError::CheckFailed(e.to_string()))?;

        if !(probe.success && probe.seqno_increased) {
            return Ok(None);
        }

        match probe.transaction_hash {
            Some(hash) if !hash.is_empty() => Ok(Some(ConfirmationResult::confirmed(hash))),
            _ => Err(ConfirmError::CheckFailed(
                "probe confirmed without a transaction hash".to_string(),
            )),
        }
    }
}
