//! Sequence-based confirmation (deposit path)
//!
//! The client reads chain state for its own account, so confirmation is
//! direct: snapshot the sequence counter before submission, then watch for
//! it to advance. The account's last transaction hash at that moment is
//! the chain reference.

use async_trait::async_trait;
use std::sync::Arc;

use super::{ConfirmError, ConfirmationStrategy};
use crate::connector::WalletConnector;
use crate::core_types::{AccountRef, ConfirmationResult, SeqNum};

pub struct SequenceConfirmation {
    connector: Arc<dyn WalletConnector>,
    account: AccountRef,
    initial_sequence: SeqNum,
}

impl SequenceConfirmation {
    pub fn new(
        connector: Arc<dyn WalletConnector>,
        account: AccountRef,
        initial_sequence: SeqNum,
    ) -> Self {
        Self {
            connector,
            account,
            initial_sequence,
        }
    }
}

#[async_trait]
impl ConfirmationStrategy for SequenceConfirmation {
    async fn check(&self) -> Result<Option<ConfirmationResult>, ConfirmError> {
        let state = self
            .connector
            .account_state(&self.account)
            .await
            .map_err(|e| ConfirmError::CheckFailed(e.to_string()))?;

        if state.sequence_number <= self.initial_sequence {
            return Ok(None);
        }

        // Sequence advanced but no hash to reference the transfer by:
        // without it the backend cannot dedupe, so this is a failed check,
        // not a confirmation.
        if state.last_tx_hash.is_empty() {
            return Err(ConfirmError::CheckFailed(
                "sequence advanced without a transaction hash".to_string(),
            ));
        }

        Ok(Some(ConfirmationResult::confirmed(state.last_tx_hash)))
    }
}
