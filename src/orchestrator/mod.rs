//! Transaction lifecycle orchestration
//!
//! Drives one state machine per user-initiated operation:
//!
//! ```text
//! IDLE -> VALIDATING -> AWAITING_SIGNATURE -> SUBMITTED -> CONFIRMING -> SETTLING -> SUCCEEDED
//!    \________\_________________\_______________\______________\____________\____-> FAILED
//! ```
//!
//! The withdraw path skips `AWAITING_SIGNATURE` (the custodian signs, not
//! the user) and `SETTLING` (its confirmation probe is already
//! backend-mediated).
//!
//! # Safety invariants
//!
//! 1. **One in-flight operation per (account, kind)**: a second start is
//!    rejected with `OperationInProgress`, never queued or raced.
//! 2. **Fresh rate per submission**: the exchange rate is fetched inside
//!    the flow, after validation, for every operation.
//! 3. **Cancellation discards, never acts**: once an operation is
//!    cancelled its poll loop stops and any confirmation that still
//!    resolves is dropped without touching the settlement reporter.
//! 4. **Settlement at most once**: the reporter owns the exactly-once
//!    guarantee; the flows call it a single time per confirmed transfer.

pub mod error;
pub mod state;

#[cfg(test)]
mod integration_tests;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{OnceCell, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::FundingConfig;
use crate::confirm::{
    ConfirmError, ProbeConfirmation, SequenceConfirmation, await_confirmation,
};
use crate::connector::WalletConnector;
use crate::core_types::{AccountRef, ActivationState, OperationKind, TransferRequest};
use crate::ledger::{LedgerApi, LedgerError};
use crate::money::{fiat_to_minor_units, minor_units_to_native};
use crate::rate::RateProvider;
use crate::settlement::SettlementReporter;
use crate::validate::validate_amount;

pub use error::{Failure, FailureClass, Notice, OperationError};
pub use state::OperationStatus;

/// Handle to one in-flight operation.
///
/// Owns the operation's cancellation signal; cancel is a first-class
/// call, and dropping the handle cancels too (the poll loop notices the
/// closed channel at its next tick). The status receiver is the UI's
/// observation surface.
#[derive(Debug)]
pub struct OperationHandle {
    op_id: Uuid,
    kind: OperationKind,
    status: watch::Receiver<OperationStatus>,
    cancel: watch::Sender<bool>,
    #[allow(dead_code)]
    task: JoinHandle<()>,
}

impl OperationHandle {
    pub fn op_id(&self) -> Uuid {
        self.op_id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Subscribe to status changes.
    pub fn status(&self) -> watch::Receiver<OperationStatus> {
        self.status.clone()
    }

    pub fn current(&self) -> OperationStatus {
        self.status.borrow().clone()
    }

    /// Cancel the operation. Idempotent. The running flow stops at its
    /// next suspension point; a confirmation arriving afterwards is
    /// discarded.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Wait until the operation reaches `Succeeded`/`Failed`.
    ///
    /// Returns `None` if the operation was cancelled (dismissed) before
    /// reaching a terminal state.
    pub async fn wait_terminal(&mut self) -> Option<OperationStatus> {
        loop {
            let current = self.status.borrow_and_update().clone();
            if current.is_terminal() {
                return Some(current);
            }
            if self.status.changed().await.is_err() {
                let last = self.status.borrow().clone();
                return last.is_terminal().then_some(last);
            }
        }
    }
}

/// Frees the (account, kind) slot when the operation's task ends, however
/// it ends.
struct InFlightGuard {
    inner: Arc<Inner>,
    key: (AccountRef, OperationKind),
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight.remove(&self.key);
    }
}

/// Publishes status transitions, enforcing forward-only movement.
struct StatusPublisher {
    op_id: Uuid,
    kind: OperationKind,
    tx: watch::Sender<OperationStatus>,
}

impl StatusPublisher {
    fn advance(&self, next: OperationStatus) {
        let current = self.tx.borrow().clone();
        if !current.can_transition_to(&next) {
            error!(
                op_id = %self.op_id,
                from = %current,
                to = %next,
                "Illegal state transition suppressed"
            );
            return;
        }
        debug!(op_id = %self.op_id, kind = %self.kind, from = %current, to = %next, "State change");
        let _ = self.tx.send(next);
    }
}

/// Resolves once cancellation is signalled or the handle is gone.
async fn cancellation(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow() {
            return;
        }
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

struct Inner {
    connector: Arc<dyn WalletConnector>,
    rates: Arc<dyn RateProvider>,
    ledger: Arc<dyn LedgerApi>,
    reporter: SettlementReporter,
    settings: FundingConfig,
    deposit_destination: AccountRef,
    accounts: watch::Receiver<Option<AccountRef>>,
    /// Session-scoped activation cache; probed once, read-only after.
    activation: OnceCell<ActivationState>,
    in_flight: DashMap<(AccountRef, OperationKind), Uuid>,
}

/// One orchestrator per wallet session. Cheap to clone; clones share the
/// session state (activation cache, in-flight registry, reporter).
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        connector: Arc<dyn WalletConnector>,
        rates: Arc<dyn RateProvider>,
        ledger: Arc<dyn LedgerApi>,
        settings: FundingConfig,
    ) -> Self {
        let accounts = connector.accounts();
        let deposit_destination = AccountRef(settings.custody_address.clone());
        Self {
            inner: Arc::new(Inner {
                connector,
                rates,
                reporter: SettlementReporter::new(ledger.clone()),
                ledger,
                settings,
                deposit_destination,
                accounts,
                activation: OnceCell::new(),
                in_flight: DashMap::new(),
            }),
        }
    }

    /// Start a deposit (wallet -> platform) for a fiat-denominated amount.
    ///
    /// Fails fast, before spawning anything, when no wallet is connected
    /// or an operation for this (account, kind) is already in flight.
    pub fn deposit(&self, fiat_amount: &str) -> Result<OperationHandle, OperationError> {
        self.start(OperationKind::Deposit, fiat_amount)
    }

    /// Start a withdrawal (platform -> wallet) for a fiat-denominated
    /// amount.
    pub fn withdraw(&self, fiat_amount: &str) -> Result<OperationHandle, OperationError> {
        self.start(OperationKind::Withdraw, fiat_amount)
    }

    /// Fiat balance available for withdrawal, for display before the
    /// user commits to an amount.
    pub async fn available_balance(&self) -> Result<Decimal, OperationError> {
        let account = self.inner.connected_account()?;
        self.inner
            .ledger
            .fiat_balance(&account)
            .await
            .map_err(|e| OperationError::SettlementUnreachable(e.to_string()))
    }

    fn start(
        &self,
        kind: OperationKind,
        fiat_amount: &str,
    ) -> Result<OperationHandle, OperationError> {
        let account = self.inner.connected_account()?;
        let op_id = Uuid::new_v4();

        // Claim the (account, kind) slot before anything else runs.
        match self.inner.in_flight.entry((account.clone(), kind)) {
            Entry::Occupied(_) => return Err(OperationError::OperationInProgress),
            Entry::Vacant(slot) => {
                slot.insert(op_id);
            }
        }
        let guard = InFlightGuard {
            inner: self.inner.clone(),
            key: (account.clone(), kind),
        };

        info!(%op_id, %kind, %account, amount = fiat_amount, "Operation started");

        let (status_tx, status_rx) = watch::channel(OperationStatus::Idle);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let publisher = StatusPublisher {
            op_id,
            kind,
            tx: status_tx,
        };

        let inner = self.inner.clone();
        let raw_amount = fiat_amount.to_string();
        let task = tokio::spawn(async move {
            let _slot = guard;
            let mut cancel = cancel_rx;

            let outcome = match kind {
                OperationKind::Deposit => {
                    inner
                        .deposit_flow(&account, &raw_amount, &publisher, &mut cancel)
                        .await
                }
                OperationKind::Withdraw => {
                    inner
                        .withdraw_flow(&account, &raw_amount, &publisher, &mut cancel)
                        .await
                }
            };

            match outcome {
                Ok(Some(terminal)) => publisher.advance(terminal),
                Ok(None) => {
                    info!(%op_id, %kind, "Operation cancelled; result discarded");
                }
                Err(e) => {
                    warn!(%op_id, %kind, error = %e, "Operation failed");
                    publisher.advance(OperationStatus::Failed {
                        failure: e.failure(),
                    });
                }
            }
        });

        Ok(OperationHandle {
            op_id,
            kind,
            status: status_rx,
            cancel: cancel_tx,
            task,
        })
    }
}

impl Inner {
    fn connected_account(&self) -> Result<AccountRef, OperationError> {
        self.accounts
            .borrow()
            .clone()
            .ok_or(OperationError::WalletNotConnected)
    }

    /// Activation state for this session, probed once and cached. A probe
    /// failure downgrades to `NotActivated` (the conservative floor) for
    /// the rest of the session, mirroring the stricter policy tier.
    async fn session_activation(&self, account: &AccountRef) -> ActivationState {
        *self
            .activation
            .get_or_init(|| async {
                match self.ledger.check_activation(account).await {
                    Ok(state) => {
                        info!(%account, activated = state.is_activated(), "Activation derived");
                        state
                    }
                    Err(e) => {
                        warn!(%account, error = %e, "Activation probe failed; assuming not activated");
                        ActivationState::NotActivated
                    }
                }
            })
            .await
    }

    /// Deposit: validate, price, snapshot sequence, sign, confirm by
    /// sequence advance, settle. `Ok(None)` means the operation was
    /// cancelled and its result discarded.
    async fn deposit_flow(
        &self,
        account: &AccountRef,
        raw_amount: &str,
        publisher: &StatusPublisher,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<Option<OperationStatus>, OperationError> {
        // 1. Validate against the session's policy floor.
        let activation = self.session_activation(account).await;
        let fiat = validate_amount(raw_amount, activation, &self.settings.minimums)?;
        publisher.advance(OperationStatus::Validating);

        // 2. Price at submission time and build the immutable request.
        let rate = self.rates.fetch_rate().await?;
        let amount_minor_units = fiat_to_minor_units(fiat, &rate)?;

        // 3. Sequence snapshot MUST precede submission or a fast transfer
        //    could be missed entirely.
        let initial = self.connector.account_state(account).await?;

        let request = TransferRequest {
            destination: self.deposit_destination.clone(),
            amount_minor_units,
            valid_until: Utc::now()
                + chrono::Duration::seconds(self.settings.request_ttl_secs as i64),
        };

        info!(
            op_id = %publisher.op_id,
            fiat = %fiat,
            minor_units = amount_minor_units,
            rate = %rate.fiat_per_native,
            initial_seqno = initial.sequence_number,
            "Deposit priced"
        );

        // 4. Interactive signing; the user controls how long this takes.
        publisher.advance(OperationStatus::AwaitingSignature);
        let receipt = tokio::select! {
            submitted = self.connector.submit(request) => submitted?,
            _ = cancellation(cancel) => return Ok(None),
        };
        publisher.advance(OperationStatus::Submitted);
        debug!(op_id = %publisher.op_id, payload_len = receipt.signed_payload.len(), "Receipt held");

        // 5. Bounded confirmation poll.
        publisher.advance(OperationStatus::Confirming);
        let strategy = SequenceConfirmation::new(
            self.connector.clone(),
            account.clone(),
            initial.sequence_number,
        );
        let confirmation =
            match await_confirmation(&strategy, &self.settings.sequence_poll, cancel).await {
                Ok(confirmation) => confirmation,
                Err(ConfirmError::Cancelled) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
        let chain_reference = confirmation.chain_reference.unwrap_or_default();

        // 6. A confirmation that resolves after cancellation is discarded;
        //    the settlement reporter must not hear about it.
        if *cancel.borrow() {
            return Ok(None);
        }

        // 7. Reconcile with the ledger exactly once.
        publisher.advance(OperationStatus::Settling);
        let settlement = self
            .reporter
            .report(account, fiat, &chain_reference)
            .await?;
        info!(
            op_id = %publisher.op_id,
            chain_reference = %chain_reference,
            message = %settlement.message,
            "Deposit settled"
        );

        Ok(Some(OperationStatus::Succeeded { chain_reference }))
    }

    /// Withdraw: validate, price, hand off to the custodian, confirm via
    /// the backend probe. No signature prompt and no settlement post; the
    /// backend is on both ends of this path.
    async fn withdraw_flow(
        &self,
        account: &AccountRef,
        raw_amount: &str,
        publisher: &StatusPublisher,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<Option<OperationStatus>, OperationError> {
        // 1. Validate against the session's policy floor.
        let activation = self.session_activation(account).await;
        let fiat = validate_amount(raw_amount, activation, &self.settings.minimums)?;
        publisher.advance(OperationStatus::Validating);

        // 2. Price at submission time.
        let rate = self.rates.fetch_rate().await?;
        let native = minor_units_to_native(fiat_to_minor_units(fiat, &rate)?);

        // 3. Ask the backend to pay out.
        let accepted = self
            .ledger
            .initiate_withdrawal(account, native, fiat)
            .await
            .map_err(|e| match e {
                LedgerError::Unreachable(msg) | LedgerError::Malformed(msg) => {
                    OperationError::SettlementUnreachable(msg)
                }
            })?;
        if !accepted.success {
            let message = accepted
                .message
                .unwrap_or_else(|| "Withdrawal failed".to_string());
            return Err(OperationError::SettlementRejected(message));
        }
        publisher.advance(OperationStatus::Submitted);
        info!(op_id = %publisher.op_id, fiat = %fiat, native = %native, "Withdrawal accepted");

        // 4. Bounded probe poll. The cap is an operator policy knob; it
        //    must exist so an abandoned payout cannot leak a timer.
        publisher.advance(OperationStatus::Confirming);
        let strategy = ProbeConfirmation::new(self.ledger.clone());
        let confirmation =
            match await_confirmation(&strategy, &self.settings.probe_poll, cancel).await {
                Ok(confirmation) => confirmation,
                Err(ConfirmError::Cancelled) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
        let chain_reference = confirmation.chain_reference.unwrap_or_default();

        if *cancel.borrow() {
            return Ok(None);
        }

        info!(op_id = %publisher.op_id, chain_reference = %chain_reference, "Withdrawal confirmed");
        Ok(Some(OperationStatus::Succeeded { chain_reference }))
    }
}
