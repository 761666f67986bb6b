//! Mock ledger
//!
//! Scriptable in-memory stand-in for the backend. Records every settlement
//! call so tests can assert the exactly-once property.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    LedgerApi, LedgerError, SettlementReply, SettlementStatus, WithdrawalAccepted,
    WithdrawalProbe,
};
use crate::core_types::{AccountRef, ActivationState};

#[derive(Debug, Clone)]
pub struct RecordedSettlement {
    pub account: AccountRef,
    pub fiat_amount: Decimal,
    pub chain_reference: String,
}

pub struct MockLedger {
    activation: Mutex<Result<ActivationState, LedgerError>>,
    activation_calls: AtomicUsize,
    settlement_reply: Mutex<Result<SettlementReply, LedgerError>>,
    settlements: Mutex<Vec<RecordedSettlement>>,
    withdrawal_accept: Mutex<Result<WithdrawalAccepted, LedgerError>>,
    /// Probe readings, consumed one per call; the last repeats.
    probes: Mutex<VecDeque<Result<WithdrawalProbe, LedgerError>>>,
    balance: Mutex<Decimal>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            activation: Mutex::new(Ok(ActivationState::Activated)),
            activation_calls: AtomicUsize::new(0),
            settlement_reply: Mutex::new(Ok(SettlementReply {
                status: SettlementStatus::Success,
                message: "credited".to_string(),
                reference_rate: None,
            })),
            settlements: Mutex::new(Vec::new()),
            withdrawal_accept: Mutex::new(Ok(WithdrawalAccepted {
                success: true,
                message: None,
            })),
            probes: Mutex::new(VecDeque::new()),
            balance: Mutex::new(Decimal::from(1_000)),
        }
    }

    pub fn script_activation(&self, result: Result<ActivationState, LedgerError>) {
        *self.activation.lock().unwrap() = result;
    }

    pub fn script_settlement(&self, result: Result<SettlementReply, LedgerError>) {
        *self.settlement_reply.lock().unwrap() = result;
    }

    pub fn script_withdrawal_accept(&self, result: Result<WithdrawalAccepted, LedgerError>) {
        *self.withdrawal_accept.lock().unwrap() = result;
    }

    pub fn script_probes(&self, probes: Vec<Result<WithdrawalProbe, LedgerError>>) {
        *self.probes.lock().unwrap() = probes.into();
    }

    pub fn set_balance(&self, balance: Decimal) {
        *self.balance.lock().unwrap() = balance;
    }

    pub fn settlement_calls(&self) -> Vec<RecordedSettlement> {
        self.settlements.lock().unwrap().clone()
    }

    /// Number of activation probes observed so far.
    pub fn activation_call_count(&self) -> usize {
        self.activation_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerApi for MockLedger {
    async fn check_activation(
        &self,
        _account: &AccountRef,
    ) -> Result<ActivationState, LedgerError> {
        self.activation_calls.fetch_add(1, Ordering::SeqCst);
        self.activation.lock().unwrap().clone()
    }

    async fn report_settlement(
        &self,
        account: &AccountRef,
        fiat_amount: Decimal,
        chain_reference: &str,
    ) -> Result<SettlementReply, LedgerError> {
        self.settlements.lock().unwrap().push(RecordedSettlement {
            account: account.clone(),
            fiat_amount,
            chain_reference: chain_reference.to_string(),
        });
        self.settlement_reply.lock().unwrap().clone()
    }

    async fn initiate_withdrawal(
        &self,
        _account: &AccountRef,
        _native_amount: Decimal,
        _fiat_amount: Decimal,
    ) -> Result<WithdrawalAccepted, LedgerError> {
        self.withdrawal_accept.lock().unwrap().clone()
    }

    async fn withdrawal_status(&self) -> Result<WithdrawalProbe, LedgerError> {
        let mut probes = self.probes.lock().unwrap();
        match probes.len() {
            0 => Ok(WithdrawalProbe {
                success: false,
                seqno_increased: false,
                transaction_hash: None,
            }),
            1 => probes.front().cloned().unwrap(),
            _ => probes.pop_front().unwrap(),
        }
    }

    async fn fiat_balance(&self, _account: &AccountRef) -> Result<Decimal, LedgerError> {
        Ok(*self.balance.lock().unwrap())
    }
}
