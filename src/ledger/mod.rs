//! Custodial ledger client
//!
//! The backend ledger is an external collaborator; this module defines the
//! API surface the core consumes, an HTTP implementation, and a scriptable
//! mock. All record-style replies go through [`crate::wire`].

pub mod http;
pub mod mock;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::core_types::{AccountRef, ActivationState};

pub use http::HttpLedgerClient;
pub use mock::MockLedger;

#[derive(Debug, Error, Clone)]
pub enum LedgerError {
    #[error("Backend unreachable: {0}")]
    Unreachable(String),
    #[error("Malformed backend reply: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        LedgerError::Unreachable(e.to_string())
    }
}

impl From<crate::wire::WireError> for LedgerError {
    fn from(e: crate::wire::WireError) -> Self {
        LedgerError::Malformed(e.to_string())
    }
}

/// Parsed settlement reply.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementReply {
    pub status: SettlementStatus,
    pub message: String,
    /// Rate the backend credited at, when it echoes one back.
    pub reference_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementStatus {
    Success,
    Failed,
}

/// Backend answer to a withdrawal initiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalAccepted {
    pub success: bool,
    pub message: Option<String>,
}

/// One reading of the withdrawal confirmation probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalProbe {
    pub success: bool,
    pub seqno_increased: bool,
    pub transaction_hash: Option<String>,
}

/// Contract consumed from the backend ledger.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Activation probe. `"200"` status means the account is activated.
    async fn check_activation(&self, account: &AccountRef)
    -> Result<ActivationState, LedgerError>;

    /// Post proof of a confirmed deposit. The backend dedupes by chain
    /// reference; the core still calls this at most once per transfer.
    async fn report_settlement(
        &self,
        account: &AccountRef,
        fiat_amount: Decimal,
        chain_reference: &str,
    ) -> Result<SettlementReply, LedgerError>;

    /// Ask the backend to start paying out a withdrawal.
    async fn initiate_withdrawal(
        &self,
        account: &AccountRef,
        native_amount: Decimal,
        fiat_amount: Decimal,
    ) -> Result<WithdrawalAccepted, LedgerError>;

    /// Poll the backend-mediated withdrawal confirmation probe.
    async fn withdrawal_status(&self) -> Result<WithdrawalProbe, LedgerError>;

    /// Fiat balance available for withdrawal.
    async fn fiat_balance(&self, account: &AccountRef) -> Result<Decimal, LedgerError>;
}
