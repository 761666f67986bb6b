//! Core types used throughout the system
//!
//! Small shared types with no behavior of their own. Everything here is
//! cheap to clone and safe to log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequence number of the outgoing-transfer counter on a wallet account.
///
/// Advances exactly once per outgoing transfer; used as the deposit
/// confirmation signal.
pub type SeqNum = u64;

/// Smallest indivisible denomination of the native asset.
pub type MinorUnits = u64;

/// Opaque wallet address, as handed out by the wallet connector.
///
/// Immutable once a wallet session exists. The core never inspects the
/// format; it only forwards it to collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountRef(pub String);

impl AccountRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountRef {
    fn from(s: &str) -> Self {
        AccountRef(s.to_string())
    }
}

/// Which direction value is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Deposit,
    Withdraw,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Deposit => write!(f, "deposit"),
            OperationKind::Withdraw => write!(f, "withdraw"),
        }
    }
}

/// Backend-tracked account status gating the minimum-amount policy.
///
/// Derived once per wallet session from the activation probe and cached;
/// never re-derived per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationState {
    Activated,
    NotActivated,
}

impl ActivationState {
    pub fn is_activated(&self) -> bool {
        matches!(self, ActivationState::Activated)
    }
}

/// A transfer the user is asked to sign. Built once, immutable, submitted
/// exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub destination: AccountRef,
    pub amount_minor_units: MinorUnits,
    pub valid_until: DateTime<Utc>,
}

/// Opaque signed payload proving the user authorized a transfer.
///
/// Owned by the orchestrator until the operation settles.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub signed_payload: String,
}

/// Outcome of a confirmation poll.
///
/// `chain_reference` is the unique identifier of the settled transfer and
/// is what keeps backend crediting idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationResult {
    pub confirmed: bool,
    pub chain_reference: Option<String>,
}

impl ConfirmationResult {
    pub fn confirmed(chain_reference: impl Into<String>) -> Self {
        Self {
            confirmed: true,
            chain_reference: Some(chain_reference.into()),
        }
    }
}
