//! Operation error taxonomy
//!
//! Every collaborator failure is mapped into `OperationError` at the
//! orchestrator boundary; raw transport errors never reach callers. Each
//! error classifies into a small user-facing `FailureClass` and renders
//! into a dismissible `Notice` (title/detail/footer). All of these are
//! recoverable at the UI boundary; none are fatal to the process.

use thiserror::Error;

use crate::confirm::ConfirmError;
use crate::connector::ConnectorError;
use crate::money::ConvertError;
use crate::rate::RateError;
use crate::settlement::SettlementError;
use crate::validate::ValidateError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OperationError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Rate unavailable: {0}")]
    RateUnavailable(String),

    #[error("User rejected the transaction")]
    UserRejected,

    #[error("Connector error: {0}")]
    ConnectorError(String),

    #[error("Confirmation timeout after {attempts} attempts")]
    ConfirmationTimeout { attempts: u32 },

    #[error("Confirmation check failed: {0}")]
    ConfirmationCheckFailed(String),

    #[error("Settlement unreachable: {0}")]
    SettlementUnreachable(String),

    #[error("Settlement rejected: {0}")]
    SettlementRejected(String),

    #[error("Another operation is already in progress")]
    OperationInProgress,
}

/// User-facing failure buckets for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    Rejection,
    InsufficientFunds,
    Timeout,
    Network,
    Unknown,
}

/// Dismissible-notification payload the UI renders for a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub detail: String,
    pub footer: String,
}

impl Notice {
    fn new(title: &str, detail: impl Into<String>, footer: &str) -> Self {
        Self {
            title: title.to_string(),
            detail: detail.into(),
            footer: footer.to_string(),
        }
    }
}

/// A classified, displayable failure. This is what a `Failed` operation
/// carries; there is deliberately no slot for a chain reference here.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub class: FailureClass,
    pub notice: Notice,
}

impl OperationError {
    pub fn class(&self) -> FailureClass {
        match self {
            OperationError::InvalidAmount(_)
            | OperationError::UserRejected
            | OperationError::WalletNotConnected
            | OperationError::OperationInProgress => FailureClass::Rejection,

            OperationError::ConfirmationTimeout { .. } => FailureClass::Timeout,

            OperationError::RateUnavailable(_)
            | OperationError::ConnectorError(_)
            | OperationError::ConfirmationCheckFailed(_)
            | OperationError::SettlementUnreachable(_) => FailureClass::Network,

            OperationError::SettlementRejected(message) => {
                if message.to_lowercase().contains("insufficient") {
                    FailureClass::InsufficientFunds
                } else {
                    FailureClass::Unknown
                }
            }
        }
    }

    pub fn notice(&self) -> Notice {
        match self {
            OperationError::InvalidAmount(detail) => {
                Notice::new("Invalid Amount", detail.clone(), "")
            }
            OperationError::WalletNotConnected => Notice::new(
                "Wallet Not Connected",
                "Please connect your wallet first",
                "",
            ),
            OperationError::RateUnavailable(_) => Notice::new(
                "Price Unavailable",
                "Unable to fetch the current exchange rate",
                "Please try again later",
            ),
            OperationError::UserRejected => Notice::new(
                "Transaction Rejected",
                "You cancelled the transaction",
                "No funds were deducted",
            ),
            OperationError::ConnectorError(detail) => {
                Notice::new("Wallet Error", detail.clone(), "")
            }
            // Deliberately worded as unknown-outcome: the transfer may
            // still land after the cap, so this must read differently
            // from a definite failure.
            OperationError::ConfirmationTimeout { .. } => Notice::new(
                "Transfer Status Unknown",
                "Unable to confirm transfer completion in time",
                "Check your wallet for the transfer status before retrying",
            ),
            OperationError::ConfirmationCheckFailed(_) => Notice::new(
                "Confirmation Check Failed",
                "Error checking transfer status",
                "Please try again later",
            ),
            OperationError::SettlementUnreachable(_) => Notice::new(
                "Ledger Unreachable",
                "The transfer confirmed but could not be reported",
                "Support can credit it from the transaction hash",
            ),
            OperationError::SettlementRejected(message) => {
                Notice::new("Transfer Not Credited", message.clone(), "")
            }
            OperationError::OperationInProgress => Notice::new(
                "Operation In Progress",
                "Wait for the current operation to finish",
                "",
            ),
        }
    }

    pub fn failure(&self) -> Failure {
        Failure {
            class: self.class(),
            notice: self.notice(),
        }
    }
}

impl From<ValidateError> for OperationError {
    fn from(e: ValidateError) -> Self {
        match e {
            ValidateError::InvalidAmount(detail) => OperationError::InvalidAmount(detail),
        }
    }
}

impl From<RateError> for OperationError {
    fn from(e: RateError) -> Self {
        match e {
            RateError::Unavailable(detail) => OperationError::RateUnavailable(detail),
        }
    }
}

impl From<ConvertError> for OperationError {
    fn from(e: ConvertError) -> Self {
        match e {
            ConvertError::DegenerateRate => {
                OperationError::RateUnavailable("degenerate exchange rate".to_string())
            }
            ConvertError::OutOfRange => {
                OperationError::InvalidAmount("amount out of range".to_string())
            }
        }
    }
}

impl From<ConnectorError> for OperationError {
    fn from(e: ConnectorError) -> Self {
        match e {
            ConnectorError::UserRejected => OperationError::UserRejected,
            ConnectorError::Connector(detail) => OperationError::ConnectorError(detail),
        }
    }
}

impl From<ConfirmError> for OperationError {
    fn from(e: ConfirmError) -> Self {
        match e {
            ConfirmError::Timeout { attempts } => {
                OperationError::ConfirmationTimeout { attempts }
            }
            ConfirmError::CheckFailed(detail) => {
                OperationError::ConfirmationCheckFailed(detail)
            }
            // Cancellation is handled before errors are mapped; if it
            // leaks through, surface it as a check failure rather than
            // panicking.
            ConfirmError::Cancelled => {
                OperationError::ConfirmationCheckFailed("operation cancelled".to_string())
            }
        }
    }
}

impl From<SettlementError> for OperationError {
    fn from(e: SettlementError) -> Self {
        match e {
            SettlementError::Unreachable(detail) => {
                OperationError::SettlementUnreachable(detail)
            }
            SettlementError::Rejected(message) => OperationError::SettlementRejected(message),
            SettlementError::AlreadyReported(reference) => OperationError::SettlementRejected(
                format!("transfer {reference} was already reported"),
            ),
        }
    }
}
