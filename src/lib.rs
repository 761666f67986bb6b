//! fundbridge - Wallet <-> custodial-ledger funding orchestrator
//!
//! Moves value between a user's wallet and a custodial ledger: deposits
//! (wallet -> platform) confirmed by watching the account's sequence
//! counter, withdrawals (platform -> wallet) confirmed through the
//! backend's transaction probe, both reconciled with the ledger exactly
//! once.
//!
//! # Modules
//!
//! - [`core_types`] - Shared types (AccountRef, TransferRequest, ...)
//! - [`money`] - Fiat <-> native minor-unit conversion
//! - [`validate`] - Minimum-amount policy
//! - [`rate`] - Submission-time exchange rates
//! - [`wire`] - Positional label-prefixed backend record decoding
//! - [`connector`] - Wallet connector contract + chain-state query
//! - [`ledger`] - Backend ledger client
//! - [`confirm`] - Bounded, cancellable confirmation polling
//! - [`settlement`] - Exactly-once settlement reporting
//! - [`orchestrator`] - The per-operation state machine

pub mod config;
pub mod core_types;
pub mod logging;
pub mod money;
pub mod rate;
pub mod validate;
pub mod wire;

pub mod confirm;
pub mod connector;
pub mod ledger;
pub mod orchestrator;
pub mod settlement;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use core_types::{
    AccountRef, ActivationState, ConfirmationResult, MinorUnits, OperationKind, SeqNum,
    SubmissionReceipt, TransferRequest,
};
pub use orchestrator::{
    Failure, FailureClass, Notice, OperationError, OperationHandle, OperationStatus,
    Orchestrator,
};
pub use validate::MinimumPolicy;
