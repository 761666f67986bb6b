//! Wallet connector adapter
//!
//! The wallet itself (key management, signing UI) is an external
//! capability; this module only defines the contract the core consumes,
//! plus the HTTP chain-state helper real connectors build on and a mock
//! for tests and offline runs.
//!
//! `submit` is interactive: it can block for however long the user stares
//! at the signing prompt. The orchestrator races it against the
//! operation's cancellation signal rather than trusting it to return.

pub mod chain_http;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use crate::core_types::{AccountRef, SeqNum, SubmissionReceipt, TransferRequest};

pub use chain_http::HttpChainQuery;
pub use mock::MockConnector;

#[derive(Debug, Error, Clone)]
pub enum ConnectorError {
    #[error("User rejected the transaction")]
    UserRejected,
    #[error("Connector error: {0}")]
    Connector(String),
}

/// Point-in-time view of a wallet account on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub sequence_number: SeqNum,
    pub last_tx_hash: String,
}

/// Contract consumed from the external wallet connector.
#[async_trait]
pub trait WalletConnector: Send + Sync {
    /// Wallet account currently connected, if any.
    fn current_account(&self) -> Option<AccountRef>;

    /// Subscription to account changes. Consumers watch this receiver
    /// instead of polling `current_account`.
    fn accounts(&self) -> watch::Receiver<Option<AccountRef>>;

    /// Chain state for an account. Used only by the deposit confirmation
    /// path (sequence snapshot and subsequent polls).
    async fn account_state(&self, account: &AccountRef) -> Result<AccountState, ConnectorError>;

    /// Hand a transfer to the wallet for interactive signing and
    /// submission. Blocks until the user acts or the wallet fails.
    async fn submit(&self, request: TransferRequest)
    -> Result<SubmissionReceipt, ConnectorError>;
}
