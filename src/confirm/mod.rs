//! Transfer confirmation polling
//!
//! Two confirmation strategies exist behind one trait, selected by
//! operation kind:
//!
//! - [`SequenceConfirmation`] (deposit): the client reads chain state
//!   directly and watches the account's sequence counter advance past a
//!   pre-submission snapshot.
//! - [`ProbeConfirmation`] (withdraw): payout status is mediated by the
//!   backend, so the client polls its check-transaction probe.
//!
//! Both run under [`await_confirmation`]: fixed interval, hard attempt
//! cap, cancellation checked at every tick. The loop tears down on
//! success, failure, timeout, and cancellation; a poll must never outlive
//! the operation that owns it.
//!
//! A timeout means the outcome is UNKNOWN: the transfer may still land
//! after the cap. Callers must not resubmit automatically.

pub mod probe;
pub mod seqno;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::debug;

use crate::core_types::ConfirmationResult;

pub use probe::ProbeConfirmation;
pub use seqno::SequenceConfirmation;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfirmError {
    /// Attempt cap exhausted without a verdict. Outcome unknown, not a
    /// definite failure.
    #[error("Confirmation timeout after {attempts} attempts")]
    Timeout { attempts: u32 },
    #[error("Confirmation check failed: {0}")]
    CheckFailed(String),
    #[error("Confirmation cancelled")]
    Cancelled,
}

/// Poll cadence and cap for one confirmation loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl PollConfig {
    /// Deposit path: 3 s ticks, 20 attempts (60 s ceiling).
    pub fn sequence_default() -> Self {
        Self {
            interval_ms: 3_000,
            max_attempts: 20,
        }
    }

    /// Withdraw path: 5 s ticks, 12 attempts. Same 60 s ceiling as the
    /// deposit path; the cap itself is an operator policy knob.
    pub fn probe_default() -> Self {
        Self {
            interval_ms: 5_000,
            max_attempts: 12,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// One way of deciding whether a submitted transfer has landed.
#[async_trait]
pub trait ConfirmationStrategy: Send + Sync {
    /// Run a single probe. `Ok(None)` means "not yet".
    async fn check(&self) -> Result<Option<ConfirmationResult>, ConfirmError>;
}

/// Drive a strategy to a verdict.
///
/// Checks immediately, then once per interval, up to `max_attempts`
/// checks. The cancel receiver is consulted before every check and while
/// sleeping; a dropped sender counts as cancellation (the owning
/// operation is gone).
pub async fn await_confirmation(
    strategy: &dyn ConfirmationStrategy,
    config: &PollConfig,
    cancel: &mut watch::Receiver<bool>,
) -> Result<ConfirmationResult, ConfirmError> {
    for attempt in 1..=config.max_attempts {
        if *cancel.borrow() {
            return Err(ConfirmError::Cancelled);
        }

        if let Some(result) = strategy.check().await? {
            debug!(attempt, "Transfer confirmed");
            return Ok(result);
        }

        if attempt < config.max_attempts {
            tokio::select! {
                _ = tokio::time::sleep(config.interval()) => {}
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        return Err(ConfirmError::Cancelled);
                    }
                }
            }
        }
    }

    Err(ConfirmError::Timeout {
        attempts: config.max_attempts,
    })
}
