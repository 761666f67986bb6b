//! Operation state definitions
//!
//! One `OperationStatus` exists per in-flight user operation. Terminal
//! states: `Succeeded`, `Failed`. The enum shape carries the payload
//! invariants: `Succeeded` always holds a non-empty chain reference and
//! `Failed` holds a classified failure and never a chain reference.

use std::fmt;

use super::error::Failure;

/// Lifecycle of a single user-initiated operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationStatus {
    /// No operation running. The only state a new operation may start from.
    Idle,
    /// Amount and activation policy being checked.
    Validating,
    /// Transfer handed to the wallet; waiting on the user to sign.
    AwaitingSignature,
    /// Transfer accepted for processing.
    Submitted,
    /// Poll loop watching for on-chain (or relayed) completion.
    Confirming,
    /// Confirmed transfer being reconciled with the backend ledger.
    Settling,
    /// Terminal: transfer confirmed and reconciled.
    Succeeded { chain_reference: String },
    /// Terminal: operation ended with a classified, displayable failure.
    Failed { failure: Failure },
}

impl OperationStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Succeeded { .. } | OperationStatus::Failed { .. }
        )
    }

    /// States in which a confirmation/settlement race with a second
    /// operation would be possible; at most one operation per
    /// (account, kind) may be here.
    #[inline]
    pub fn is_reconciling(&self) -> bool {
        matches!(
            self,
            OperationStatus::Confirming | OperationStatus::Settling
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Idle => "IDLE",
            OperationStatus::Validating => "VALIDATING",
            OperationStatus::AwaitingSignature => "AWAITING_SIGNATURE",
            OperationStatus::Submitted => "SUBMITTED",
            OperationStatus::Confirming => "CONFIRMING",
            OperationStatus::Settling => "SETTLING",
            OperationStatus::Succeeded { .. } => "SUCCEEDED",
            OperationStatus::Failed { .. } => "FAILED",
        }
    }

    /// Forward progress index; transitions never move backward.
    fn rank(&self) -> u8 {
        match self {
            OperationStatus::Idle => 0,
            OperationStatus::Validating => 1,
            OperationStatus::AwaitingSignature => 2,
            OperationStatus::Submitted => 3,
            OperationStatus::Confirming => 4,
            OperationStatus::Settling => 5,
            OperationStatus::Succeeded { .. } | OperationStatus::Failed { .. } => 6,
        }
    }

    /// Whether `next` is a legal successor. Forward-only; failure is
    /// reachable from every non-terminal state; some states are skipped
    /// on the withdraw path.
    pub fn can_transition_to(&self, next: &OperationStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if matches!(next, OperationStatus::Failed { .. }) {
            return true;
        }
        next.rank() > self.rank()
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::error::{FailureClass, Notice};

    fn failed() -> OperationStatus {
        OperationStatus::Failed {
            failure: Failure {
                class: FailureClass::Unknown,
                notice: Notice {
                    title: "t".to_string(),
                    detail: "d".to_string(),
                    footer: String::new(),
                },
            },
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(
            OperationStatus::Succeeded {
                chain_reference: "h".to_string()
            }
            .is_terminal()
        );
        assert!(failed().is_terminal());

        for state in [
            OperationStatus::Idle,
            OperationStatus::Validating,
            OperationStatus::AwaitingSignature,
            OperationStatus::Submitted,
            OperationStatus::Confirming,
            OperationStatus::Settling,
        ] {
            assert!(!state.is_terminal(), "{state} should not be terminal");
        }
    }

    #[test]
    fn test_reconciling_states() {
        assert!(OperationStatus::Confirming.is_reconciling());
        assert!(OperationStatus::Settling.is_reconciling());
        assert!(!OperationStatus::Submitted.is_reconciling());
        assert!(!failed().is_reconciling());
    }

    #[test]
    fn test_forward_only_transitions() {
        let confirming = OperationStatus::Confirming;
        assert!(confirming.can_transition_to(&OperationStatus::Settling));
        assert!(!confirming.can_transition_to(&OperationStatus::Submitted));
        assert!(!confirming.can_transition_to(&OperationStatus::Validating));
    }

    #[test]
    fn test_failure_reachable_from_any_live_state() {
        for state in [
            OperationStatus::Idle,
            OperationStatus::Validating,
            OperationStatus::AwaitingSignature,
            OperationStatus::Confirming,
            OperationStatus::Settling,
        ] {
            assert!(state.can_transition_to(&failed()));
        }
    }

    #[test]
    fn test_no_transition_out_of_terminal() {
        let done = OperationStatus::Succeeded {
            chain_reference: "h".to_string(),
        };
        assert!(!done.can_transition_to(&OperationStatus::Confirming));
        assert!(!done.can_transition_to(&failed()));
        assert!(!failed().can_transition_to(&OperationStatus::Settling));
    }

    #[test]
    fn test_skipping_states_is_legal() {
        // The withdraw path goes Validating -> Submitted directly.
        assert!(OperationStatus::Validating.can_transition_to(&OperationStatus::Submitted));
        // And Confirming -> Succeeded without Settling.
        assert!(OperationStatus::Confirming.can_transition_to(&OperationStatus::Succeeded {
            chain_reference: "h".to_string()
        }));
    }

    #[test]
    fn test_display() {
        assert_eq!(OperationStatus::Confirming.to_string(), "CONFIRMING");
        assert_eq!(
            OperationStatus::Succeeded {
                chain_reference: "h".to_string()
            }
            .to_string(),
            "SUCCEEDED"
        );
    }
}
