//! Amount validation
//!
//! Minimum-amount policy keyed by account activation state. The floors are
//! a pluggable table so future tiers slot in without touching callers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core_types::ActivationState;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidateError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Minimum-amount floors, in fiat units, keyed by activation state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MinimumPolicy {
    pub activated: Decimal,
    pub not_activated: Decimal,
}

impl Default for MinimumPolicy {
    fn default() -> Self {
        Self {
            activated: Decimal::from(10),
            not_activated: Decimal::from(30),
        }
    }
}

impl MinimumPolicy {
    pub fn floor(&self, activation: ActivationState) -> Decimal {
        match activation {
            ActivationState::Activated => self.activated,
            ActivationState::NotActivated => self.not_activated,
        }
    }
}

/// Parse and validate a raw fiat amount against the policy floor.
///
/// Pure function; no side effects. Fails when the value is absent,
/// non-numeric, or below the floor for the given activation state.
pub fn validate_amount(
    raw: &str,
    activation: ActivationState,
    policy: &MinimumPolicy,
) -> Result<Decimal, ValidateError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidateError::InvalidAmount("no amount entered".to_string()));
    }

    let amount: Decimal = trimmed
        .parse()
        .map_err(|_| ValidateError::InvalidAmount(format!("not a number: {trimmed:?}")))?;

    let floor = policy.floor(activation);
    if amount < floor {
        return Err(ValidateError::InvalidAmount(format!(
            "minimum amount is {floor}"
        )));
    }

    Ok(amount)
}
