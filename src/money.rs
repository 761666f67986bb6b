//! Fiat <-> native-asset conversion
//!
//! All money math runs on `rust_decimal::Decimal`; raw integers only appear
//! at the wire boundary as minor units. Rounding is half-up to the nearest
//! minor unit. Remainders below one minor unit are absorbed (lost) during
//! fiat -> minor conversion; that precision loss is accepted and bounded by
//! one minor unit per conversion.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::core_types::MinorUnits;
use crate::rate::ExchangeRate;

/// Minor units per whole native unit. Fixed constant of the chain.
pub const UNIT_SCALE: u64 = 1_000_000_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("Exchange rate is zero or negative")]
    DegenerateRate,
    #[error("Amount out of representable range")]
    OutOfRange,
}

/// Convert a fiat amount into native minor units at the given rate.
///
/// `minor = round_half_up(fiat / fiat_per_native * UNIT_SCALE)`
pub fn fiat_to_minor_units(
    fiat: Decimal,
    rate: &ExchangeRate,
) -> Result<MinorUnits, ConvertError> {
    if rate.fiat_per_native <= Decimal::ZERO {
        return Err(ConvertError::DegenerateRate);
    }

    let native = fiat
        .checked_div(rate.fiat_per_native)
        .ok_or(ConvertError::OutOfRange)?;
    native_to_minor_units(native)
}

/// Convert a whole-native-unit amount into minor units, rounding half-up.
pub fn native_to_minor_units(native: Decimal) -> Result<MinorUnits, ConvertError> {
    let scaled = native
        .checked_mul(Decimal::from(UNIT_SCALE))
        .ok_or(ConvertError::OutOfRange)?;

    scaled
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or(ConvertError::OutOfRange)
}

/// Convert minor units back into whole native units.
pub fn minor_units_to_native(minor: MinorUnits) -> Decimal {
    Decimal::from(minor) / Decimal::from(UNIT_SCALE)
}
