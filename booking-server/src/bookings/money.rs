//! Money calculation utilities using rust_decimal for precision
//!
//! All monetary math runs on `Decimal` and is converted back to `f64`
//! for storage/serialization, rounded to 2 decimal places.

use crate::bookings::traits::BookingError;
use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed per-person price (€1,000,000)
const MAX_PRICE: f64 = 1_000_000.0;

/// Maximum allowed party size per booking
pub const MAX_PARTY_SIZE: i32 = 1000;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Validate a party size from command input
pub fn validate_party_size(value: i32) -> Result<(), BookingError> {
    if value < 1 {
        return Err(BookingError::Validation(format!(
            "party size must be at least 1, got {}",
            value
        )));
    }
    if value > MAX_PARTY_SIZE {
        return Err(BookingError::Validation(format!(
            "party size exceeds maximum allowed ({}), got {}",
            MAX_PARTY_SIZE, value
        )));
    }
    Ok(())
}

/// Validate a monetary amount loaded from a record or computed from input
pub fn validate_amount(value: f64, field_name: &str) -> Result<(), BookingError> {
    if !value.is_finite() {
        return Err(BookingError::Validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    if value < 0.0 {
        return Err(BookingError::Validation(format!(
            "{} must be non-negative, got {}",
            field_name, value
        )));
    }
    if value > MAX_PRICE {
        return Err(BookingError::Validation(format!(
            "{} exceeds maximum allowed ({}), got {}",
            field_name, MAX_PRICE, value
        )));
    }
    Ok(())
}
