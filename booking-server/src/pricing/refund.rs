//! Refund policy calculator
//!
//! Pure and deterministic: refund amount from policy, time to event, and
//! paid amount. No I/O, no mutation, so it is testable without a payment
//! gateway.
//!
//! Published tiers (thresholds inclusive):
//!
//! | Policy   | Full refund  | Half refund | No refund |
//! |----------|--------------|-------------|-----------|
//! | FLEXIBLE | >= 24h       | n/a         | < 24h     |
//! | MODERATE | >= 7d (168h) | 24h..7d     | < 24h     |
//! | STRICT   | >= 14d (336h)| n/a         | < 14d     |

use crate::bookings::money::{to_decimal, to_f64};
use rust_decimal::Decimal;
use shared::CancellationPolicy;

/// Refund tier thresholds, in hours before the event
///
/// Values follow the product's published rules; kept in one place so a
/// policy revision is a config change, not a code hunt.
#[derive(Debug, Clone)]
pub struct RefundSchedule {
    /// FLEXIBLE: full refund at or beyond this many hours
    pub flexible_full_hours: i64,
    /// MODERATE: full refund at or beyond this many hours
    pub moderate_full_hours: i64,
    /// MODERATE: half refund at or beyond this many hours
    pub moderate_half_hours: i64,
    /// STRICT: full refund at or beyond this many hours
    pub strict_full_hours: i64,
}

impl Default for RefundSchedule {
    fn default() -> Self {
        Self {
            flexible_full_hours: 24,
            moderate_full_hours: 168,
            moderate_half_hours: 24,
            strict_full_hours: 336,
        }
    }
}

/// Compute the refund for cancelling `hours_until_event` hours out.
///
/// The result is clamped to `[0, total_amount]` and rounded to 2 decimal
/// places.
pub fn calculate_refund(
    total_amount: f64,
    hours_until_event: i64,
    policy: CancellationPolicy,
    schedule: &RefundSchedule,
) -> f64 {
    let total = to_decimal(total_amount).max(Decimal::ZERO);

    let percent = match policy {
        CancellationPolicy::Flexible => {
            if hours_until_event >= schedule.flexible_full_hours {
                Decimal::ONE_HUNDRED
            } else {
                Decimal::ZERO
            }
        }
        CancellationPolicy::Moderate => {
            if hours_until_event >= schedule.moderate_full_hours {
                Decimal::ONE_HUNDRED
            } else if hours_until_event >= schedule.moderate_half_hours {
                Decimal::from(50)
            } else {
                Decimal::ZERO
            }
        }
        CancellationPolicy::Strict => {
            if hours_until_event >= schedule.strict_full_hours {
                Decimal::ONE_HUNDRED
            } else {
                Decimal::ZERO
            }
        }
    };

    let refund = (total * percent / Decimal::ONE_HUNDRED).clamp(Decimal::ZERO, total);
    to_f64(refund)
}
