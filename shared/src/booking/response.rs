//! Command responses - discriminated success/failure results
//!
//! No operation throws past its boundary; every outcome is a
//! `CommandResponse` with a machine-readable error on failure.

use crate::error::{CommandError, CommandErrorCode};
use serde::{Deserialize, Serialize};

/// Result of executing a booking command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    pub command_id: String,
    /// The command_id was already processed; no state changed this time
    #[serde(default)]
    pub duplicate: bool,
    /// Booking created or affected by the command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    /// Charge (positive) or refund (negative) owed for the change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_difference: Option<f64>,
    /// Refund computed for a cancellation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<f64>,
    /// 1-based FIFO position after joining a waitlist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waitlist_position: Option<u32>,
    /// The state change committed but its payment side effect did not;
    /// the caller must retry payment or contact support
    #[serde(default)]
    pub payment_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn ok(command_id: impl Into<String>) -> Self {
        Self {
            success: true,
            command_id: command_id.into(),
            duplicate: false,
            booking_id: None,
            price_difference: None,
            refund_amount: None,
            waitlist_position: None,
            payment_pending: false,
            error: None,
        }
    }

    pub fn error(command_id: impl Into<String>, error: CommandError) -> Self {
        Self {
            success: false,
            command_id: command_id.into(),
            duplicate: false,
            booking_id: None,
            price_difference: None,
            refund_amount: None,
            waitlist_position: None,
            payment_pending: false,
            error: Some(error),
        }
    }

    /// Response for a replayed command_id
    pub fn duplicate(command_id: impl Into<String>) -> Self {
        Self {
            success: true,
            command_id: command_id.into(),
            duplicate: true,
            booking_id: None,
            price_difference: None,
            refund_amount: None,
            waitlist_position: None,
            payment_pending: false,
            error: Some(CommandError::new(
                CommandErrorCode::DuplicateCommand,
                "Command already processed",
            )),
        }
    }

    pub fn with_booking_id(mut self, booking_id: impl Into<String>) -> Self {
        self.booking_id = Some(booking_id.into());
        self
    }

    pub fn with_price_difference(mut self, diff: f64) -> Self {
        self.price_difference = Some(diff);
        self
    }

    pub fn with_refund_amount(mut self, amount: f64) -> Self {
        self.refund_amount = Some(amount);
        self
    }

    pub fn with_waitlist_position(mut self, position: u32) -> Self {
        self.waitlist_position = Some(position);
        self
    }
}
