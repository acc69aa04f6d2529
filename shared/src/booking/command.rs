//! Booking commands - requests from guests and hosts

use serde::{Deserialize, Serialize};

/// Role of the acting user, as reported by the identity collaborator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    Guest,
    Host,
    Admin,
}

/// The authenticated caller of a command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn guest(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: ActorRole::Guest,
        }
    }

    /// Hosts and admins may act on bookings they do not own
    pub fn is_staff(&self) -> bool {
        matches!(self.role, ActorRole::Host | ActorRole::Admin)
    }
}

/// Command envelope with idempotency key and actor metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCommand {
    /// Idempotency key: replaying the same command_id is a no-op
    pub command_id: String,
    pub actor: Actor,
    /// Client timestamp (Unix millis), preserved for audit
    pub timestamp: i64,
    pub payload: BookingCommandPayload,
}

impl BookingCommand {
    pub fn new(actor: Actor, payload: BookingCommandPayload) -> Self {
        Self {
            command_id: uuid::Uuid::new_v4().to_string(),
            actor,
            timestamp: crate::util::now_millis(),
            payload,
        }
    }
}

/// Command payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingCommandPayload {
    /// Change the party size of a CONFIRMED booking
    ModifyPartySize {
        booking_id: String,
        new_guest_count: i32,
    },

    /// Move a CONFIRMED booking to a different instance
    ChangeBookingDate {
        booking_id: String,
        new_instance_id: String,
    },

    /// Cancel a CONFIRMED booking with a policy-tiered refund
    CancelBooking {
        booking_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Host checks a guest in against their QR token
    CheckInBooking {
        booking_id: String,
        check_in_token: String,
    },

    /// Host marks a no-show after the instance has started
    MarkNoShow { booking_id: String },

    /// Join the waitlist for a full instance
    JoinWaitlist {
        offering_id: String,
        instance_id: String,
        party_size: i32,
    },

    /// Cancel one's own waitlist entry
    LeaveWaitlist { entry_id: String },

    /// Claim a notified waitlist spot, converting it to a booking
    ClaimWaitlistSpot { entry_id: String },
}
