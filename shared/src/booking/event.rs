//! Booking events - immutable facts recorded after command processing
//!
//! The persisted audit trail (`BookingModification`) is derived from these
//! events; the events themselves are also broadcast after commit so side
//! effects (payment, notification, waitlist promotion) stay decoupled from
//! the transaction.

use super::command::Actor;
use serde::{Deserialize, Serialize};

/// Booking event - immutable fact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number (for ordering and replay)
    pub sequence: u64,
    /// Server timestamp (Unix milliseconds), authoritative
    pub timestamp: i64,
    /// Client timestamp from the originating command (audit only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<i64>,
    /// Who triggered this event
    pub actor_id: String,
    /// Actor name (snapshot for audit)
    pub actor_name: String,
    /// Command that triggered this event
    pub command_id: String,
    pub event_type: BookingEventType,
    pub payload: EventPayload,
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEventType {
    // Booking lifecycle
    PartySizeChanged,
    DateChanged,
    BookingCancelled,
    BookingCheckedIn,
    BookingNoShow,

    // Waitlist
    WaitlistJoined,
    WaitlistLeft,
    WaitlistNotified,
    WaitlistClaimed,
    WaitlistExpired,
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    // ========== Booking modifications ==========
    PartySizeChanged {
        booking_id: String,
        instance_id: String,
        old_guest_count: i32,
        new_guest_count: i32,
        /// Positive when the guest owes more, negative when owed a refund
        price_difference: f64,
        new_base_amount: f64,
        new_total_amount: f64,
    },

    DateChanged {
        booking_id: String,
        old_instance_id: String,
        new_instance_id: String,
        guest_count: i32,
        price_difference: f64,
        new_base_amount: f64,
        new_total_amount: f64,
        /// Regenerated QR check-in token
        check_in_token: String,
    },

    BookingCancelled {
        booking_id: String,
        instance_id: String,
        guest_count: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        refund_amount: f64,
    },

    BookingCheckedIn {
        booking_id: String,
        instance_id: String,
    },

    BookingNoShow {
        booking_id: String,
        instance_id: String,
        guest_count: i32,
    },

    // ========== Waitlist ==========
    WaitlistJoined {
        entry_id: String,
        offering_id: String,
        instance_id: String,
        party_size: i32,
        /// 1-based position in the FIFO queue at join time
        position: u32,
    },

    WaitlistLeft {
        entry_id: String,
        instance_id: String,
        /// The entry held the outstanding claim window when it left
        was_notified: bool,
    },

    WaitlistNotified {
        entry_id: String,
        instance_id: String,
        notified_at: i64,
        /// Claim window deadline (Unix millis)
        claim_deadline: i64,
    },

    WaitlistClaimed {
        entry_id: String,
        instance_id: String,
        /// The CONFIRMED booking minted from the claim
        booking_id: String,
        party_size: i32,
        total_amount: f64,
    },

    WaitlistExpired {
        entry_id: String,
        instance_id: String,
    },
}

impl BookingEvent {
    /// Create a new event with the authoritative server timestamp
    pub fn new(
        sequence: u64,
        actor: &Actor,
        command_id: String,
        client_timestamp: Option<i64>,
        event_type: BookingEventType,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            timestamp: crate::util::now_millis(),
            client_timestamp,
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            command_id,
            event_type,
            payload,
        }
    }

}
