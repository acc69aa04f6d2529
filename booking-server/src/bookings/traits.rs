//! Command handling traits and context
//!
//! Each command is executed by a `CommandHandler` against a
//! `CommandContext` that wraps the open write transaction. Handlers only
//! validate and emit events; appliers perform the actual mutation within
//! the same transaction.

use crate::bookings::storage::{BookingStorage, StorageError};
use crate::core::config::EnginePolicy;
use async_trait::async_trait;
use redb::WriteTransaction;
use shared::booking::records::{BookingRecord, InstanceRecord, OfferingRecord, WaitlistEntry};
use shared::booking::{Actor, BookingEvent, BookingStatus};
use thiserror::Error;

/// Errors surfaced by command handlers and appliers
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Offering not found: {0}")]
    OfferingNotFound(String),

    #[error("Waitlist entry not found: {0}")]
    WaitlistEntryNotFound(String),

    #[error("Booking {booking_id} is {status:?} and cannot be modified")]
    InvalidState {
        booking_id: String,
        status: BookingStatus,
    },

    #[error("Modification window closed: {hours_remaining}h until event, {window_hours}h required")]
    ModificationWindowClosed {
        hours_remaining: i64,
        window_hours: i64,
    },

    #[error("Insufficient capacity: requested {requested}, available {available}")]
    InsufficientCapacity { requested: i32, available: i32 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for BookingError {
    fn from(err: StorageError) -> Self {
        BookingError::Storage(err.to_string())
    }
}

impl From<crate::bookings::capacity::CapacityError> for BookingError {
    fn from(err: crate::bookings::capacity::CapacityError) -> Self {
        match err {
            crate::bookings::capacity::CapacityError::Insufficient {
                requested,
                available,
            } => BookingError::InsufficientCapacity {
                requested,
                available,
            },
        }
    }
}

/// Metadata extracted from the command envelope
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub actor: Actor,
    /// Client timestamp (audit only; server time is authoritative)
    pub timestamp: i64,
}

/// Context threading the write transaction through a command's handler
/// and appliers
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a BookingStorage,
    policy: &'a EnginePolicy,
    sequence: u64,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        txn: &'a WriteTransaction,
        storage: &'a BookingStorage,
        policy: &'a EnginePolicy,
        current_sequence: u64,
    ) -> Self {
        Self {
            txn,
            storage,
            policy,
            sequence: current_sequence,
        }
    }

    pub fn txn(&self) -> &'a WriteTransaction {
        self.txn
    }

    pub fn storage(&self) -> &'a BookingStorage {
        self.storage
    }

    pub fn policy(&self) -> &'a EnginePolicy {
        self.policy
    }

    /// Allocate the next global sequence number
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Highest sequence allocated so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Load a booking or fail with `BookingNotFound`
    pub fn load_booking(&self, booking_id: &str) -> Result<BookingRecord, BookingError> {
        self.storage
            .get_booking_txn(self.txn, booking_id)?
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))
    }

    /// Load an instance or fail with `InstanceNotFound`
    pub fn load_instance(&self, instance_id: &str) -> Result<InstanceRecord, BookingError> {
        self.storage
            .get_instance_txn(self.txn, instance_id)?
            .ok_or_else(|| BookingError::InstanceNotFound(instance_id.to_string()))
    }

    /// Load an offering or fail with `OfferingNotFound`
    pub fn load_offering(&self, offering_id: &str) -> Result<OfferingRecord, BookingError> {
        self.storage
            .get_offering_txn(self.txn, offering_id)?
            .ok_or_else(|| BookingError::OfferingNotFound(offering_id.to_string()))
    }

    /// Load a waitlist entry or fail with `WaitlistEntryNotFound`
    pub fn load_waitlist_entry(&self, entry_id: &str) -> Result<WaitlistEntry, BookingError> {
        self.storage
            .get_waitlist_entry_txn(self.txn, entry_id)?
            .ok_or_else(|| BookingError::WaitlistEntryNotFound(entry_id.to_string()))
    }

    /// Verify the actor owns the booking or has a staff role
    pub fn check_ownership(
        &self,
        booking: &BookingRecord,
        actor: &Actor,
    ) -> Result<(), BookingError> {
        if booking.owner_id == actor.id || actor.is_staff() {
            return Ok(());
        }
        Err(BookingError::Unauthorized(format!(
            "actor {} does not own booking {}",
            actor.id, booking.booking_id
        )))
    }

    /// Verify the booking is CONFIRMED (the only modifiable state)
    pub fn check_modifiable(&self, booking: &BookingRecord) -> Result<(), BookingError> {
        if booking.status != BookingStatus::Confirmed {
            return Err(BookingError::InvalidState {
                booking_id: booking.booking_id.clone(),
                status: booking.status,
            });
        }
        Ok(())
    }

    /// Verify the instance is at least the modification window away
    pub fn check_modification_window(
        &self,
        instance: &InstanceRecord,
        now: i64,
    ) -> Result<(), BookingError> {
        let hours = shared::util::hours_until(instance.start_time, now);
        let window = self.policy.modification_window_hours;
        if hours < window {
            return Err(BookingError::ModificationWindowClosed {
                hours_remaining: hours,
                window_hours: window,
            });
        }
        Ok(())
    }
}

/// Command handler - validates a command and emits events
#[async_trait]
pub trait CommandHandler {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError>;
}
