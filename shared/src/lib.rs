//! Shared types for the booking engine
//!
//! Common types used across crates: booking records and status machines,
//! command/event/response envelopes, error codes, and utility helpers.

pub mod booking;
pub mod error;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Booking re-exports (for convenient access)
pub use booking::{
    Actor, ActorRole, BookingCommand, BookingCommandPayload, BookingEvent, BookingEventType,
    BookingModification, BookingRecord, BookingStatus, CancellationPolicy, CommandResponse,
    EventPayload, InstanceRecord, InstanceStatus, ModificationType, OfferingRecord, RefundStatus,
    WaitlistEntry, WaitlistStatus,
};
pub use error::{CommandError, CommandErrorCode};
