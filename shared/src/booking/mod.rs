//! Booking domain types
//!
//! This module provides the types for the booking modification engine:
//! - Commands: requests from guests/hosts to modify bookings
//! - Events: immutable facts recorded after command processing
//! - Records: persisted state (offerings, instances, bookings, waitlist)
//! - Responses: discriminated success/failure results

pub mod command;
pub mod event;
pub mod records;
pub mod response;
pub mod types;

// Re-exports
pub use command::{Actor, ActorRole, BookingCommand, BookingCommandPayload};
pub use event::{BookingEvent, BookingEventType, EventPayload};
pub use records::{
    BookingModification, BookingRecord, InstanceRecord, OfferingRecord, WaitlistEntry,
};
pub use response::CommandResponse;
pub use types::{
    BookingStatus, CancellationPolicy, InstanceStatus, ModificationType, RefundStatus,
    WaitlistStatus,
};
