//! Booking modification engine core
//!
//! - **manager**: BookingsManager for command processing and side effects
//! - **actions**: one validating handler per command
//! - **appliers**: one mutating applier per event
//! - **capacity**: the ledger owning `available_spots`
//! - **storage**: redb persistence (records, audit trail, waitlist, idempotency)
//! - **money**: decimal arithmetic and input validation
//!
//! # Data Flow
//!
//! 1. Caller submits a BookingCommand (idempotent by command_id)
//! 2. The action validates ownership/window/state and capacity
//! 3. BookingEvents are generated with global sequence numbers
//! 4. Appliers mutate records and the capacity ledger, audit rows are
//!    appended, everything commits atomically
//! 5. Events are broadcast to subscribers
//! 6. Payment/notification/waitlist side effects run post-commit

pub mod actions;
pub mod appliers;
pub mod capacity;
pub mod manager;
pub mod money;
pub mod storage;
pub mod traits;

// Re-exports
pub use manager::BookingsManager;
pub use storage::BookingStorage;
pub use traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
