//! Command error codes shared between the engine and its callers
//!
//! Every failed operation returns a `CommandError` with a machine-readable
//! code; the caller (or frontend) is responsible for localization.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes for command responses
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    // Authorization
    Unauthorized,

    // Lookups
    BookingNotFound,
    InstanceNotFound,
    OfferingNotFound,
    WaitlistEntryNotFound,

    // Business rules
    InvalidState,
    ModificationWindowClosed,
    InsufficientCapacity,
    ValidationError,

    // Side effects
    PaymentFailed,

    // Infrastructure
    DuplicateCommand,
    StorageFull,
    StorageCorrupted,
    SystemBusy,
    InternalError,
}

/// Command error with code and human-readable message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Error)]
#[error("{code:?}: {message}")]
pub struct CommandError {
    pub code: CommandErrorCode,
    pub message: String,
    /// Actual spots available, set for `InsufficientCapacity`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_spots: Option<i32>,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            available_spots: None,
        }
    }

    /// Attach the actual available-spot count (for `InsufficientCapacity`)
    pub fn with_available(mut self, available: i32) -> Self {
        self.available_spots = Some(available);
        self
    }
}
