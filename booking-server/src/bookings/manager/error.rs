use crate::bookings::storage::StorageError;
use crate::bookings::traits::BookingError;
use shared::error::{CommandError, CommandErrorCode};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Booking(BookingError),
}

impl From<BookingError> for ManagerError {
    fn from(err: BookingError) -> Self {
        ManagerError::Booking(err)
    }
}

/// Classify a storage error into a response code (callers localize)
fn classify_storage_error(e: &StorageError) -> CommandErrorCode {
    match e {
        StorageError::Serialization(_) => return CommandErrorCode::InternalError,
        StorageError::BookingNotFound(_) => return CommandErrorCode::BookingNotFound,
        StorageError::WaitlistEntryNotFound(_) => return CommandErrorCode::WaitlistEntryNotFound,
        _ => {}
    }

    let err_str = e.to_string().to_lowercase();

    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return CommandErrorCode::StorageFull;
    }

    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return CommandErrorCode::StorageCorrupted;
    }

    CommandErrorCode::SystemBusy
}

impl From<ManagerError> for CommandError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::Storage(e) => {
                let code = classify_storage_error(&e);
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                CommandError::new(code, e.to_string())
            }
            ManagerError::Booking(e) => {
                let message = e.to_string();
                match e {
                    BookingError::Unauthorized(_) => {
                        CommandError::new(CommandErrorCode::Unauthorized, message)
                    }
                    BookingError::BookingNotFound(_) => {
                        CommandError::new(CommandErrorCode::BookingNotFound, message)
                    }
                    BookingError::InstanceNotFound(_) => {
                        CommandError::new(CommandErrorCode::InstanceNotFound, message)
                    }
                    BookingError::OfferingNotFound(_) => {
                        CommandError::new(CommandErrorCode::OfferingNotFound, message)
                    }
                    BookingError::WaitlistEntryNotFound(_) => {
                        CommandError::new(CommandErrorCode::WaitlistEntryNotFound, message)
                    }
                    BookingError::InvalidState { .. } => {
                        CommandError::new(CommandErrorCode::InvalidState, message)
                    }
                    BookingError::ModificationWindowClosed { .. } => {
                        CommandError::new(CommandErrorCode::ModificationWindowClosed, message)
                    }
                    BookingError::InsufficientCapacity { available, .. } => {
                        CommandError::new(CommandErrorCode::InsufficientCapacity, message)
                            .with_available(available)
                    }
                    BookingError::Validation(_) => {
                        CommandError::new(CommandErrorCode::ValidationError, message)
                    }
                    BookingError::Storage(_) => {
                        CommandError::new(CommandErrorCode::SystemBusy, message)
                    }
                }
            }
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
