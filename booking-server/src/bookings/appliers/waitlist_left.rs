//! WaitlistLeft event applier

use redb::WriteTransaction;

use super::EventApplier;
use crate::bookings::storage::BookingStorage;
use crate::bookings::traits::BookingError;
use shared::booking::{BookingEvent, EventPayload, WaitlistStatus};

pub struct WaitlistLeftApplier;

impl EventApplier for WaitlistLeftApplier {
    fn apply(
        &self,
        txn: &WriteTransaction,
        storage: &BookingStorage,
        event: &BookingEvent,
    ) -> Result<(), BookingError> {
        let EventPayload::WaitlistLeft { entry_id, .. } = &event.payload else {
            return Err(BookingError::Storage(
                "WaitlistLeftApplier received wrong payload".to_string(),
            ));
        };

        let mut entry = storage
            .get_waitlist_entry_txn(txn, entry_id)?
            .ok_or_else(|| BookingError::WaitlistEntryNotFound(entry_id.clone()))?;
        entry.status = WaitlistStatus::Cancelled;
        storage.update_waitlist_entry(txn, &entry)?;
        Ok(())
    }
}
