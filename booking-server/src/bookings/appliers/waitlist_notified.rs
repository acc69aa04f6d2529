//! WaitlistNotified event applier

use redb::WriteTransaction;

use super::EventApplier;
use crate::bookings::storage::BookingStorage;
use crate::bookings::traits::BookingError;
use shared::booking::{BookingEvent, EventPayload, WaitlistStatus};

pub struct WaitlistNotifiedApplier;

impl EventApplier for WaitlistNotifiedApplier {
    fn apply(
        &self,
        txn: &WriteTransaction,
        storage: &BookingStorage,
        event: &BookingEvent,
    ) -> Result<(), BookingError> {
        let EventPayload::WaitlistNotified {
            entry_id,
            notified_at,
            ..
        } = &event.payload
        else {
            return Err(BookingError::Storage(
                "WaitlistNotifiedApplier received wrong payload".to_string(),
            ));
        };

        let mut entry = storage
            .get_waitlist_entry_txn(txn, entry_id)?
            .ok_or_else(|| BookingError::WaitlistEntryNotFound(entry_id.clone()))?;
        entry.status = WaitlistStatus::Notified;
        entry.notified_at = Some(*notified_at);
        storage.update_waitlist_entry(txn, &entry)?;
        Ok(())
    }
}
