//! BookingCheckedIn event applier

use redb::WriteTransaction;

use super::{transition_booking, EventApplier};
use crate::bookings::storage::BookingStorage;
use crate::bookings::traits::BookingError;
use shared::booking::{BookingEvent, BookingStatus, EventPayload};

pub struct BookingCheckedInApplier;

impl EventApplier for BookingCheckedInApplier {
    fn apply(
        &self,
        txn: &WriteTransaction,
        storage: &BookingStorage,
        event: &BookingEvent,
    ) -> Result<(), BookingError> {
        let EventPayload::BookingCheckedIn { booking_id, .. } = &event.payload else {
            return Err(BookingError::Storage(
                "BookingCheckedInApplier received wrong payload".to_string(),
            ));
        };

        // Spots stay consumed; CHECKED_IN still counts against capacity
        let booking = transition_booking(txn, storage, booking_id, BookingStatus::CheckedIn)?;
        storage.store_booking(txn, &booking)?;
        Ok(())
    }
}
