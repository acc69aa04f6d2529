//! BookingNoShow event applier
//!
//! NO_SHOW drops the booking out of the capacity-counting set, so its
//! spots are released to keep the ledger invariant.

use redb::WriteTransaction;

use super::{transition_booking, EventApplier};
use crate::bookings::capacity;
use crate::bookings::storage::BookingStorage;
use crate::bookings::traits::BookingError;
use shared::booking::{BookingEvent, BookingStatus, EventPayload};

pub struct BookingNoShowApplier;

impl EventApplier for BookingNoShowApplier {
    fn apply(
        &self,
        txn: &WriteTransaction,
        storage: &BookingStorage,
        event: &BookingEvent,
    ) -> Result<(), BookingError> {
        let EventPayload::BookingNoShow {
            booking_id,
            instance_id,
            guest_count,
        } = &event.payload
        else {
            return Err(BookingError::Storage(
                "BookingNoShowApplier received wrong payload".to_string(),
            ));
        };

        let booking = transition_booking(txn, storage, booking_id, BookingStatus::NoShow)?;

        let mut instance = storage
            .get_instance_txn(txn, instance_id)?
            .ok_or_else(|| BookingError::InstanceNotFound(instance_id.clone()))?;
        capacity::reserve(&mut instance, -guest_count)?;

        storage.store_booking(txn, &booking)?;
        storage.store_instance(txn, &instance)?;
        Ok(())
    }
}
