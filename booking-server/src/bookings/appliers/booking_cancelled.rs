//! BookingCancelled event applier

use redb::WriteTransaction;

use super::{transition_booking, EventApplier};
use crate::bookings::capacity;
use crate::bookings::storage::BookingStorage;
use crate::bookings::traits::BookingError;
use shared::booking::{BookingEvent, BookingStatus, EventPayload};
use shared::util::now_millis;

pub struct BookingCancelledApplier;

impl EventApplier for BookingCancelledApplier {
    fn apply(
        &self,
        txn: &WriteTransaction,
        storage: &BookingStorage,
        event: &BookingEvent,
    ) -> Result<(), BookingError> {
        let EventPayload::BookingCancelled {
            booking_id,
            instance_id,
            guest_count,
            ..
        } = &event.payload
        else {
            return Err(BookingError::Storage(
                "BookingCancelledApplier received wrong payload".to_string(),
            ));
        };

        let mut booking = transition_booking(txn, storage, booking_id, BookingStatus::Cancelled)?;
        booking.cancelled_at = Some(now_millis());

        let mut instance = storage
            .get_instance_txn(txn, instance_id)?
            .ok_or_else(|| BookingError::InstanceNotFound(instance_id.clone()))?;
        capacity::reserve(&mut instance, -guest_count)?;

        storage.store_booking(txn, &booking)?;
        storage.store_instance(txn, &instance)?;
        Ok(())
    }
}
