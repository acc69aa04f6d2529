//! PartySizeChanged event applier

use redb::WriteTransaction;

use super::EventApplier;
use crate::bookings::capacity;
use crate::bookings::storage::BookingStorage;
use crate::bookings::traits::BookingError;
use shared::booking::{BookingEvent, EventPayload};
use shared::util::now_millis;

pub struct PartySizeChangedApplier;

impl EventApplier for PartySizeChangedApplier {
    fn apply(
        &self,
        txn: &WriteTransaction,
        storage: &BookingStorage,
        event: &BookingEvent,
    ) -> Result<(), BookingError> {
        let EventPayload::PartySizeChanged {
            booking_id,
            instance_id,
            old_guest_count,
            new_guest_count,
            new_base_amount,
            new_total_amount,
            ..
        } = &event.payload
        else {
            return Err(BookingError::Storage(
                "PartySizeChangedApplier received wrong payload".to_string(),
            ));
        };

        let mut booking = storage
            .get_booking_txn(txn, booking_id)?
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.clone()))?;
        let mut instance = storage
            .get_instance_txn(txn, instance_id)?
            .ok_or_else(|| BookingError::InstanceNotFound(instance_id.clone()))?;

        // Capacity ledger owns the spot math
        let delta = new_guest_count - old_guest_count;
        capacity::reserve(&mut instance, delta)?;

        booking.guest_count = *new_guest_count;
        booking.base_amount = *new_base_amount;
        booking.total_amount = *new_total_amount;
        booking.updated_at = now_millis();

        storage.store_booking(txn, &booking)?;
        storage.store_instance(txn, &instance)?;
        Ok(())
    }
}
