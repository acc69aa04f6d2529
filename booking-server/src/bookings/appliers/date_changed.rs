//! DateChanged event applier
//!
//! Releases the party's spots on the old instance and consumes them on
//! the new one in the same transaction, then repoints the booking.

use redb::WriteTransaction;

use super::EventApplier;
use crate::bookings::capacity;
use crate::bookings::storage::BookingStorage;
use crate::bookings::traits::BookingError;
use shared::booking::{BookingEvent, EventPayload};
use shared::util::now_millis;

pub struct DateChangedApplier;

impl EventApplier for DateChangedApplier {
    fn apply(
        &self,
        txn: &WriteTransaction,
        storage: &BookingStorage,
        event: &BookingEvent,
    ) -> Result<(), BookingError> {
        let EventPayload::DateChanged {
            booking_id,
            old_instance_id,
            new_instance_id,
            guest_count,
            new_base_amount,
            new_total_amount,
            check_in_token,
            ..
        } = &event.payload
        else {
            return Err(BookingError::Storage(
                "DateChangedApplier received wrong payload".to_string(),
            ));
        };

        let mut booking = storage
            .get_booking_txn(txn, booking_id)?
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.clone()))?;
        let mut old_instance = storage
            .get_instance_txn(txn, old_instance_id)?
            .ok_or_else(|| BookingError::InstanceNotFound(old_instance_id.clone()))?;
        let mut new_instance = storage
            .get_instance_txn(txn, new_instance_id)?
            .ok_or_else(|| BookingError::InstanceNotFound(new_instance_id.clone()))?;

        capacity::reserve(&mut old_instance, -guest_count)?;
        capacity::reserve(&mut new_instance, *guest_count)?;

        booking.instance_id = new_instance_id.clone();
        booking.base_amount = *new_base_amount;
        booking.total_amount = *new_total_amount;
        booking.check_in_token = check_in_token.clone();
        booking.updated_at = now_millis();

        storage.store_booking(txn, &booking)?;
        storage.store_instance(txn, &old_instance)?;
        storage.store_instance(txn, &new_instance)?;
        Ok(())
    }
}
