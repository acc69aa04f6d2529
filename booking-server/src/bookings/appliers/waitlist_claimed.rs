//! WaitlistClaimed event applier
//!
//! Converts the entry into a CONFIRMED booking, re-entering the capacity
//! ledger for the freed spot.

use redb::WriteTransaction;

use super::EventApplier;
use crate::bookings::capacity;
use crate::bookings::storage::BookingStorage;
use crate::bookings::traits::BookingError;
use shared::booking::records::BookingRecord;
use shared::booking::{BookingEvent, BookingStatus, EventPayload, WaitlistStatus};

pub struct WaitlistClaimedApplier;

impl EventApplier for WaitlistClaimedApplier {
    fn apply(
        &self,
        txn: &WriteTransaction,
        storage: &BookingStorage,
        event: &BookingEvent,
    ) -> Result<(), BookingError> {
        let EventPayload::WaitlistClaimed {
            entry_id,
            instance_id,
            booking_id,
            party_size,
            total_amount,
        } = &event.payload
        else {
            return Err(BookingError::Storage(
                "WaitlistClaimedApplier received wrong payload".to_string(),
            ));
        };

        let mut entry = storage
            .get_waitlist_entry_txn(txn, entry_id)?
            .ok_or_else(|| BookingError::WaitlistEntryNotFound(entry_id.clone()))?;
        entry.status = WaitlistStatus::Claimed;
        storage.update_waitlist_entry(txn, &entry)?;

        let mut instance = storage
            .get_instance_txn(txn, instance_id)?
            .ok_or_else(|| BookingError::InstanceNotFound(instance_id.clone()))?;
        capacity::reserve(&mut instance, *party_size)?;
        storage.store_instance(txn, &instance)?;

        let booking = BookingRecord {
            booking_id: booking_id.clone(),
            offering_id: entry.offering_id.clone(),
            instance_id: instance_id.clone(),
            owner_id: entry.owner_id.clone(),
            guest_count: *party_size,
            base_amount: *total_amount,
            total_amount: *total_amount,
            status: BookingStatus::Confirmed,
            payment_ref: format!("pay-{}", uuid::Uuid::new_v4()),
            check_in_token: uuid::Uuid::new_v4().to_string(),
            created_at: event.timestamp,
            updated_at: event.timestamp,
            cancelled_at: None,
        };
        storage.store_booking(txn, &booking)?;
        Ok(())
    }
}
