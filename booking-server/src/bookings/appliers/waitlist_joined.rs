//! WaitlistJoined event applier

use redb::WriteTransaction;

use super::EventApplier;
use crate::bookings::storage::BookingStorage;
use crate::bookings::traits::BookingError;
use shared::booking::records::WaitlistEntry;
use shared::booking::{BookingEvent, EventPayload, WaitlistStatus};

pub struct WaitlistJoinedApplier;

impl EventApplier for WaitlistJoinedApplier {
    fn apply(
        &self,
        txn: &WriteTransaction,
        storage: &BookingStorage,
        event: &BookingEvent,
    ) -> Result<(), BookingError> {
        let EventPayload::WaitlistJoined {
            entry_id,
            offering_id,
            instance_id,
            party_size,
            ..
        } = &event.payload
        else {
            return Err(BookingError::Storage(
                "WaitlistJoinedApplier received wrong payload".to_string(),
            ));
        };

        let entry = WaitlistEntry {
            entry_id: entry_id.clone(),
            offering_id: offering_id.clone(),
            instance_id: instance_id.clone(),
            owner_id: event.actor_id.clone(),
            party_size: *party_size,
            status: WaitlistStatus::Active,
            joined_at: event.timestamp,
            notified_at: None,
        };

        // The event sequence doubles as the FIFO queue key: global,
        // monotone, and allocated in join order.
        storage.insert_waitlist_entry(txn, &entry, event.sequence)?;
        Ok(())
    }
}
