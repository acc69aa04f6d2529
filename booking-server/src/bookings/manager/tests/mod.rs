//! End-to-end command-flow tests for the BookingsManager

use std::sync::Arc;

use super::*;
use crate::bookings::actions::test_support::{
    confirmed_booking, guest, host, instance, offering, waitlist_entry,
};
use crate::bookings::capacity;
use crate::bookings::storage::BookingStorage;
use crate::core::config::EnginePolicy;
use crate::services::{MockNotificationService, MockPaymentGateway};
use shared::booking::records::{BookingRecord, InstanceRecord, OfferingRecord, WaitlistEntry};
use shared::booking::{BookingStatus, CancellationPolicy, WaitlistStatus};
use shared::error::CommandErrorCode;

mod test_core;

/// Manager wired to in-memory storage and recording collaborators
pub(crate) struct TestHarness {
    pub manager: Arc<BookingsManager>,
    pub storage: BookingStorage,
    pub gateway: Arc<MockPaymentGateway>,
    pub notifier: Arc<MockNotificationService>,
}

pub(crate) fn create_test_manager() -> TestHarness {
    let storage = BookingStorage::open_in_memory().unwrap();
    let gateway = Arc::new(MockPaymentGateway::new());
    let notifier = Arc::new(MockNotificationService::new());
    let manager = Arc::new(BookingsManager::new(
        storage.clone(),
        EnginePolicy::default(),
        gateway.clone(),
        notifier.clone(),
    ));
    TestHarness {
        manager,
        storage,
        gateway,
        notifier,
    }
}

impl TestHarness {
    /// Seed an offering, instances, bookings, and waitlist entries
    pub fn seed(
        &self,
        offering: &OfferingRecord,
        instances: &[InstanceRecord],
        bookings: &[BookingRecord],
        waitlist: &[WaitlistEntry],
    ) {
        let txn = self.storage.begin_write().unwrap();
        self.storage.store_offering(&txn, offering).unwrap();
        for inst in instances {
            self.storage.store_instance(&txn, inst).unwrap();
        }
        for booking in bookings {
            self.storage.store_booking(&txn, booking).unwrap();
        }
        for (i, entry) in waitlist.iter().enumerate() {
            let seq = self.storage.increment_sequence(&txn).unwrap();
            assert_eq!(seq, (i + 1) as u64);
            self.storage.insert_waitlist_entry(&txn, entry, seq).unwrap();
        }
        txn.commit().unwrap();
    }

    pub fn booking(&self, booking_id: &str) -> BookingRecord {
        self.storage.get_booking(booking_id).unwrap().unwrap()
    }

    pub fn instance(&self, instance_id: &str) -> InstanceRecord {
        self.storage.get_instance(instance_id).unwrap().unwrap()
    }

    pub fn entry(&self, entry_id: &str) -> WaitlistEntry {
        self.storage.get_waitlist_entry(entry_id).unwrap().unwrap()
    }

    /// Assert the capacity invariant for an instance:
    /// available + Σ guest_count(holding states) == capacity
    pub fn assert_invariant(&self, instance_id: &str) {
        let inst = self.instance(instance_id);
        let bookings = self.storage.bookings_for_instance(instance_id).unwrap();
        assert!(
            capacity::check_invariant(&inst, &bookings),
            "capacity invariant violated: available={} capacity={} bookings={:?}",
            inst.available_spots,
            inst.capacity,
            bookings
                .iter()
                .map(|b| (b.booking_id.clone(), b.guest_count, b.status))
                .collect::<Vec<_>>()
        );
    }
}
