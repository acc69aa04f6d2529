//! Capacity ledger - the only place that mutates `available_spots`
//!
//! Every spot reservation or release goes through `reserve`, called on a
//! record loaded inside the command's write transaction. redb serializes
//! write transactions, so check-then-write here is atomic: two concurrent
//! increases cannot both pass a stale availability check.

use shared::booking::records::{BookingRecord, InstanceRecord};
use shared::booking::types::InstanceStatus;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CapacityError {
    #[error("Insufficient capacity: requested {requested}, available {available}")]
    Insufficient { requested: i32, available: i32 },
}

/// Reserve (`delta > 0`) or release (`delta < 0`) spots on an instance.
///
/// A release always succeeds; `available_spots` is capped at `capacity`
/// so double releases cannot mint inventory. A reservation fails when
/// fewer than `delta` spots are available at evaluation time.
///
/// Returns the new available-spot count.
pub fn reserve(instance: &mut InstanceRecord, delta: i32) -> Result<i32, CapacityError> {
    if delta > 0 && instance.available_spots < delta {
        return Err(CapacityError::Insufficient {
            requested: delta,
            available: instance.available_spots,
        });
    }
    instance.available_spots = (instance.available_spots - delta).min(instance.capacity);
    Ok(instance.available_spots)
}

/// Derive the availability status shown to guests.
///
/// Recomputed on read; never the source of truth.
pub fn derive_status(available: i32, capacity: i32, limited_threshold: f64) -> InstanceStatus {
    if available <= 0 {
        return InstanceStatus::SoldOut;
    }
    if capacity > 0 && (available as f64) / (capacity as f64) < limited_threshold {
        return InstanceStatus::Limited;
    }
    InstanceStatus::Available
}

/// Capacity invariant:
/// `available_spots + Σ guest_count(CONFIRMED | CHECKED_IN | COMPLETED) == capacity`
///
/// Used by tests and consistency checks, never enforced lazily at runtime.
pub fn check_invariant(instance: &InstanceRecord, bookings: &[BookingRecord]) -> bool {
    let consumed: i32 = bookings
        .iter()
        .filter(|b| b.instance_id == instance.instance_id && b.status.counts_against_capacity())
        .map(|b| b.guest_count)
        .sum();
    instance.available_spots + consumed == instance.capacity
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::BookingStatus;

    fn instance(capacity: i32, available: i32) -> InstanceRecord {
        InstanceRecord {
            instance_id: "inst-1".to_string(),
            offering_id: "off-1".to_string(),
            start_time: 0,
            capacity,
            available_spots: available,
            price_override: None,
        }
    }

    fn booking(guest_count: i32, status: BookingStatus) -> BookingRecord {
        BookingRecord {
            booking_id: "bkg".to_string(),
            offering_id: "off-1".to_string(),
            instance_id: "inst-1".to_string(),
            owner_id: "guest-1".to_string(),
            guest_count,
            base_amount: 0.0,
            total_amount: 0.0,
            status,
            payment_ref: "pay".to_string(),
            check_in_token: "tok".to_string(),
            created_at: 0,
            updated_at: 0,
            cancelled_at: None,
        }
    }

    #[test]
    fn test_reserve_consumes_spots() {
        let mut inst = instance(10, 4);
        assert_eq!(reserve(&mut inst, 3).unwrap(), 1);
        assert_eq!(inst.available_spots, 1);
    }

    #[test]
    fn test_reserve_fails_with_actual_count() {
        let mut inst = instance(10, 2);
        let err = reserve(&mut inst, 3).unwrap_err();
        assert_eq!(
            err,
            CapacityError::Insufficient {
                requested: 3,
                available: 2
            }
        );
        // No state change on failure
        assert_eq!(inst.available_spots, 2);
    }

    #[test]
    fn test_reserve_exact_remaining() {
        let mut inst = instance(10, 2);
        assert_eq!(reserve(&mut inst, 2).unwrap(), 0);
    }

    #[test]
    fn test_release_always_succeeds() {
        let mut inst = instance(10, 0);
        assert_eq!(reserve(&mut inst, -4).unwrap(), 4);
    }

    #[test]
    fn test_release_capped_at_capacity() {
        let mut inst = instance(10, 9);
        assert_eq!(reserve(&mut inst, -5).unwrap(), 10);
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(derive_status(0, 10, 0.30), InstanceStatus::SoldOut);
        assert_eq!(derive_status(-1, 10, 0.30), InstanceStatus::SoldOut);
        assert_eq!(derive_status(2, 10, 0.30), InstanceStatus::Limited);
        assert_eq!(derive_status(3, 10, 0.30), InstanceStatus::Available);
        assert_eq!(derive_status(10, 10, 0.30), InstanceStatus::Available);
    }

    #[test]
    fn test_invariant_counts_only_holding_states() {
        let inst = instance(10, 5);
        let bookings = vec![
            booking(3, BookingStatus::Confirmed),
            booking(2, BookingStatus::CheckedIn),
            booking(4, BookingStatus::Cancelled),
            booking(7, BookingStatus::PendingPayment),
        ];
        assert!(check_invariant(&inst, &bookings));

        let drifted = instance(10, 6);
        assert!(!check_invariant(&drifted, &bookings));
    }
}
