//! CancelBooking command handler
//!
//! Cancels a CONFIRMED booking with a policy-tiered refund. There is no
//! modification-window gate here: a late cancellation simply lands in the
//! 0% refund tier. Spots are released by the applier; the manager signals
//! waitlist promotion after commit.

use async_trait::async_trait;

use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use crate::pricing::refund::calculate_refund;
use shared::booking::{BookingEvent, BookingEventType, EventPayload};
use shared::util::{hours_until, now_millis};

/// CancelBooking action
#[derive(Debug, Clone)]
pub struct CancelBookingAction {
    pub booking_id: String,
    pub reason: Option<String>,
}

#[async_trait]
impl CommandHandler for CancelBookingAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        // 1. Load booking, verify caller is the owner or staff
        let booking = ctx.load_booking(&self.booking_id)?;
        ctx.check_ownership(&booking, &metadata.actor)?;
        ctx.check_modifiable(&booking)?;

        // 2. Refund from the offering's policy and time to event
        let instance = ctx.load_instance(&booking.instance_id)?;
        let offering = ctx.load_offering(&booking.offering_id)?;
        let hours = hours_until(instance.start_time, now_millis());
        let refund_amount = calculate_refund(
            booking.total_amount,
            hours,
            offering.cancellation_policy,
            &ctx.policy().refund_schedule,
        );

        // 3. Allocate sequence and emit event
        let seq = ctx.next_sequence();
        let event = BookingEvent::new(
            seq,
            &metadata.actor,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            BookingEventType::BookingCancelled,
            EventPayload::BookingCancelled {
                booking_id: booking.booking_id.clone(),
                instance_id: booking.instance_id.clone(),
                guest_count: booking.guest_count,
                reason: self.reason.clone(),
                refund_amount,
            },
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookings::actions::test_support::*;
    use crate::bookings::storage::BookingStorage;
    use crate::bookings::traits::CommandContext;
    use shared::booking::{ActorRole, BookingStatus, CancellationPolicy};

    fn setup(policy: CancellationPolicy, hours_out: i64) -> BookingStorage {
        let storage = BookingStorage::open_in_memory().unwrap();
        seed(
            &storage,
            &offering(policy),
            &[instance("inst-1", 10, 0, hours_out)],
            &[confirmed_booking("bkg-1", "inst-1", "guest-1", 4)],
        );
        storage
    }

    #[tokio::test]
    async fn test_flexible_full_refund() {
        let storage = setup(CancellationPolicy::Flexible, 72);
        let policy = test_policy();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, &policy, 0);

        let action = CancelBookingAction {
            booking_id: "bkg-1".to_string(),
            reason: Some("Change of plans".to_string()),
        };
        let events = action.execute(&mut ctx, &test_metadata(guest("guest-1"))).await.unwrap();

        assert_eq!(events.len(), 1);
        if let EventPayload::BookingCancelled {
            guest_count,
            refund_amount,
            reason,
            ..
        } = &events[0].payload
        {
            assert_eq!(*guest_count, 4);
            assert_eq!(*refund_amount, 100.0); // full €100 back
            assert_eq!(reason.as_deref(), Some("Change of plans"));
        } else {
            panic!("Expected BookingCancelled payload");
        }
    }

    #[tokio::test]
    async fn test_late_cancellation_refunds_nothing() {
        let storage = setup(CancellationPolicy::Flexible, 10);
        let policy = test_policy();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, &policy, 0);

        let action = CancelBookingAction {
            booking_id: "bkg-1".to_string(),
            reason: None,
        };
        let events = action.execute(&mut ctx, &test_metadata(guest("guest-1"))).await.unwrap();

        if let EventPayload::BookingCancelled { refund_amount, .. } = &events[0].payload {
            assert_eq!(*refund_amount, 0.0);
        } else {
            panic!("Expected BookingCancelled payload");
        }
    }

    #[tokio::test]
    async fn test_moderate_half_tier() {
        let storage = setup(CancellationPolicy::Moderate, 48);
        let policy = test_policy();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, &policy, 0);

        let action = CancelBookingAction {
            booking_id: "bkg-1".to_string(),
            reason: None,
        };
        let events = action.execute(&mut ctx, &test_metadata(guest("guest-1"))).await.unwrap();

        if let EventPayload::BookingCancelled { refund_amount, .. } = &events[0].payload {
            assert_eq!(*refund_amount, 50.0); // 50% of €100
        } else {
            panic!("Expected BookingCancelled payload");
        }
    }

    #[tokio::test]
    async fn test_admin_may_cancel_for_guest() {
        let storage = setup(CancellationPolicy::Flexible, 72);
        let policy = test_policy();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, &policy, 0);

        let admin = shared::booking::Actor {
            id: "admin-1".to_string(),
            name: "Admin".to_string(),
            role: ActorRole::Admin,
        };
        let action = CancelBookingAction {
            booking_id: "bkg-1".to_string(),
            reason: Some("Host closed the venue".to_string()),
        };
        assert!(action.execute(&mut ctx, &test_metadata(admin)).await.is_ok());
    }

    #[tokio::test]
    async fn test_stranger_may_not_cancel() {
        let storage = setup(CancellationPolicy::Flexible, 72);
        let policy = test_policy();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, &policy, 0);

        let action = CancelBookingAction {
            booking_id: "bkg-1".to_string(),
            reason: None,
        };
        let result = action.execute(&mut ctx, &test_metadata(guest("guest-2"))).await;

        assert!(matches!(result, Err(BookingError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_cancelled_booking_cannot_cancel_again() {
        let storage = BookingStorage::open_in_memory().unwrap();
        let mut booking = confirmed_booking("bkg-1", "inst-1", "guest-1", 4);
        booking.status = BookingStatus::Cancelled;
        seed(
            &storage,
            &offering(CancellationPolicy::Flexible),
            &[instance("inst-1", 10, 4, 72)],
            &[booking],
        );
        let policy = test_policy();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, &policy, 0);

        let action = CancelBookingAction {
            booking_id: "bkg-1".to_string(),
            reason: None,
        };
        let result = action.execute(&mut ctx, &test_metadata(guest("guest-1"))).await;

        assert!(matches!(result, Err(BookingError::InvalidState { .. })));
    }
}
