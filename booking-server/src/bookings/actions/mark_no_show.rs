//! MarkNoShow command handler
//!
//! A host marks a CONFIRMED booking NO_SHOW once the instance has
//! started. NO_SHOW bookings drop out of the capacity-counting set, so
//! the applier releases their spots; no waitlist promotion follows
//! because the event is already underway.

use async_trait::async_trait;

use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use shared::booking::{BookingEvent, BookingEventType, BookingStatus, EventPayload};
use shared::util::now_millis;

/// MarkNoShow action
#[derive(Debug, Clone)]
pub struct MarkNoShowAction {
    pub booking_id: String,
}

#[async_trait]
impl CommandHandler for MarkNoShowAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        // 1. No-show is a staff operation
        if !metadata.actor.is_staff() {
            return Err(BookingError::Unauthorized(
                "marking a no-show requires a host or admin".to_string(),
            ));
        }

        // 2. Booking must be CONFIRMED
        let booking = ctx.load_booking(&self.booking_id)?;
        if booking.status != BookingStatus::Confirmed {
            return Err(BookingError::InvalidState {
                booking_id: booking.booking_id.clone(),
                status: booking.status,
            });
        }

        // 3. Only after the instance has started
        let instance = ctx.load_instance(&booking.instance_id)?;
        if instance.start_time > now_millis() {
            return Err(BookingError::Validation(format!(
                "instance {} has not started yet",
                instance.instance_id
            )));
        }

        let seq = ctx.next_sequence();
        let event = BookingEvent::new(
            seq,
            &metadata.actor,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            BookingEventType::BookingNoShow,
            EventPayload::BookingNoShow {
                booking_id: booking.booking_id.clone(),
                instance_id: booking.instance_id.clone(),
                guest_count: booking.guest_count,
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
    use shared::booking::CancellationPolicy;

    fn setup(hours_out: i64) -> BookingStorage {
        let storage = BookingStorage::open_in_memory().unwrap();
        seed(
            &storage,
            &offering(CancellationPolicy::Flexible),
            &[instance("inst-1", 10, 4, hours_out)],
            &[confirmed_booking("bkg-1", "inst-1", "guest-1", 3)],
        );
        storage
    }

    #[tokio::test]
    async fn test_no_show_after_start() {
        let storage = setup(-1);
        let policy = test_policy();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, &policy, 0);

        let action = MarkNoShowAction {
            booking_id: "bkg-1".to_string(),
        };
        let events = action.execute(&mut ctx, &test_metadata(host())).await.unwrap();

        if let EventPayload::BookingNoShow { guest_count, .. } = &events[0].payload {
            assert_eq!(*guest_count, 3);
        } else {
            panic!("Expected BookingNoShow payload");
        }
    }

    #[tokio::test]
    async fn test_no_show_before_start_rejected() {
        let storage = setup(2);
        let policy = test_policy();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, &policy, 0);

        let action = MarkNoShowAction {
            booking_id: "bkg-1".to_string(),
        };
        let result = action.execute(&mut ctx, &test_metadata(host())).await;

        assert!(matches!(result, Err(BookingError::Validation(_))));
    }

    #[tokio::test]
    async fn test_guest_cannot_mark_no_show() {
        let storage = setup(-1);
        let policy = test_policy();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, &policy, 0);

        let action = MarkNoShowAction {
            booking_id: "bkg-1".to_string(),
        };
        let result = action.execute(&mut ctx, &test_metadata(guest("guest-1"))).await;

        assert!(matches!(result, Err(BookingError::Unauthorized(_))));
    }
}
