//! CheckInBooking command handler
//!
//! A host scans the guest's QR token at the door. Spots stay consumed;
//! CHECKED_IN bookings still count against capacity.

use async_trait::async_trait;

use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use shared::booking::{BookingEvent, BookingEventType, BookingStatus, EventPayload};

/// CheckInBooking action
#[derive(Debug, Clone)]
pub struct CheckInBookingAction {
    pub booking_id: String,
    pub check_in_token: String,
}

#[async_trait]
impl CommandHandler for CheckInBookingAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        // 1. Check-in is a staff operation
        if !metadata.actor.is_staff() {
            return Err(BookingError::Unauthorized(
                "check-in requires a host or admin".to_string(),
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

        // 3. Token must match the current QR (regenerated on date change)
        if booking.check_in_token != self.check_in_token {
            return Err(BookingError::Validation(
                "check-in token does not match".to_string(),
            ));
        }

        let seq = ctx.next_sequence();
        let event = BookingEvent::new(
            seq,
            &metadata.actor,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            BookingEventType::BookingCheckedIn,
            EventPayload::BookingCheckedIn {
                booking_id: booking.booking_id.clone(),
                instance_id: booking.instance_id.clone(),
            },
        );

        Ok(vec![event])
    }
}
