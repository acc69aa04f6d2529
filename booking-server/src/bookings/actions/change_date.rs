//! ChangeBookingDate command handler
//!
//! Moves a CONFIRMED booking to another instance of the same offering,
//! releasing spots on the old instance and consuming them on the new one
//! in the same transaction. The check-in token is regenerated because the
//! old QR encodes the old occurrence.

use async_trait::async_trait;

use crate::bookings::capacity;
use crate::bookings::money::{to_decimal, to_f64};
use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use rust_decimal::Decimal;
use shared::booking::{BookingEvent, BookingEventType, EventPayload};
use shared::util::now_millis;

/// ChangeBookingDate action
#[derive(Debug, Clone)]
pub struct ChangeBookingDateAction {
    pub booking_id: String,
    pub new_instance_id: String,
}

#[async_trait]
impl CommandHandler for ChangeBookingDateAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        // 1. Load booking, verify ownership and modifiable state
        let booking = ctx.load_booking(&self.booking_id)?;
        ctx.check_ownership(&booking, &metadata.actor)?;
        ctx.check_modifiable(&booking)?;

        if self.new_instance_id == booking.instance_id {
            return Err(BookingError::Validation(
                "booking is already on that instance".to_string(),
            ));
        }

        // 2. Window check against the CURRENT instance
        let now = now_millis();
        let current = ctx.load_instance(&booking.instance_id)?;
        ctx.check_modification_window(&current, now)?;

        // 3. Target must belong to the same offering and not have started
        let mut target = ctx.load_instance(&self.new_instance_id)?;
        if target.offering_id != booking.offering_id {
            return Err(BookingError::Validation(format!(
                "instance {} belongs to a different offering",
                target.instance_id
            )));
        }
        if target.start_time <= now {
            return Err(BookingError::Validation(format!(
                "instance {} has already started",
                target.instance_id
            )));
        }

        // 4. Target capacity must seat the whole party
        capacity::reserve(&mut target, booking.guest_count)?;

        // 5. Reprice at the target's per-person rate
        let offering = ctx.load_offering(&booking.offering_id)?;
        let new_base_amount =
            to_decimal(target.price_per_person(&offering)) * Decimal::from(booking.guest_count);
        let price_difference = new_base_amount - to_decimal(booking.base_amount);
        let new_total_amount = to_decimal(booking.total_amount) + price_difference;

        // 6. Fresh QR token for the new occurrence
        let check_in_token = uuid::Uuid::new_v4().to_string();

        // 7. Allocate sequence and emit event
        let seq = ctx.next_sequence();
        let event = BookingEvent::new(
            seq,
            &metadata.actor,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            BookingEventType::DateChanged,
            EventPayload::DateChanged {
                booking_id: booking.booking_id.clone(),
                old_instance_id: booking.instance_id.clone(),
                new_instance_id: self.new_instance_id.clone(),
                guest_count: booking.guest_count,
                price_difference: to_f64(price_difference),
                new_base_amount: to_f64(new_base_amount),
                new_total_amount: to_f64(new_total_amount),
                check_in_token,
            },
        );

        Ok(vec![event])
    }
}
