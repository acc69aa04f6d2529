//! ModifyPartySize command handler
//!
//! Changes the guest count of a CONFIRMED booking, reserving or
//! releasing spots through the capacity ledger and repricing the
//! booking by the per-person price.

use async_trait::async_trait;

use crate::bookings::capacity;
use crate::bookings::money::{to_decimal, to_f64, validate_party_size};
use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use rust_decimal::Decimal;
use shared::booking::{BookingEvent, BookingEventType, EventPayload};
use shared::util::now_millis;

/// ModifyPartySize action
#[derive(Debug, Clone)]
pub struct ModifyPartySizeAction {
    pub booking_id: String,
    pub new_guest_count: i32,
}

#[async_trait]
impl CommandHandler for ModifyPartySizeAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        // 1. Validate input before touching any state
        validate_party_size(self.new_guest_count)?;

        // 2. Load booking, verify ownership and modifiable state
        let booking = ctx.load_booking(&self.booking_id)?;
        ctx.check_ownership(&booking, &metadata.actor)?;
        ctx.check_modifiable(&booking)?;

        // 3. Modification window against the booked instance
        let mut instance = ctx.load_instance(&booking.instance_id)?;
        ctx.check_modification_window(&instance, now_millis())?;

        // 4. Capacity check for increases (release always succeeds)
        let delta = self.new_guest_count - booking.guest_count;
        if delta == 0 {
            return Err(BookingError::Validation(format!(
                "party size is already {}",
                booking.guest_count
            )));
        }
        capacity::reserve(&mut instance, delta)?;

        // 5. Price difference at the per-person rate
        let offering = ctx.load_offering(&booking.offering_id)?;
        let price_per_person = to_decimal(instance.price_per_person(&offering));
        let price_difference = price_per_person * Decimal::from(delta);
        let new_base_amount = to_decimal(booking.base_amount) + price_difference;
        let new_total_amount = to_decimal(booking.total_amount) + price_difference;

        // 6. Allocate sequence and emit event
        let seq = ctx.next_sequence();
        let event = BookingEvent::new(
            seq,
            &metadata.actor,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            BookingEventType::PartySizeChanged,
            EventPayload::PartySizeChanged {
                booking_id: booking.booking_id.clone(),
                instance_id: booking.instance_id.clone(),
                old_guest_count: booking.guest_count,
                new_guest_count: self.new_guest_count,
                price_difference: to_f64(price_difference),
                new_base_amount: to_f64(new_base_amount),
                new_total_amount: to_f64(new_total_amount),
            },
        );

        Ok(vec![event])
    }
}
