//! ClaimWaitlistSpot command handler
//!
//! Converts a NOTIFIED waitlist entry into a CONFIRMED booking. The
//! capacity ledger re-checks availability here: the notification was only
//! an offer, and other releases or claims may have moved the counter
//! since. The expiry worker owns the competing NOTIFIED → EXPIRED
//! transition; whichever transaction commits first wins.

use async_trait::async_trait;

use crate::bookings::capacity;
use crate::bookings::money::{to_decimal, to_f64};
use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use rust_decimal::Decimal;
use shared::booking::{BookingEvent, BookingEventType, EventPayload, WaitlistStatus};
use shared::util::now_millis;

/// ClaimWaitlistSpot action
#[derive(Debug, Clone)]
pub struct ClaimWaitlistSpotAction {
    pub entry_id: String,
}

#[async_trait]
impl CommandHandler for ClaimWaitlistSpotAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        // 1. Load entry, verify the caller owns it
        let entry = ctx.load_waitlist_entry(&self.entry_id)?;
        if entry.owner_id != metadata.actor.id {
            return Err(BookingError::Unauthorized(format!(
                "actor {} does not own waitlist entry {}",
                metadata.actor.id, self.entry_id
            )));
        }

        // 2. Compare-on-status: only a NOTIFIED entry may claim
        match entry.status {
            WaitlistStatus::Notified => {}
            WaitlistStatus::Active => {
                return Err(BookingError::Validation(
                    "entry has not been offered a spot yet".to_string(),
                ));
            }
            status => {
                return Err(BookingError::Validation(format!(
                    "waitlist entry {} is already {:?}",
                    self.entry_id, status
                )));
            }
        }

        // 3. The instance must still be in the future
        let mut instance = ctx.load_instance(&entry.instance_id)?;
        if instance.start_time <= now_millis() {
            return Err(BookingError::Validation(format!(
                "instance {} has already started",
                instance.instance_id
            )));
        }

        // 4. Re-check capacity before converting the claim
        capacity::reserve(&mut instance, entry.party_size)?;

        // 5. Price the new booking at the instance's per-person rate
        let offering = ctx.load_offering(&entry.offering_id)?;
        let total_amount =
            to_decimal(instance.price_per_person(&offering)) * Decimal::from(entry.party_size);

        let booking_id = uuid::Uuid::new_v4().to_string();
        let seq = ctx.next_sequence();
        let event = BookingEvent::new(
            seq,
            &metadata.actor,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            BookingEventType::WaitlistClaimed,
            EventPayload::WaitlistClaimed {
                entry_id: entry.entry_id.clone(),
                instance_id: entry.instance_id.clone(),
                booking_id,
                party_size: entry.party_size,
                total_amount: to_f64(total_amount),
            },
        );

        Ok(vec![event])
    }
}
