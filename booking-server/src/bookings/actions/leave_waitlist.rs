//! LeaveWaitlist command handler
//!
//! A guest cancels their own queued entry. Leaving while NOTIFIED
//! abandons the claim window, so the manager signals the next promotion
//! after commit.

use async_trait::async_trait;

use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use shared::booking::{BookingEvent, BookingEventType, EventPayload, WaitlistStatus};

/// LeaveWaitlist action
#[derive(Debug, Clone)]
pub struct LeaveWaitlistAction {
    pub entry_id: String,
}

#[async_trait]
impl CommandHandler for LeaveWaitlistAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        // 1. Load entry, verify the caller owns it (staff may groom queues)
        let entry = ctx.load_waitlist_entry(&self.entry_id)?;
        if entry.owner_id != metadata.actor.id && !metadata.actor.is_staff() {
            return Err(BookingError::Unauthorized(format!(
                "actor {} does not own waitlist entry {}",
                metadata.actor.id, self.entry_id
            )));
        }

        // 2. Terminal entries stay where they ended up
        if entry.status.is_terminal() {
            return Err(BookingError::Validation(format!(
                "waitlist entry {} is already {:?}",
                self.entry_id, entry.status
            )));
        }

        let seq = ctx.next_sequence();
        let event = BookingEvent::new(
            seq,
            &metadata.actor,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            BookingEventType::WaitlistLeft,
            EventPayload::WaitlistLeft {
                entry_id: entry.entry_id.clone(),
                instance_id: entry.instance_id.clone(),
                was_notified: entry.status == WaitlistStatus::Notified,
            },
        );

        Ok(vec![event])
    }
}
