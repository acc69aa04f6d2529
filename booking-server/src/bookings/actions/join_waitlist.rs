//! JoinWaitlist command handler
//!
//! Queues a guest for a freed spot on a full instance. Entries are FIFO
//! by join time per (offering, instance); the returned position counts
//! everyone still queued ahead of the new entry.

use async_trait::async_trait;

use crate::bookings::money::validate_party_size;
use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use shared::booking::{BookingEvent, BookingEventType, EventPayload};
use shared::util::now_millis;

/// JoinWaitlist action
#[derive(Debug, Clone)]
pub struct JoinWaitlistAction {
    pub offering_id: String,
    pub instance_id: String,
    pub party_size: i32,
}

#[async_trait]
impl CommandHandler for JoinWaitlistAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        // 1. Validate input before touching any state
        validate_party_size(self.party_size)?;

        // 2. Instance must exist, match the offering, and not have started
        let instance = ctx.load_instance(&self.instance_id)?;
        if instance.offering_id != self.offering_id {
            return Err(BookingError::Validation(format!(
                "instance {} does not belong to offering {}",
                self.instance_id, self.offering_id
            )));
        }
        if instance.start_time <= now_millis() {
            return Err(BookingError::Validation(format!(
                "instance {} has already started",
                self.instance_id
            )));
        }

        // 3. Waitlisting only makes sense when the party cannot book directly
        if instance.available_spots >= self.party_size {
            return Err(BookingError::Validation(format!(
                "{} spots are available; book directly instead of waitlisting",
                instance.available_spots
            )));
        }

        // 4. One live entry per guest per instance
        let existing = ctx.storage().owner_entries_for_instance(
            ctx.txn(),
            &self.instance_id,
            &metadata.actor.id,
        )?;
        if !existing.is_empty() {
            return Err(BookingError::Validation(
                "already on the waitlist for this instance".to_string(),
            ));
        }

        // 5. Position counts everyone still queued, including this entry
        let position = ctx.storage().queue_len(ctx.txn(), &self.instance_id)? + 1;

        let entry_id = uuid::Uuid::new_v4().to_string();
        let seq = ctx.next_sequence();
        let event = BookingEvent::new(
            seq,
            &metadata.actor,
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            BookingEventType::WaitlistJoined,
            EventPayload::WaitlistJoined {
                entry_id,
                offering_id: self.offering_id.clone(),
                instance_id: self.instance_id.clone(),
                party_size: self.party_size,
                position,
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
    use shared::booking::{CancellationPolicy, WaitlistStatus};

    fn setup(available: i32) -> BookingStorage {
        let storage = BookingStorage::open_in_memory().unwrap();
        seed(
            &storage,
            &offering(CancellationPolicy::Flexible),
            &[instance("inst-1", 10, available, 72)],
            &[],
        );
        storage
    }

    #[tokio::test]
    async fn test_join_full_instance() {
        let storage = setup(0);
        let policy = test_policy();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, &policy, 0);

        let action = JoinWaitlistAction {
            offering_id: "off-1".to_string(),
            instance_id: "inst-1".to_string(),
            party_size: 2,
        };
        let events = action.execute(&mut ctx, &test_metadata(guest("guest-1"))).await.unwrap();

        if let EventPayload::WaitlistJoined {
            party_size,
            position,
            ..
        } = &events[0].payload
        {
            assert_eq!(*party_size, 2);
            assert_eq!(*position, 1);
        } else {
            panic!("Expected WaitlistJoined payload");
        }
    }

    #[tokio::test]
    async fn test_position_counts_queued_entries() {
        let storage = setup(0);
        let txn = storage.begin_write().unwrap();
        storage
            .insert_waitlist_entry(
                &txn,
                &waitlist_entry("e-1", "inst-1", "guest-9", 2, WaitlistStatus::Active),
                1,
            )
            .unwrap();
        storage
            .insert_waitlist_entry(
                &txn,
                &waitlist_entry("e-2", "inst-1", "guest-8", 3, WaitlistStatus::Expired),
                2,
            )
            .unwrap();
        txn.commit().unwrap();

        let policy = test_policy();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, &policy, 2);

        let action = JoinWaitlistAction {
            offering_id: "off-1".to_string(),
            instance_id: "inst-1".to_string(),
            party_size: 2,
        };
        let events = action.execute(&mut ctx, &test_metadata(guest("guest-1"))).await.unwrap();

        if let EventPayload::WaitlistJoined { position, .. } = &events[0].payload {
            // Expired entry does not count toward the queue
            assert_eq!(*position, 2);
        } else {
            panic!("Expected WaitlistJoined payload");
        }
    }

    #[tokio::test]
    async fn test_join_rejected_when_spots_fit_party() {
        let storage = setup(3);
        let policy = test_policy();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, &policy, 0);

        let action = JoinWaitlistAction {
            offering_id: "off-1".to_string(),
            instance_id: "inst-1".to_string(),
            party_size: 2,
        };
        let result = action.execute(&mut ctx, &test_metadata(guest("guest-1"))).await;

        assert!(matches!(result, Err(BookingError::Validation(_))));
    }

    #[tokio::test]
    async fn test_oversized_party_may_join_despite_some_spots() {
        let storage = setup(2);
        let policy = test_policy();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, &policy, 0);

        let action = JoinWaitlistAction {
            offering_id: "off-1".to_string(),
            instance_id: "inst-1".to_string(),
            party_size: 4,
        };
        assert!(action.execute(&mut ctx, &test_metadata(guest("guest-1"))).await.is_ok());
    }

    #[tokio::test]
    async fn test_double_join_rejected() {
        let storage = setup(0);
        let txn = storage.begin_write().unwrap();
        storage
            .insert_waitlist_entry(
                &txn,
                &waitlist_entry("e-1", "inst-1", "guest-1", 2, WaitlistStatus::Active),
                1,
            )
            .unwrap();
        txn.commit().unwrap();

        let policy = test_policy();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, &policy, 1);

        let action = JoinWaitlistAction {
            offering_id: "off-1".to_string(),
            instance_id: "inst-1".to_string(),
            party_size: 2,
        };
        let result = action.execute(&mut ctx, &test_metadata(guest("guest-1"))).await;

        assert!(matches!(result, Err(BookingError::Validation(_))));
    }

    #[tokio::test]
    async fn test_invalid_party_size_rejected() {
        let storage = setup(0);
        let policy = test_policy();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, &policy, 0);

        let action = JoinWaitlistAction {
            offering_id: "off-1".to_string(),
            instance_id: "inst-1".to_string(),
            party_size: 0,
        };
        let result = action.execute(&mut ctx, &test_metadata(guest("guest-1"))).await;

        assert!(matches!(result, Err(BookingError::Validation(_))));
    }
}
