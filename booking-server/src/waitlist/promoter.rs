//! Waitlist promoter - offers freed spots to the queue head
//!
//! Invoked after every committed release (cancellation, party-size
//! decrease, date change off an instance, an abandoned claim) and after
//! each expiry. One NOTIFIED entry is outstanding per instance at a
//! time, so concurrent releases cannot promote two entries for one
//! freed spot.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::bookings::appliers::{EventAction, EventApplier};
use crate::bookings::storage::BookingStorage;
use crate::bookings::traits::BookingError;
use crate::core::config::EnginePolicy;
use crate::services::{NotificationService, NotificationTemplate};
use shared::booking::records::WaitlistEntry;
use shared::booking::{Actor, ActorRole, BookingEvent, BookingEventType, EventPayload};
use shared::util::now_millis;

/// Actor recorded on system-initiated waitlist events
fn system_actor() -> Actor {
    Actor {
        id: "system".to_string(),
        name: "System".to_string(),
        role: ActorRole::Admin,
    }
}

pub struct WaitlistPromoter {
    storage: BookingStorage,
    notifier: Arc<dyn NotificationService>,
    event_tx: broadcast::Sender<BookingEvent>,
    policy: EnginePolicy,
}

impl WaitlistPromoter {
    pub fn new(
        storage: BookingStorage,
        notifier: Arc<dyn NotificationService>,
        event_tx: broadcast::Sender<BookingEvent>,
        policy: EnginePolicy,
    ) -> Self {
        Self {
            storage,
            notifier,
            event_tx,
            policy,
        }
    }

    /// Offer the instance's next freed spot to the oldest ACTIVE entry.
    ///
    /// No-op when the instance has started, has no spots free, already
    /// has an outstanding claim window, or the queue is empty. Returns
    /// the notified entry, if any.
    pub async fn promote_next(
        &self,
        instance_id: &str,
    ) -> Result<Option<WaitlistEntry>, BookingError> {
        let now = now_millis();

        // Transition committed first, notification sent after
        let (entry, event) = {
            let txn = self.storage.begin_write()?;

            let Some(instance) = self.storage.get_instance_txn(&txn, instance_id)? else {
                return Ok(None);
            };
            if instance.start_time <= now || instance.available_spots <= 0 {
                return Ok(None);
            }
            // One outstanding claim window per instance
            if self.storage.has_notified_entry(&txn, instance_id)? {
                return Ok(None);
            }
            let Some(entry) = self.storage.oldest_active_entry(&txn, instance_id)? else {
                return Ok(None);
            };

            let seq = self.storage.increment_sequence(&txn)?;
            let notified_at = now;
            let event = BookingEvent::new(
                seq,
                &system_actor(),
                format!("promote-{}", uuid::Uuid::new_v4()),
                None,
                BookingEventType::WaitlistNotified,
                EventPayload::WaitlistNotified {
                    entry_id: entry.entry_id.clone(),
                    instance_id: instance_id.to_string(),
                    notified_at,
                    claim_deadline: notified_at + self.policy.claim_ttl_millis(),
                },
            );
            EventAction::from(&event).apply(&txn, &self.storage, &event)?;
            txn.commit().map_err(crate::bookings::storage::StorageError::from)?;
            (entry, event)
        };

        tracing::info!(
            entry_id = %entry.entry_id,
            instance_id = %instance_id,
            party_size = entry.party_size,
            "Waitlist entry notified of freed spot"
        );

        if self.event_tx.send(event.clone()).is_err() {
            tracing::debug!("Event broadcast failed: no active receivers");
        }

        if let EventPayload::WaitlistNotified { claim_deadline, .. } = event.payload {
            self.notifier
                .send(
                    &entry.owner_id,
                    NotificationTemplate::WaitlistSpotAvailable,
                    serde_json::json!({
                        "entry_id": entry.entry_id,
                        "instance_id": instance_id,
                        "party_size": entry.party_size,
                        "claim_deadline": claim_deadline,
                    }),
                )
                .await;
        }

        Ok(Some(entry))
    }

    /// Expire one overdue claim window.
    ///
    /// Compare-on-status inside the transaction: if a claim committed
    /// first the entry is no longer NOTIFIED and nothing happens. The
    /// caller re-signals promotion on success.
    pub async fn expire_entry(&self, entry_id: &str) -> Result<bool, BookingError> {
        let deadline_millis = self.policy.claim_ttl_millis();
        let now = now_millis();

        let event = {
            let txn = self.storage.begin_write()?;

            let Some(entry) = self.storage.get_waitlist_entry_txn(&txn, entry_id)? else {
                return Ok(false);
            };
            // Claim beat us to the commit, or the sweep raced a stale scan
            if entry.status != shared::WaitlistStatus::Notified {
                return Ok(false);
            }
            let Some(notified_at) = entry.notified_at else {
                return Ok(false);
            };
            if notified_at + deadline_millis > now {
                return Ok(false);
            }

            let seq = self.storage.increment_sequence(&txn)?;
            let event = BookingEvent::new(
                seq,
                &system_actor(),
                format!("expire-{}", uuid::Uuid::new_v4()),
                None,
                BookingEventType::WaitlistExpired,
                EventPayload::WaitlistExpired {
                    entry_id: entry.entry_id.clone(),
                    instance_id: entry.instance_id.clone(),
                },
            );
            EventAction::from(&event).apply(&txn, &self.storage, &event)?;
            txn.commit().map_err(crate::bookings::storage::StorageError::from)?;
            event
        };

        tracing::info!(entry_id = %entry_id, "Waitlist claim window expired");
        if self.event_tx.send(event).is_err() {
            tracing::debug!("Event broadcast failed: no active receivers");
        }
        Ok(true)
    }
}
