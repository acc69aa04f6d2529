//! BookingsManager - the modification coordinator
//!
//! Orchestrates party-size changes, date changes, cancellations, and
//! waitlist operations as atomic transactions followed by best-effort
//! side effects.
//!
//! # Command Flow
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Idempotency check (command_id)
//!     ├─ 2. Begin write transaction (bounded retries on transient errors)
//!     ├─ 3. Convert command to action and execute (validation, events)
//!     ├─ 4. Apply events to records via EventApplier
//!     ├─ 5. Append audit rows (one per modification attempt)
//!     ├─ 6. Mark command processed, commit
//!     ├─ 7. Broadcast event(s)
//!     ├─ 8. Post-commit side effects: charge/refund, notify, promote waitlist
//!     └─ 9. Return response
//! ```
//!
//! Validation and authorization reject before the transaction begins;
//! capacity/state errors roll the whole transaction back; payment errors
//! happen strictly after commit; the committed change is NOT reverted
//! (the caller sees `PaymentFailed` with `payment_pending` set and must
//! retry payment out of band).

mod error;
pub use error::*;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tokio::sync::broadcast;

use super::actions::CommandAction;
use super::appliers::{EventAction, EventApplier};
use super::capacity;
use super::storage::{BookingStorage, StorageError};
use super::traits::{CommandContext, CommandHandler, CommandMetadata};
use crate::core::config::EnginePolicy;
use crate::services::{NotificationService, NotificationTemplate, PaymentGateway};
use crate::waitlist::WaitlistPromoter;
use shared::booking::records::{BookingModification, BookingRecord};
use shared::booking::{
    Actor, BookingCommand, BookingCommandPayload, BookingEvent, CommandResponse, EventPayload,
    InstanceStatus, ModificationType, RefundStatus,
};
use shared::error::{CommandError, CommandErrorCode};
use shared::util::now_millis;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Outcome of the transactional half of a command
enum Processed {
    Duplicate,
    Committed(Vec<BookingEvent>),
}

/// BookingsManager for command processing
///
/// The `epoch` field is a unique identifier generated on each startup;
/// clients use it to detect server restarts and resync.
pub struct BookingsManager {
    storage: BookingStorage,
    policy: EnginePolicy,
    event_tx: broadcast::Sender<BookingEvent>,
    payment: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationService>,
    promoter: Arc<WaitlistPromoter>,
    epoch: String,
}

impl std::fmt::Debug for BookingsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingsManager")
            .field("storage", &"<BookingStorage>")
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl BookingsManager {
    pub fn new(
        storage: BookingStorage,
        policy: EnginePolicy,
        payment: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationService>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let promoter = Arc::new(WaitlistPromoter::new(
            storage.clone(),
            notifier.clone(),
            event_tx.clone(),
            policy.clone(),
        ));
        let epoch = uuid::Uuid::new_v4().to_string();
        tracing::info!(epoch = %epoch, "BookingsManager started with new epoch");
        Self {
            storage,
            policy,
            event_tx,
            payment,
            notifier,
            promoter,
            epoch,
        }
    }

    /// Get the server epoch (unique instance ID)
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Subscribe to event broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.event_tx.subscribe()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &BookingStorage {
        &self.storage
    }

    /// The waitlist promoter (shared with the expiry scheduler)
    pub fn promoter(&self) -> Arc<WaitlistPromoter> {
        self.promoter.clone()
    }

    /// Derived availability status of an instance
    pub fn instance_status(&self, instance_id: &str) -> ManagerResult<Option<InstanceStatus>> {
        Ok(self.storage.get_instance(instance_id)?.map(|i| {
            capacity::derive_status(i.available_spots, i.capacity, self.policy.limited_threshold)
        }))
    }

    /// Audit trail for a booking, oldest first
    pub fn modifications_for_booking(
        &self,
        booking_id: &str,
    ) -> ManagerResult<Vec<BookingModification>> {
        Ok(self.storage.modifications_for_booking(booking_id)?)
    }

    // ========================================================================
    // Public operation surface
    // ========================================================================

    pub async fn modify_party_size(
        &self,
        actor: Actor,
        booking_id: impl Into<String>,
        new_party_size: i32,
    ) -> CommandResponse {
        self.execute_command(BookingCommand::new(
            actor,
            BookingCommandPayload::ModifyPartySize {
                booking_id: booking_id.into(),
                new_guest_count: new_party_size,
            },
        ))
        .await
    }

    pub async fn change_booking_date(
        &self,
        actor: Actor,
        booking_id: impl Into<String>,
        new_instance_id: impl Into<String>,
    ) -> CommandResponse {
        self.execute_command(BookingCommand::new(
            actor,
            BookingCommandPayload::ChangeBookingDate {
                booking_id: booking_id.into(),
                new_instance_id: new_instance_id.into(),
            },
        ))
        .await
    }

    pub async fn cancel_booking_with_refund(
        &self,
        actor: Actor,
        booking_id: impl Into<String>,
        reason: Option<String>,
    ) -> CommandResponse {
        self.execute_command(BookingCommand::new(
            actor,
            BookingCommandPayload::CancelBooking {
                booking_id: booking_id.into(),
                reason,
            },
        ))
        .await
    }

    pub async fn join_waitlist(
        &self,
        actor: Actor,
        offering_id: impl Into<String>,
        instance_id: impl Into<String>,
        party_size: i32,
    ) -> CommandResponse {
        self.execute_command(BookingCommand::new(
            actor,
            BookingCommandPayload::JoinWaitlist {
                offering_id: offering_id.into(),
                instance_id: instance_id.into(),
                party_size,
            },
        ))
        .await
    }

    pub async fn leave_waitlist(&self, actor: Actor, entry_id: impl Into<String>) -> CommandResponse {
        self.execute_command(BookingCommand::new(
            actor,
            BookingCommandPayload::LeaveWaitlist {
                entry_id: entry_id.into(),
            },
        ))
        .await
    }

    pub async fn claim_waitlist_spot(
        &self,
        actor: Actor,
        entry_id: impl Into<String>,
    ) -> CommandResponse {
        self.execute_command(BookingCommand::new(
            actor,
            BookingCommandPayload::ClaimWaitlistSpot {
                entry_id: entry_id.into(),
            },
        ))
        .await
    }

    pub async fn check_in_booking(
        &self,
        actor: Actor,
        booking_id: impl Into<String>,
        check_in_token: impl Into<String>,
    ) -> CommandResponse {
        self.execute_command(BookingCommand::new(
            actor,
            BookingCommandPayload::CheckInBooking {
                booking_id: booking_id.into(),
                check_in_token: check_in_token.into(),
            },
        ))
        .await
    }

    pub async fn mark_no_show(&self, actor: Actor, booking_id: impl Into<String>) -> CommandResponse {
        self.execute_command(BookingCommand::new(
            actor,
            BookingCommandPayload::MarkNoShow {
                booking_id: booking_id.into(),
            },
        ))
        .await
    }

    // ========================================================================
    // Command processing
    // ========================================================================

    /// Execute a command and return the response
    pub async fn execute_command(&self, cmd: BookingCommand) -> CommandResponse {
        match self.process_command(&cmd) {
            Ok(Processed::Duplicate) => {
                tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
                CommandResponse::duplicate(cmd.command_id)
            }
            Ok(Processed::Committed(events)) => {
                // Broadcast after successful commit
                for event in &events {
                    if self.event_tx.send(event.clone()).is_err() {
                        tracing::debug!("Event broadcast failed: no active receivers");
                        break;
                    }
                }
                self.run_side_effects(&cmd, &events).await
            }
            Err(err) => CommandResponse::error(cmd.command_id, err.into()),
        }
    }

    /// Transactional half: validate, apply, audit, commit.
    ///
    /// Transient storage errors are retried a bounded number of times;
    /// rule rejections are surfaced immediately.
    fn process_command(&self, cmd: &BookingCommand) -> ManagerResult<Processed> {
        tracing::debug!(command_id = %cmd.command_id, payload = ?cmd.payload, "Processing command");

        // Cheap pre-check before taking the write lock
        if self.storage.is_command_processed(&cmd.command_id)? {
            return Ok(Processed::Duplicate);
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_process(cmd) {
                Ok(processed) => return Ok(processed),
                Err(ManagerError::Storage(e)) if attempt < self.policy.max_txn_retries => {
                    tracing::warn!(
                        command_id = %cmd.command_id,
                        attempt,
                        error = %e,
                        "Transient storage error, retrying command"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_process(&self, cmd: &BookingCommand) -> ManagerResult<Processed> {
        let txn = self.storage.begin_write()?;

        // Double-check idempotency within the transaction
        if self.storage.is_command_processed_txn(&txn, &cmd.command_id)? {
            return Ok(Processed::Duplicate);
        }

        let current_sequence = self.storage.get_current_sequence()?;
        let mut ctx = CommandContext::new(&txn, &self.storage, &self.policy, current_sequence);
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            actor: cmd.actor.clone(),
            timestamp: cmd.timestamp,
        };

        let action = CommandAction::from(cmd);
        let events = futures::executor::block_on(action.execute(&mut ctx, &metadata))
            .map_err(ManagerError::from)?;

        for event in &events {
            EventAction::from(event)
                .apply(&txn, &self.storage, event)
                .map_err(ManagerError::from)?;
            if let Some(row) = audit_row_for_event(event, &metadata.actor) {
                self.storage.append_modification(&txn, &row)?;
            }
        }

        self.storage.set_sequence(&txn, ctx.sequence())?;
        self.storage.mark_command_processed(&txn, &cmd.command_id)?;
        txn.commit().map_err(StorageError::from)?;

        Ok(Processed::Committed(events))
    }

    // ========================================================================
    // Post-commit side effects
    // ========================================================================

    /// Payment, notification, and waitlist promotion after commit.
    ///
    /// None of these hold the capacity lock; a slow gateway only delays
    /// this command's response, never other transactions.
    async fn run_side_effects(
        &self,
        cmd: &BookingCommand,
        events: &[BookingEvent],
    ) -> CommandResponse {
        let mut response = CommandResponse::ok(cmd.command_id.clone());

        for event in events {
            match &event.payload {
                EventPayload::PartySizeChanged {
                    booking_id,
                    instance_id,
                    old_guest_count,
                    new_guest_count,
                    price_difference,
                    ..
                } => {
                    response = response
                        .with_booking_id(booking_id.clone())
                        .with_price_difference(*price_difference);
                    self.settle_price_difference(
                        booking_id,
                        event,
                        *price_difference,
                        &mut response,
                    )
                    .await;
                    if new_guest_count < old_guest_count {
                        self.signal_promotion(instance_id).await;
                    }
                    self.notify_owner(
                        booking_id,
                        NotificationTemplate::PartySizeChanged,
                        serde_json::json!({
                            "booking_id": booking_id,
                            "old_guest_count": old_guest_count,
                            "new_guest_count": new_guest_count,
                            "price_difference": price_difference,
                        }),
                    )
                    .await;
                }

                EventPayload::DateChanged {
                    booking_id,
                    old_instance_id,
                    new_instance_id,
                    price_difference,
                    ..
                } => {
                    response = response
                        .with_booking_id(booking_id.clone())
                        .with_price_difference(*price_difference);
                    self.settle_price_difference(
                        booking_id,
                        event,
                        *price_difference,
                        &mut response,
                    )
                    .await;
                    self.signal_promotion(old_instance_id).await;
                    self.notify_owner(
                        booking_id,
                        NotificationTemplate::BookingDateChanged,
                        serde_json::json!({
                            "booking_id": booking_id,
                            "new_instance_id": new_instance_id,
                            "price_difference": price_difference,
                        }),
                    )
                    .await;
                }

                EventPayload::BookingCancelled {
                    booking_id,
                    instance_id,
                    refund_amount,
                    ..
                } => {
                    response = response
                        .with_booking_id(booking_id.clone())
                        .with_refund_amount(*refund_amount);
                    if *refund_amount > 0.0 {
                        self.issue_refund(booking_id, event.sequence, *refund_amount, &mut response)
                            .await;
                    }
                    self.signal_promotion(instance_id).await;
                    self.notify_owner(
                        booking_id,
                        NotificationTemplate::BookingCancelled,
                        serde_json::json!({
                            "booking_id": booking_id,
                            "refund_amount": refund_amount,
                        }),
                    )
                    .await;
                }

                EventPayload::BookingCheckedIn { booking_id, .. }
                | EventPayload::BookingNoShow { booking_id, .. } => {
                    response = response.with_booking_id(booking_id.clone());
                }

                EventPayload::WaitlistJoined {
                    entry_id,
                    instance_id,
                    position,
                    ..
                } => {
                    response = response.with_waitlist_position(*position);
                    self.notifier
                        .send(
                            &event.actor_id,
                            NotificationTemplate::WaitlistJoined,
                            serde_json::json!({
                                "entry_id": entry_id,
                                "instance_id": instance_id,
                                "position": position,
                            }),
                        )
                        .await;
                }

                EventPayload::WaitlistLeft {
                    instance_id,
                    was_notified,
                    ..
                } => {
                    // An abandoned claim window frees the offer for the next in line
                    if *was_notified {
                        self.signal_promotion(instance_id).await;
                    }
                }

                EventPayload::WaitlistClaimed {
                    booking_id,
                    instance_id,
                    ..
                } => {
                    response = response.with_booking_id(booking_id.clone());
                    self.notifier
                        .send(
                            &event.actor_id,
                            NotificationTemplate::WaitlistSpotClaimed,
                            serde_json::json!({
                                "booking_id": booking_id,
                                "instance_id": instance_id,
                            }),
                        )
                        .await;
                }

                EventPayload::WaitlistNotified { .. } | EventPayload::WaitlistExpired { .. } => {}
            }
        }

        response
    }

    /// Charge or refund a committed price difference.
    ///
    /// A failed charge surfaces `PaymentFailed`; the committed change is
    /// not reverted. A failed refund stays PENDING on the audit row for
    /// the settlement worker.
    async fn settle_price_difference(
        &self,
        booking_id: &str,
        event: &BookingEvent,
        price_difference: f64,
        response: &mut CommandResponse,
    ) {
        if price_difference == 0.0 {
            return;
        }

        let Some(booking) = self.load_booking_for_side_effect(booking_id) else {
            return;
        };

        if price_difference > 0.0 {
            let result = self
                .payment
                .charge(
                    &booking.owner_id,
                    price_difference,
                    serde_json::json!({
                        "booking_id": booking_id,
                        "command_id": event.command_id,
                    }),
                )
                .await;
            if let Err(e) = result {
                tracing::error!(
                    booking_id = %booking_id,
                    amount = price_difference,
                    error = %e,
                    "Charge failed after committed modification"
                );
                response.success = false;
                response.payment_pending = true;
                response.error = Some(CommandError::new(
                    CommandErrorCode::PaymentFailed,
                    format!("charge of {:.2} failed: {}", price_difference, e),
                ));
            }
        } else {
            let amount = -price_difference;
            match self.payment.partial_refund(&booking.payment_ref, amount).await {
                Ok(()) => {
                    if let Err(e) = self.settle_refund(booking_id, event.sequence) {
                        tracing::error!(booking_id = %booking_id, error = %e, "Failed to mark refund settled");
                    }
                }
                Err(e) => {
                    // The audit row stays PENDING; the refund worker retries
                    tracing::warn!(
                        booking_id = %booking_id,
                        amount,
                        error = %e,
                        "Refund failed, left pending for settlement worker"
                    );
                    response.payment_pending = true;
                }
            }
        }
    }

    /// Issue a cancellation refund and settle its audit row on success
    async fn issue_refund(
        &self,
        booking_id: &str,
        sequence: u64,
        amount: f64,
        response: &mut CommandResponse,
    ) {
        let Some(booking) = self.load_booking_for_side_effect(booking_id) else {
            return;
        };
        match self.payment.partial_refund(&booking.payment_ref, amount).await {
            Ok(()) => {
                if let Err(e) = self.settle_refund(booking_id, sequence) {
                    tracing::error!(booking_id = %booking_id, error = %e, "Failed to mark refund settled");
                }
            }
            Err(e) => {
                tracing::warn!(
                    booking_id = %booking_id,
                    amount,
                    error = %e,
                    "Refund failed, left pending for settlement worker"
                );
                response.payment_pending = true;
            }
        }
    }

    /// Flip an audit row's refund to COMPLETED
    fn settle_refund(&self, booking_id: &str, sequence: u64) -> ManagerResult<()> {
        let txn = self.storage.begin_write()?;
        if let Some(mut row) = self.storage.get_modification_txn(&txn, booking_id, sequence)? {
            row.refund_status = Some(RefundStatus::Completed);
            row.refunded_at = Some(now_millis());
            self.storage.update_modification(&txn, &row)?;
        }
        txn.commit().map_err(StorageError::from)?;
        Ok(())
    }

    async fn signal_promotion(&self, instance_id: &str) {
        if let Err(e) = self.promoter.promote_next(instance_id).await {
            tracing::error!(instance_id = %instance_id, error = %e, "Waitlist promotion failed");
        }
    }

    async fn notify_owner(
        &self,
        booking_id: &str,
        template: NotificationTemplate,
        data: serde_json::Value,
    ) {
        if let Some(booking) = self.load_booking_for_side_effect(booking_id) {
            self.notifier.send(&booking.owner_id, template, data).await;
        }
    }

    fn load_booking_for_side_effect(&self, booking_id: &str) -> Option<BookingRecord> {
        match self.storage.get_booking(booking_id) {
            Ok(Some(booking)) => Some(booking),
            Ok(None) => {
                tracing::error!(booking_id = %booking_id, "Booking vanished after commit");
                None
            }
            Err(e) => {
                tracing::error!(booking_id = %booking_id, error = %e, "Failed to load booking for side effect");
                None
            }
        }
    }
}

/// Build the audit row for an event, if its type is audited.
///
/// Each modification attempt that reaches the commit point appends
/// exactly one row; waitlist transitions live on the entries themselves.
fn audit_row_for_event(event: &BookingEvent, actor: &Actor) -> Option<BookingModification> {
    let row = match &event.payload {
        EventPayload::PartySizeChanged {
            booking_id,
            old_guest_count,
            new_guest_count,
            price_difference,
            ..
        } => {
            let modification_type = if new_guest_count > old_guest_count {
                ModificationType::PartySizeIncrease
            } else {
                ModificationType::PartySizeDecrease
            };
            let refund_amount = (*price_difference < 0.0).then_some(-price_difference);
            BookingModification {
                modification_id: uuid::Uuid::new_v4().to_string(),
                sequence: event.sequence,
                booking_id: booking_id.clone(),
                modification_type,
                old_value: serde_json::json!(old_guest_count),
                new_value: serde_json::json!(new_guest_count),
                reason: None,
                refund_amount,
                refund_status: refund_amount.map(|_| RefundStatus::Pending),
                refunded_at: None,
                refund_attempts: 0,
                modified_by: actor.id.clone(),
                created_at: event.timestamp,
            }
        }

        EventPayload::DateChanged {
            booking_id,
            old_instance_id,
            new_instance_id,
            price_difference,
            ..
        } => {
            let refund_amount = (*price_difference < 0.0).then_some(-price_difference);
            BookingModification {
                modification_id: uuid::Uuid::new_v4().to_string(),
                sequence: event.sequence,
                booking_id: booking_id.clone(),
                modification_type: ModificationType::DateChange,
                old_value: serde_json::json!(old_instance_id),
                new_value: serde_json::json!(new_instance_id),
                reason: None,
                refund_amount,
                refund_status: refund_amount.map(|_| RefundStatus::Pending),
                refunded_at: None,
                refund_attempts: 0,
                modified_by: actor.id.clone(),
                created_at: event.timestamp,
            }
        }

        EventPayload::BookingCancelled {
            booking_id,
            reason,
            refund_amount,
            ..
        } => BookingModification {
            modification_id: uuid::Uuid::new_v4().to_string(),
            sequence: event.sequence,
            booking_id: booking_id.clone(),
            modification_type: ModificationType::Cancellation,
            old_value: serde_json::json!("CONFIRMED"),
            new_value: serde_json::json!("CANCELLED"),
            reason: reason.clone(),
            refund_amount: Some(*refund_amount),
            refund_status: (*refund_amount > 0.0).then_some(RefundStatus::Pending),
            refunded_at: None,
            refund_attempts: 0,
            modified_by: actor.id.clone(),
            created_at: event.timestamp,
        },

        _ => return None,
    };
    Some(row)
}
