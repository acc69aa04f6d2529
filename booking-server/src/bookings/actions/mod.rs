//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific command type.

use async_trait::async_trait;

use crate::bookings::traits::{BookingError, CommandContext, CommandHandler, CommandMetadata};
use shared::booking::{BookingCommand, BookingCommandPayload, BookingEvent};

mod cancel_booking;
mod change_date;
mod check_in;
mod claim_spot;
mod join_waitlist;
mod leave_waitlist;
mod mark_no_show;
mod modify_party_size;

pub use cancel_booking::CancelBookingAction;
pub use change_date::ChangeBookingDateAction;
pub use check_in::CheckInBookingAction;
pub use claim_spot::ClaimWaitlistSpotAction;
pub use join_waitlist::JoinWaitlistAction;
pub use leave_waitlist::LeaveWaitlistAction;
pub use mark_no_show::MarkNoShowAction;
pub use modify_party_size::ModifyPartySizeAction;

/// CommandAction enum - dispatches to concrete action implementations
pub enum CommandAction {
    ModifyPartySize(ModifyPartySizeAction),
    ChangeBookingDate(ChangeBookingDateAction),
    CancelBooking(CancelBookingAction),
    CheckInBooking(CheckInBookingAction),
    MarkNoShow(MarkNoShowAction),
    JoinWaitlist(JoinWaitlistAction),
    LeaveWaitlist(LeaveWaitlistAction),
    ClaimWaitlistSpot(ClaimWaitlistSpotAction),
}

#[async_trait]
impl CommandHandler for CommandAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        match self {
            CommandAction::ModifyPartySize(action) => action.execute(ctx, metadata).await,
            CommandAction::ChangeBookingDate(action) => action.execute(ctx, metadata).await,
            CommandAction::CancelBooking(action) => action.execute(ctx, metadata).await,
            CommandAction::CheckInBooking(action) => action.execute(ctx, metadata).await,
            CommandAction::MarkNoShow(action) => action.execute(ctx, metadata).await,
            CommandAction::JoinWaitlist(action) => action.execute(ctx, metadata).await,
            CommandAction::LeaveWaitlist(action) => action.execute(ctx, metadata).await,
            CommandAction::ClaimWaitlistSpot(action) => action.execute(ctx, metadata).await,
        }
    }
}

/// Convert BookingCommand to CommandAction
///
/// This is the ONLY place with a match on BookingCommandPayload.
impl From<&BookingCommand> for CommandAction {
    fn from(cmd: &BookingCommand) -> Self {
        match &cmd.payload {
            BookingCommandPayload::ModifyPartySize {
                booking_id,
                new_guest_count,
            } => CommandAction::ModifyPartySize(ModifyPartySizeAction {
                booking_id: booking_id.clone(),
                new_guest_count: *new_guest_count,
            }),
            BookingCommandPayload::ChangeBookingDate {
                booking_id,
                new_instance_id,
            } => CommandAction::ChangeBookingDate(ChangeBookingDateAction {
                booking_id: booking_id.clone(),
                new_instance_id: new_instance_id.clone(),
            }),
            BookingCommandPayload::CancelBooking { booking_id, reason } => {
                CommandAction::CancelBooking(CancelBookingAction {
                    booking_id: booking_id.clone(),
                    reason: reason.clone(),
                })
            }
            BookingCommandPayload::CheckInBooking {
                booking_id,
                check_in_token,
            } => CommandAction::CheckInBooking(CheckInBookingAction {
                booking_id: booking_id.clone(),
                check_in_token: check_in_token.clone(),
            }),
            BookingCommandPayload::MarkNoShow { booking_id } => {
                CommandAction::MarkNoShow(MarkNoShowAction {
                    booking_id: booking_id.clone(),
                })
            }
            BookingCommandPayload::JoinWaitlist {
                offering_id,
                instance_id,
                party_size,
            } => CommandAction::JoinWaitlist(JoinWaitlistAction {
                offering_id: offering_id.clone(),
                instance_id: instance_id.clone(),
                party_size: *party_size,
            }),
            BookingCommandPayload::LeaveWaitlist { entry_id } => {
                CommandAction::LeaveWaitlist(LeaveWaitlistAction {
                    entry_id: entry_id.clone(),
                })
            }
            BookingCommandPayload::ClaimWaitlistSpot { entry_id } => {
                CommandAction::ClaimWaitlistSpot(ClaimWaitlistSpotAction {
                    entry_id: entry_id.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for action tests

    use crate::bookings::storage::BookingStorage;
    use crate::core::config::EnginePolicy;
    use shared::booking::records::{
        BookingRecord, InstanceRecord, OfferingRecord, WaitlistEntry,
    };
    use shared::booking::{Actor, ActorRole, BookingStatus, CancellationPolicy, WaitlistStatus};
    use shared::util::{now_millis, HOUR_MILLIS};

    use super::CommandMetadata;

    pub fn test_metadata(actor: Actor) -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            actor,
            timestamp: now_millis(),
        }
    }

    pub fn guest(id: &str) -> Actor {
        Actor {
            id: id.to_string(),
            name: format!("Guest {}", id),
            role: ActorRole::Guest,
        }
    }

    pub fn host() -> Actor {
        Actor {
            id: "host-1".to_string(),
            name: "Host".to_string(),
            role: ActorRole::Host,
        }
    }

    pub fn test_policy() -> EnginePolicy {
        EnginePolicy::default()
    }

    pub fn offering(policy: CancellationPolicy) -> OfferingRecord {
        OfferingRecord {
            offering_id: "off-1".to_string(),
            name: "Sunset Kayak Tour".to_string(),
            base_price: 25.0,
            cancellation_policy: policy,
        }
    }

    /// Instance starting `hours_out` hours from now
    pub fn instance(instance_id: &str, capacity: i32, available: i32, hours_out: i64) -> InstanceRecord {
        InstanceRecord {
            instance_id: instance_id.to_string(),
            offering_id: "off-1".to_string(),
            start_time: now_millis() + hours_out * HOUR_MILLIS,
            capacity,
            available_spots: available,
            price_override: None,
        }
    }

    pub fn confirmed_booking(booking_id: &str, instance_id: &str, owner: &str, guest_count: i32) -> BookingRecord {
        let now = now_millis();
        BookingRecord {
            booking_id: booking_id.to_string(),
            offering_id: "off-1".to_string(),
            instance_id: instance_id.to_string(),
            owner_id: owner.to_string(),
            guest_count,
            base_amount: 25.0 * guest_count as f64,
            total_amount: 25.0 * guest_count as f64,
            status: BookingStatus::Confirmed,
            payment_ref: format!("pay-{}", booking_id),
            check_in_token: format!("tok-{}", booking_id),
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        }
    }

    pub fn waitlist_entry(
        entry_id: &str,
        instance_id: &str,
        owner: &str,
        party_size: i32,
        status: WaitlistStatus,
    ) -> WaitlistEntry {
        WaitlistEntry {
            entry_id: entry_id.to_string(),
            offering_id: "off-1".to_string(),
            instance_id: instance_id.to_string(),
            owner_id: owner.to_string(),
            party_size,
            status,
            joined_at: now_millis(),
            notified_at: None,
        }
    }

    /// Seed an offering/instance/booking set in one transaction
    pub fn seed(
        storage: &BookingStorage,
        offering: &OfferingRecord,
        instances: &[InstanceRecord],
        bookings: &[BookingRecord],
    ) {
        let txn = storage.begin_write().unwrap();
        storage.store_offering(&txn, offering).unwrap();
        for inst in instances {
            storage.store_instance(&txn, inst).unwrap();
        }
        for booking in bookings {
            storage.store_booking(&txn, booking).unwrap();
        }
        txn.commit().unwrap();
    }
}
