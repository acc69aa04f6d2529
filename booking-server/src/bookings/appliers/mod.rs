//! Event applier implementations
//!
//! Each applier mutates the stored records for one event type, inside the
//! same write transaction that produced the event. Appliers are the only
//! writers of booking/instance/waitlist state besides seeding; every
//! `available_spots` change goes through the capacity ledger.

use redb::WriteTransaction;

use crate::bookings::storage::BookingStorage;
use crate::bookings::traits::BookingError;
use shared::booking::{BookingEvent, EventPayload};

mod booking_cancelled;
mod booking_checked_in;
mod booking_no_show;
mod date_changed;
mod party_size_changed;
mod waitlist_claimed;
mod waitlist_expired;
mod waitlist_joined;
mod waitlist_left;
mod waitlist_notified;

pub use booking_cancelled::BookingCancelledApplier;
pub use booking_checked_in::BookingCheckedInApplier;
pub use booking_no_show::BookingNoShowApplier;
pub use date_changed::DateChangedApplier;
pub use party_size_changed::PartySizeChangedApplier;
pub use waitlist_claimed::WaitlistClaimedApplier;
pub use waitlist_expired::WaitlistExpiredApplier;
pub use waitlist_joined::WaitlistJoinedApplier;
pub use waitlist_left::WaitlistLeftApplier;
pub use waitlist_notified::WaitlistNotifiedApplier;

/// Event applier - applies one event type to the stored records
pub trait EventApplier {
    fn apply(
        &self,
        txn: &WriteTransaction,
        storage: &BookingStorage,
        event: &BookingEvent,
    ) -> Result<(), BookingError>;
}

/// EventAction enum - dispatches to concrete applier implementations
pub enum EventAction {
    PartySizeChanged(PartySizeChangedApplier),
    DateChanged(DateChangedApplier),
    BookingCancelled(BookingCancelledApplier),
    BookingCheckedIn(BookingCheckedInApplier),
    BookingNoShow(BookingNoShowApplier),
    WaitlistJoined(WaitlistJoinedApplier),
    WaitlistLeft(WaitlistLeftApplier),
    WaitlistNotified(WaitlistNotifiedApplier),
    WaitlistClaimed(WaitlistClaimedApplier),
    WaitlistExpired(WaitlistExpiredApplier),
}

impl EventApplier for EventAction {
    fn apply(
        &self,
        txn: &WriteTransaction,
        storage: &BookingStorage,
        event: &BookingEvent,
    ) -> Result<(), BookingError> {
        match self {
            EventAction::PartySizeChanged(a) => a.apply(txn, storage, event),
            EventAction::DateChanged(a) => a.apply(txn, storage, event),
            EventAction::BookingCancelled(a) => a.apply(txn, storage, event),
            EventAction::BookingCheckedIn(a) => a.apply(txn, storage, event),
            EventAction::BookingNoShow(a) => a.apply(txn, storage, event),
            EventAction::WaitlistJoined(a) => a.apply(txn, storage, event),
            EventAction::WaitlistLeft(a) => a.apply(txn, storage, event),
            EventAction::WaitlistNotified(a) => a.apply(txn, storage, event),
            EventAction::WaitlistClaimed(a) => a.apply(txn, storage, event),
            EventAction::WaitlistExpired(a) => a.apply(txn, storage, event),
        }
    }
}

/// Convert BookingEvent reference to EventAction
///
/// This is the ONLY place with a match on EventPayload.
impl From<&BookingEvent> for EventAction {
    fn from(event: &BookingEvent) -> Self {
        match &event.payload {
            EventPayload::PartySizeChanged { .. } => {
                EventAction::PartySizeChanged(PartySizeChangedApplier)
            }
            EventPayload::DateChanged { .. } => EventAction::DateChanged(DateChangedApplier),
            EventPayload::BookingCancelled { .. } => {
                EventAction::BookingCancelled(BookingCancelledApplier)
            }
            EventPayload::BookingCheckedIn { .. } => {
                EventAction::BookingCheckedIn(BookingCheckedInApplier)
            }
            EventPayload::BookingNoShow { .. } => EventAction::BookingNoShow(BookingNoShowApplier),
            EventPayload::WaitlistJoined { .. } => {
                EventAction::WaitlistJoined(WaitlistJoinedApplier)
            }
            EventPayload::WaitlistLeft { .. } => EventAction::WaitlistLeft(WaitlistLeftApplier),
            EventPayload::WaitlistNotified { .. } => {
                EventAction::WaitlistNotified(WaitlistNotifiedApplier)
            }
            EventPayload::WaitlistClaimed { .. } => {
                EventAction::WaitlistClaimed(WaitlistClaimedApplier)
            }
            EventPayload::WaitlistExpired { .. } => {
                EventAction::WaitlistExpired(WaitlistExpiredApplier)
            }
        }
    }
}

/// Load a booking and verify its lifecycle transition before mutation
pub(crate) fn transition_booking(
    txn: &WriteTransaction,
    storage: &BookingStorage,
    booking_id: &str,
    next: shared::BookingStatus,
) -> Result<shared::booking::records::BookingRecord, BookingError> {
    let mut booking = storage
        .get_booking_txn(txn, booking_id)?
        .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))?;
    if !booking.status.can_transition_to(next) {
        return Err(BookingError::InvalidState {
            booking_id: booking.booking_id.clone(),
            status: booking.status,
        });
    }
    booking.status = next;
    booking.updated_at = shared::util::now_millis();
    Ok(booking)
}
