//! Status enums and the booking state machine

use serde::{Deserialize, Serialize};

// ============================================================================
// Booking Lifecycle
// ============================================================================

/// Booking status
///
/// `PENDING_PAYMENT → CONFIRMED → {CHECKED_IN → COMPLETED} | CANCELLED | NO_SHOW`
///
/// `can_transition_to` is the single source of truth for legal transitions;
/// every status change in the engine goes through it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[default]
    PendingPayment,
    Confirmed,
    CheckedIn,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    /// Whether `self → next` is a legal lifecycle transition
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        match self {
            PendingPayment => matches!(next, Confirmed | Cancelled),
            Confirmed => matches!(next, CheckedIn | Completed | Cancelled | NoShow),
            CheckedIn => matches!(next, Completed),
            Completed | Cancelled | NoShow => false,
        }
    }

    /// Terminal states never transition again
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }

    /// Whether a booking in this status holds spots on its instance.
    ///
    /// The capacity invariant sums guest counts over exactly this set:
    /// `available_spots + Σ guest_count(counting bookings) == capacity`.
    pub fn counts_against_capacity(self) -> bool {
        matches!(
            self,
            BookingStatus::Confirmed | BookingStatus::CheckedIn | BookingStatus::Completed
        )
    }
}

// ============================================================================
// Cancellation Policy
// ============================================================================

/// Refund policy attached to an offering
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancellationPolicy {
    /// Full refund until 24h before the event
    #[default]
    Flexible,
    /// Full refund until 7 days out, 50% until 24h
    Moderate,
    /// Full refund until 14 days out, nothing after
    Strict,
}

// ============================================================================
// Instance Status
// ============================================================================

/// Derived availability status of an instance
///
/// Recomputed on read from `available_spots` / `capacity`; never stored
/// as source of truth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Available,
    Limited,
    SoldOut,
}

// ============================================================================
// Modification Audit
// ============================================================================

/// Kind of booking modification, recorded on each audit row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModificationType {
    PartySizeIncrease,
    PartySizeDecrease,
    DateChange,
    Cancellation,
}

/// Settlement state of a refund attached to an audit row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Pending,
    Completed,
}

// ============================================================================
// Waitlist
// ============================================================================

/// Waitlist entry status
///
/// `ACTIVE → NOTIFIED → {CLAIMED | EXPIRED}`; the guest may cancel an
/// ACTIVE or NOTIFIED entry at any point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaitlistStatus {
    #[default]
    Active,
    Notified,
    Claimed,
    Expired,
    Cancelled,
}

impl WaitlistStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WaitlistStatus::Claimed | WaitlistStatus::Expired | WaitlistStatus::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_happy_path() {
        use BookingStatus::*;
        assert!(PendingPayment.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(CheckedIn));
        assert!(CheckedIn.can_transition_to(Completed));
    }

    #[test]
    fn test_lifecycle_cancellation_and_no_show() {
        use BookingStatus::*;
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(NoShow));
        assert!(PendingPayment.can_transition_to(Cancelled));
        assert!(!CheckedIn.can_transition_to(Cancelled));
        assert!(!CheckedIn.can_transition_to(NoShow));
    }

    #[test]
    fn test_terminal_states_never_transition() {
        use BookingStatus::*;
        for terminal in [Completed, Cancelled, NoShow] {
            assert!(terminal.is_terminal());
            for next in [PendingPayment, Confirmed, CheckedIn, Completed, Cancelled, NoShow] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_capacity_counting_set() {
        use BookingStatus::*;
        assert!(Confirmed.counts_against_capacity());
        assert!(CheckedIn.counts_against_capacity());
        assert!(Completed.counts_against_capacity());
        assert!(!PendingPayment.counts_against_capacity());
        assert!(!Cancelled.counts_against_capacity());
        assert!(!NoShow.counts_against_capacity());
    }

    #[test]
    fn test_waitlist_terminal_states() {
        assert!(!WaitlistStatus::Active.is_terminal());
        assert!(!WaitlistStatus::Notified.is_terminal());
        assert!(WaitlistStatus::Claimed.is_terminal());
        assert!(WaitlistStatus::Expired.is_terminal());
        assert!(WaitlistStatus::Cancelled.is_terminal());
    }
}
