//! Persisted records: offerings, instances, bookings, audit rows, waitlist

use super::types::{
    BookingStatus, CancellationPolicy, ModificationType, RefundStatus, WaitlistStatus,
};
use serde::{Deserialize, Serialize};

/// A sellable offering (event series, class, restaurant seating)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfferingRecord {
    pub offering_id: String,
    pub name: String,
    /// Per-person price unless the instance overrides it
    pub base_price: f64,
    pub cancellation_policy: CancellationPolicy,
}

/// One bookable occurrence of an offering, with its own capacity counter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceRecord {
    pub instance_id: String,
    pub offering_id: String,
    /// Event start (Unix millis)
    pub start_time: i64,
    /// Immutable per instance
    pub capacity: i32,
    /// 0..=capacity; mutated only by the capacity ledger
    pub available_spots: i32,
    /// Per-person price override for this occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_override: Option<f64>,
}

impl InstanceRecord {
    /// Per-person price: the instance override, else the offering base price
    pub fn price_per_person(&self, offering: &OfferingRecord) -> f64 {
        self.price_override.unwrap_or(offering.base_price)
    }
}

/// A guest's reservation against one instance
///
/// Never deleted; cancellation is a status transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingRecord {
    pub booking_id: String,
    pub offering_id: String,
    /// Reassignable only via date change
    pub instance_id: String,
    /// The authenticated guest who owns this booking
    pub owner_id: String,
    pub guest_count: i32,
    pub base_amount: f64,
    pub total_amount: f64,
    pub status: BookingStatus,
    /// Reference handed to the payment gateway for refunds
    pub payment_ref: String,
    /// QR check-in token, regenerated on date change
    pub check_in_token: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<i64>,
}

/// Immutable audit row, one per modification attempt that reaches commit
///
/// Only `refund_status` / `refunded_at` / `refund_attempts` are ever
/// updated after append, when the asynchronous refund side effect settles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingModification {
    pub modification_id: String,
    /// Global sequence of the event that produced this row
    pub sequence: u64,
    pub booking_id: String,
    pub modification_type: ModificationType,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_status: Option<RefundStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<i64>,
    /// Settlement attempts made by the refund worker
    #[serde(default)]
    pub refund_attempts: u32,
    pub modified_by: String,
    pub created_at: i64,
}

/// Waitlist entry, FIFO by `joined_at` per (offering, instance)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitlistEntry {
    pub entry_id: String,
    pub offering_id: String,
    pub instance_id: String,
    pub owner_id: String,
    pub party_size: i32,
    pub status: WaitlistStatus,
    pub joined_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notified_at: Option<i64>,
}
