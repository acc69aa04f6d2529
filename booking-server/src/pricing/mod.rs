//! Pricing and refund computation

pub mod refund;

pub use refund::{calculate_refund, RefundSchedule};
