//! Waitlist promotion engine
//!
//! - **promoter**: offers a freed spot to the FIFO head of the queue
//! - **expiry_scheduler**: durable claim-window expiry driving the
//!   re-notify cascade
//!
//! Promotion state lives entirely in redb, so a restart never loses an
//! outstanding claim window: the scheduler's first sweep picks up where
//! the previous process stopped.

pub mod expiry_scheduler;
pub mod promoter;

pub use expiry_scheduler::ClaimExpiryScheduler;
pub use promoter::WaitlistPromoter;
