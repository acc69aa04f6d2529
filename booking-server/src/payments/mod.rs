//! Payment settlement workers

pub mod refund_worker;

pub use refund_worker::RefundWorker;
