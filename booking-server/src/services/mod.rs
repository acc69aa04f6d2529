//! External collaborator interfaces
//!
//! The engine consumes a payment gateway and a notification service; both
//! are traits so the core stays testable without either.

pub mod notification;
pub mod payment;

pub use notification::{
    LogNotificationService, MockNotificationService, NotificationService, NotificationTemplate,
};
pub use payment::{
    ChargeReceipt, GatewayError, LogPaymentGateway, MockPaymentGateway, PaymentGateway,
};
