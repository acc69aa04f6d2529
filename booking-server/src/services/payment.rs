//! Payment gateway interface
//!
//! Charges and refunds run strictly after the booking transaction
//! commits, so a slow gateway never holds a capacity lock. The engine
//! makes no retry/idempotency assumptions about the gateway beyond what
//! the refund worker adds on top.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// Gateway call failures
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}

/// Successful charge result
#[derive(Debug, Clone)]
pub struct ChargeReceipt {
    pub charge_id: String,
}

/// Payment gateway contract
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge a customer; `metadata` travels to the gateway for
    /// reconciliation
    async fn charge(
        &self,
        customer_ref: &str,
        amount: f64,
        metadata: serde_json::Value,
    ) -> Result<ChargeReceipt, GatewayError>;

    /// Refund part of a prior payment
    async fn partial_refund(&self, payment_ref: &str, amount: f64) -> Result<(), GatewayError>;
}

/// Gateway that approves everything and logs the instruction.
///
/// Default wiring for development environments without a real processor.
pub struct LogPaymentGateway;

#[async_trait]
impl PaymentGateway for LogPaymentGateway {
    async fn charge(
        &self,
        customer_ref: &str,
        amount: f64,
        metadata: serde_json::Value,
    ) -> Result<ChargeReceipt, GatewayError> {
        let charge_id = format!("chg-{}", uuid::Uuid::new_v4());
        tracing::info!(%customer_ref, amount, %charge_id, %metadata, "Charge approved (log gateway)");
        Ok(ChargeReceipt { charge_id })
    }

    async fn partial_refund(&self, payment_ref: &str, amount: f64) -> Result<(), GatewayError> {
        tracing::info!(%payment_ref, amount, "Refund issued (log gateway)");
        Ok(())
    }
}

/// Scriptable gateway for tests: flips between approving and failing,
/// recording every call.
#[derive(Default)]
pub struct MockPaymentGateway {
    fail_charges: AtomicBool,
    fail_refunds: AtomicBool,
    charges: Mutex<Vec<(String, f64)>>,
    refunds: Mutex<Vec<(String, f64)>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_charges(&self, fail: bool) {
        self.fail_charges.store(fail, Ordering::SeqCst);
    }

    pub fn fail_refunds(&self, fail: bool) {
        self.fail_refunds.store(fail, Ordering::SeqCst);
    }

    pub fn charges(&self) -> Vec<(String, f64)> {
        self.charges.lock().expect("mock lock poisoned").clone()
    }

    pub fn refunds(&self) -> Vec<(String, f64)> {
        self.refunds.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn charge(
        &self,
        customer_ref: &str,
        amount: f64,
        _metadata: serde_json::Value,
    ) -> Result<ChargeReceipt, GatewayError> {
        if self.fail_charges.load(Ordering::SeqCst) {
            return Err(GatewayError::Declined("card declined".to_string()));
        }
        self.charges
            .lock()
            .expect("mock lock poisoned")
            .push((customer_ref.to_string(), amount));
        Ok(ChargeReceipt {
            charge_id: format!("chg-{}", uuid::Uuid::new_v4()),
        })
    }

    async fn partial_refund(&self, payment_ref: &str, amount: f64) -> Result<(), GatewayError> {
        if self.fail_refunds.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("gateway timeout".to_string()));
        }
        self.refunds
            .lock()
            .expect("mock lock poisoned")
            .push((payment_ref.to_string(), amount));
        Ok(())
    }
}
