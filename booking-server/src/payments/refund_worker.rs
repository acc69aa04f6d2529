//! Refund settlement worker
//!
//! Audit rows keep `refund_status = PENDING` when the post-commit refund
//! call fails. This worker sweeps those rows on an interval, re-issues
//! the refund, and marks the row COMPLETED on success. Rows that exhaust
//! their attempt budget are logged and skipped; the PENDING state stays
//! on the row as the reconciliation trail.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::bookings::storage::{BookingStorage, StorageError};
use crate::services::PaymentGateway;
use shared::booking::records::BookingModification;
use shared::booking::RefundStatus;
use shared::util::now_millis;

pub struct RefundWorker {
    storage: BookingStorage,
    payment: Arc<dyn PaymentGateway>,
    max_attempts: u32,
    sweep_interval: Duration,
    shutdown: CancellationToken,
}

impl RefundWorker {
    pub fn new(
        storage: BookingStorage,
        payment: Arc<dyn PaymentGateway>,
        max_attempts: u32,
        sweep_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            storage,
            payment,
            max_attempts,
            sweep_interval,
            shutdown,
        }
    }

    /// Main loop: settle pending refunds left over from a previous run,
    /// then sweep on an interval
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Refund worker started"
        );

        if let Err(e) = self.sweep_once().await {
            tracing::error!(error = %e, "Startup refund sweep failed");
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Refund worker received shutdown signal");
                    return;
                }
            }

            if let Err(e) = self.sweep_once().await {
                tracing::error!(error = %e, "Refund sweep failed");
            }
        }
    }

    /// One sweep over pending refunds. Returns how many settled.
    pub async fn sweep_once(&self) -> Result<usize, StorageError> {
        let pending = self.storage.pending_refunds(self.max_attempts)?;
        if pending.is_empty() {
            return Ok(0);
        }

        let mut settled = 0usize;
        for row in pending {
            if self.settle_row(&row).await? {
                settled += 1;
            }
        }
        Ok(settled)
    }

    async fn settle_row(&self, row: &BookingModification) -> Result<bool, StorageError> {
        let Some(amount) = row.refund_amount else {
            return Ok(false);
        };
        let Some(booking) = self.storage.get_booking(&row.booking_id)? else {
            tracing::error!(booking_id = %row.booking_id, "Pending refund for unknown booking");
            return Ok(false);
        };

        match self.payment.partial_refund(&booking.payment_ref, amount).await {
            Ok(()) => {
                let txn = self.storage.begin_write()?;
                if let Some(mut current) =
                    self.storage.get_modification_txn(&txn, &row.booking_id, row.sequence)?
                {
                    // Another settler may have beaten us to it
                    if current.refund_status != Some(RefundStatus::Pending) {
                        return Ok(false);
                    }
                    current.refund_status = Some(RefundStatus::Completed);
                    current.refunded_at = Some(now_millis());
                    current.refund_attempts += 1;
                    self.storage.update_modification(&txn, &current)?;
                }
                txn.commit()?;
                tracing::info!(
                    booking_id = %row.booking_id,
                    amount,
                    "Pending refund settled"
                );
                Ok(true)
            }
            Err(e) => {
                let txn = self.storage.begin_write()?;
                if let Some(mut current) =
                    self.storage.get_modification_txn(&txn, &row.booking_id, row.sequence)?
                {
                    current.refund_attempts += 1;
                    let attempts = current.refund_attempts;
                    self.storage.update_modification(&txn, &current)?;
                    txn.commit()?;
                    if attempts >= self.max_attempts {
                        tracing::error!(
                            booking_id = %row.booking_id,
                            amount,
                            attempts,
                            error = %e,
                            "Refund exhausted retry budget, left PENDING for reconciliation"
                        );
                    } else {
                        tracing::warn!(
                            booking_id = %row.booking_id,
                            amount,
                            attempts,
                            error = %e,
                            "Refund attempt failed, will retry"
                        );
                    }
                }
                Ok(false)
            }
        }
    }
}
