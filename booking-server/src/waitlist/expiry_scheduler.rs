//! Claim-expiry scheduler
//!
//! Owns the NOTIFIED → EXPIRED transition. Runs a startup catch-up sweep
//! (claim windows that lapsed while the process was down) and then a
//! periodic loop. Each expiry re-signals the promoter, which cascades to
//! the next ACTIVE entry until someone claims or the queue drains.
//!
//! Expiry and a late claim race by design; both transitions
//! compare-on-status inside their write transaction, so whichever
//! commits first wins and the loser is a no-op.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::bookings::storage::BookingStorage;
use crate::core::config::EnginePolicy;
use crate::waitlist::promoter::WaitlistPromoter;
use shared::util::now_millis;

pub struct ClaimExpiryScheduler {
    storage: BookingStorage,
    promoter: Arc<WaitlistPromoter>,
    policy: EnginePolicy,
    sweep_interval: Duration,
    shutdown: CancellationToken,
}

impl ClaimExpiryScheduler {
    pub fn new(
        storage: BookingStorage,
        promoter: Arc<WaitlistPromoter>,
        policy: EnginePolicy,
        sweep_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            storage,
            promoter,
            policy,
            sweep_interval,
            shutdown,
        }
    }

    /// Main loop: startup catch-up sweep, then periodic sweeps
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Claim expiry scheduler started"
        );

        // Catch up on claim windows that lapsed across a restart
        match self.sweep_once().await {
            Ok(0) => {}
            Ok(n) => tracing::info!(expired = n, "Startup sweep expired stale claim windows"),
            Err(e) => tracing::error!(error = %e, "Startup expiry sweep failed"),
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Claim expiry scheduler received shutdown signal");
                    return;
                }
            }

            if let Err(e) = self.sweep_once().await {
                tracing::error!(error = %e, "Expiry sweep failed");
            }
        }
    }

    /// One sweep: expire every overdue NOTIFIED entry, then re-signal
    /// promotion for the affected instances. Returns the expiry count.
    pub async fn sweep_once(&self) -> Result<usize, crate::bookings::traits::BookingError> {
        let now = now_millis();
        let ttl = self.policy.claim_ttl_millis();

        let overdue: Vec<_> = self
            .storage
            .notified_entries()?
            .into_iter()
            .filter(|e| e.notified_at.map(|t| t + ttl <= now).unwrap_or(false))
            .collect();

        let mut expired = 0usize;
        for entry in overdue {
            // The promoter re-checks status and deadline inside the
            // transaction; a claim that committed since the scan wins.
            if self.promoter.expire_entry(&entry.entry_id).await? {
                expired += 1;
                self.promoter.promote_next(&entry.instance_id).await?;
            }
        }
        Ok(expired)
    }
}
