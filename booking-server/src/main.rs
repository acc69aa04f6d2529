use std::sync::Arc;
use std::time::Duration;

use booking_server::bookings::BookingsManager;
use booking_server::bookings::storage::BookingStorage;
use booking_server::core::config::Config;
use booking_server::core::tasks::{BackgroundTasks, TaskKind};
use booking_server::payments::RefundWorker;
use booking_server::services::{LogNotificationService, LogPaymentGateway};
use booking_server::utils::logger;
use booking_server::waitlist::ClaimExpiryScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment and logging
    dotenv::dotenv().ok();
    logger::init();

    tracing::info!("Booking engine starting...");

    // 2. Configuration
    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;
    let db_path = std::path::Path::new(&config.work_dir).join("bookings.redb");

    // 3. Storage and manager
    let storage = BookingStorage::open(&db_path)?;
    let manager = Arc::new(BookingsManager::new(
        storage.clone(),
        config.policy.clone(),
        Arc::new(LogPaymentGateway),
        Arc::new(LogNotificationService),
    ));
    tracing::info!(epoch = %manager.epoch(), db = %db_path.display(), "Storage ready");

    // 4. Background tasks: claim expiry + refund settlement
    let mut tasks = BackgroundTasks::new();

    let scheduler = ClaimExpiryScheduler::new(
        storage.clone(),
        manager.promoter(),
        config.policy.clone(),
        Duration::from_secs(config.expiry_sweep_secs),
        tasks.shutdown_token(),
    );
    tasks.spawn("claim_expiry_scheduler", TaskKind::Periodic, scheduler.run());

    let refund_worker = RefundWorker::new(
        storage,
        Arc::new(LogPaymentGateway),
        config.policy.refund_max_attempts,
        Duration::from_secs(config.refund_retry_secs),
        tasks.shutdown_token(),
    );
    tasks.spawn("refund_worker", TaskKind::Periodic, refund_worker.run());

    tracing::info!(tasks = tasks.len(), "Background tasks running");

    // 5. Run until interrupted (the RPC/HTTP surface wraps the manager
    //    out of process; this binary hosts the engine and its workers)
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    tasks.shutdown().await;
    Ok(())
}
