use std::sync::Arc;
use std::time::Duration;

use offerflow::activation::worker::run_recovery;
use offerflow::activation::{
    ActivationOrchestrator, ActivationQueue, ActivationWorker, TransactionDb,
};
use offerflow::cache::StatusCache;
use offerflow::config::{AppConfig, PartnerMode};
use offerflow::db::Database;
use offerflow::logging::init_logging;
use offerflow::notify::{LogNotifier, Notifier};
use offerflow::partner::{LocalPartnerGateway, PartnerGateway, RemotePartnerGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::args().nth(1).unwrap_or_else(|| "default".to_string());
    let config = AppConfig::load(&env)?;
    let _guard = init_logging(&config);

    tracing::info!(env = %env, "Offerflow starting");

    let database = Database::connect(&config.database_url).await?;
    database.health_check().await?;
    database.init_schema().await?;

    // Shared dependencies, constructed once and injected by reference
    let db = Arc::new(TransactionDb::new(database.pool().clone()));
    let cache = Arc::new(StatusCache::new());
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    let gateway: Arc<dyn PartnerGateway> = match config.partner.mode {
        PartnerMode::Remote => Arc::new(RemotePartnerGateway::new(&config.partner)?),
        PartnerMode::Local => Arc::new(LocalPartnerGateway::new(database.pool().clone())),
    };
    tracing::info!(gateway = gateway.name(), "Partner gateway configured");

    let orchestrator = Arc::new(ActivationOrchestrator::new(
        db,
        gateway,
        cache.clone(),
        notifier.clone(),
    ));

    let (_queue, rx) = ActivationQueue::new();
    let worker = ActivationWorker::new(orchestrator.clone(), rx, &config.worker);

    let recovery = tokio::spawn(run_recovery(
        orchestrator,
        Duration::from_secs(config.worker.recovery_interval_secs),
        Duration::from_secs(config.worker.stale_after_secs),
    ));

    let expiry = tokio::spawn(offerflow::expiry::run(
        database.pool().clone(),
        notifier,
        Duration::from_secs(24 * 60 * 60),
    ));

    // `_queue` is the admission-side handle; the serving layer that calls
    // AdmissionService/StatusService plugs in here.
    worker.run().await;

    recovery.abort();
    expiry.abort();
    Ok(())
}
