//! Activation worker
//!
//! Consumes activation jobs off the queue and runs each through the
//! orchestrator with a bounded retry budget. A companion recovery loop
//! re-drives transactions stuck in PROCESSING.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;

use super::orchestrator::ActivationOrchestrator;
use super::types::TransactionId;

pub struct ActivationWorker {
    orchestrator: Arc<ActivationOrchestrator>,
    rx: mpsc::UnboundedReceiver<TransactionId>,
    max_attempts: u32,
    backoff: Duration,
}

impl ActivationWorker {
    pub fn new(
        orchestrator: Arc<ActivationOrchestrator>,
        rx: mpsc::UnboundedReceiver<TransactionId>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            orchestrator,
            rx,
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }

    /// Consume jobs until the queue closes.
    pub async fn run(mut self) {
        info!(max_attempts = self.max_attempts, "Activation worker started");
        while let Some(transaction_id) = self.rx.recv().await {
            self.handle(transaction_id).await;
        }
        info!("Activation queue closed, worker stopping");
    }

    /// One job, up to `max_attempts` runs with doubling backoff.
    async fn handle(&self, transaction_id: TransactionId) {
        for attempt in 1..=self.max_attempts {
            match self.orchestrator.process(transaction_id).await {
                Ok(state) => {
                    debug!(
                        transaction_id = %transaction_id,
                        state = %state,
                        attempt = attempt,
                        "Activation job processed"
                    );
                    return;
                }
                Err(e) if !e.is_retryable() => {
                    warn!(
                        transaction_id = %transaction_id,
                        error = %e,
                        "Activation job dropped"
                    );
                    return;
                }
                Err(e) => {
                    error!(
                        transaction_id = %transaction_id,
                        error = %e,
                        attempt = attempt,
                        "Activation job failed"
                    );
                    // Pollers see the failure immediately, even while the
                    // ledger outcome is still open to a retry.
                    self.orchestrator
                        .cache()
                        .mark_failed(transaction_id, &e.to_string());

                    if attempt < self.max_attempts {
                        sleep(self.backoff * 2u32.pow(attempt - 1)).await;
                    } else if let Err(abandon_err) = self
                        .orchestrator
                        .abandon(transaction_id, &format!("Unexpected error: {}", e))
                        .await
                    {
                        error!(
                            transaction_id = %transaction_id,
                            error = %abandon_err,
                            "Failed to abandon activation job"
                        );
                    }
                }
            }
        }
    }
}

/// Periodic sweep resuming transactions stuck in PROCESSING.
pub async fn run_recovery(
    orchestrator: Arc<ActivationOrchestrator>,
    interval: Duration,
    stale_after: Duration,
) {
    info!(?interval, ?stale_after, "Stale-activation recovery loop started");
    loop {
        sleep(interval).await;
        match orchestrator.resume_stale(stale_after).await {
            Ok(0) => {}
            Ok(n) => info!(count = n, "Resumed stale activations"),
            Err(e) => error!(error = %e, "Stale-activation sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let base = Duration::from_millis(500);
        assert_eq!(base * 2u32.pow(0), Duration::from_millis(500));
        assert_eq!(base * 2u32.pow(1), Duration::from_millis(1000));
        assert_eq!(base * 2u32.pow(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_worker_config_defaults_match_retry_contract() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_attempts, 3);
    }
}
