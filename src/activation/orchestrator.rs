//! Activation orchestrator
//!
//! The only component permitted to transition a transaction after PENDING.
//! Drives one activation job to a terminal state and leaves ledger, cache
//! and grant consistent with it. Every transition is a CAS, the refund is
//! conditional on winning the FAILED transition, and notifications are
//! deduplicated, so concurrent or retried runs of the same job settle
//! exactly once.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::account::UserRepository;
use crate::cache::StatusCache;
use crate::error::ActivationError;
use crate::notify::Notifier;
use crate::offers::{OfferRepository, UserOfferRepository};
use crate::partner::{GatewayOutcome, PartnerGateway};

use super::db::{record_notification, TransactionDb};
use super::state::ActivationState;
use super::types::{ActivationRecord, TransactionId};

pub struct ActivationOrchestrator {
    db: Arc<TransactionDb>,
    gateway: Arc<dyn PartnerGateway>,
    cache: Arc<StatusCache>,
    notifier: Arc<dyn Notifier>,
}

impl ActivationOrchestrator {
    pub fn new(
        db: Arc<TransactionDb>,
        gateway: Arc<dyn PartnerGateway>,
        cache: Arc<StatusCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            gateway,
            cache,
            notifier,
        }
    }

    pub fn cache(&self) -> &Arc<StatusCache> {
        &self.cache
    }

    pub fn db(&self) -> &Arc<TransactionDb> {
        &self.db
    }

    /// Run one activation job to a terminal state.
    ///
    /// Idempotent re-entry: a terminal transaction is returned as-is; a
    /// transaction already claimed by another run is left alone.
    pub async fn process(
        &self,
        transaction_id: TransactionId,
    ) -> Result<ActivationState, ActivationError> {
        let Some(record) = self.db.get(transaction_id).await? else {
            // The job is dropped; the ledger has nothing to mark. The cache
            // records the failure so pollers are not left hanging.
            error!(transaction_id = %transaction_id, "Transaction not found");
            self.cache.mark_failed(transaction_id, "Transaction not found");
            return Err(ActivationError::NotFound("Transaction"));
        };

        if record.status.is_terminal() {
            info!(
                transaction_id = %transaction_id,
                status = %record.status,
                "Transaction already settled"
            );
            return Ok(record.status);
        }

        match record.status {
            ActivationState::Pending => {
                if !self.db.claim(transaction_id).await? {
                    // Another run won the claim between load and CAS.
                    let current = self
                        .db
                        .get(transaction_id)
                        .await?
                        .map(|r| r.status)
                        .unwrap_or(ActivationState::Processing);
                    info!(
                        transaction_id = %transaction_id,
                        status = %current,
                        "Claim lost, leaving transaction to its owner"
                    );
                    return Ok(current);
                }
                self.drive(&record).await
            }
            ActivationState::Processing => {
                // Claimed by a run still in flight; the stale sweep will
                // resume it if that run died.
                info!(transaction_id = %transaction_id, "Transaction already claimed");
                Ok(ActivationState::Processing)
            }
            _ => Ok(record.status),
        }
    }

    /// Gateway call plus terminal settlement for a claimed transaction.
    async fn drive(&self, record: &ActivationRecord) -> Result<ActivationState, ActivationError> {
        let transaction_id = record.transaction_id;
        self.cache.mark_processing(transaction_id);
        info!(transaction_id = %transaction_id, gateway = self.gateway.name(), "Invoking partner gateway");

        match self.gateway.activate(record).await {
            GatewayOutcome::Success { reference } => {
                if !self.db.complete_success(transaction_id).await? {
                    let current = self
                        .db
                        .get(transaction_id)
                        .await?
                        .map(|r| r.status)
                        .unwrap_or(ActivationState::Processing);
                    warn!(
                        transaction_id = %transaction_id,
                        status = %current,
                        "Success settlement lost the CAS, another run settled first"
                    );
                    return Ok(current);
                }

                self.cache.mark_success(transaction_id, &reference);

                match UserOfferRepository::activate(self.db.pool(), &transaction_id.to_string())
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => {
                        // Grant is orphaned; the activation itself stands.
                        error!(transaction_id = %transaction_id, "UserOffer not found for transaction");
                    }
                    Err(e) => {
                        error!(transaction_id = %transaction_id, error = %e, "Failed to activate user offer");
                    }
                }

                self.notify_terminal(record, ActivationState::Success, Some(&reference), None)
                    .await;

                info!(transaction_id = %transaction_id, reference = %reference, "Activation succeeded");
                Ok(ActivationState::Success)
            }
            GatewayOutcome::Failed { reason } => {
                warn!(transaction_id = %transaction_id, reason = %reason, "Partner activation failed");
                self.settle_failed(record, &reason).await
            }
        }
    }

    /// Conditional FAILED settlement: transition + refund + cache + notice.
    async fn settle_failed(
        &self,
        record: &ActivationRecord,
        reason: &str,
    ) -> Result<ActivationState, ActivationError> {
        let transaction_id = record.transaction_id;

        if !self.db.fail_with_refund(transaction_id, reason).await? {
            let current = self
                .db
                .get(transaction_id)
                .await?
                .map(|r| r.status)
                .unwrap_or(ActivationState::Failed);
            info!(
                transaction_id = %transaction_id,
                status = %current,
                "Transaction already terminal, skipping refund"
            );
            return Ok(current);
        }

        self.cache.mark_failed(transaction_id, reason);
        self.notify_terminal(record, ActivationState::Failed, None, Some(reason))
            .await;

        Ok(ActivationState::Failed)
    }

    /// Abandon a job whose retry budget ran out.
    ///
    /// Safe to call at any point: the FAILED transition and the refund are
    /// conditional, so a job that already settled is left untouched.
    pub async fn abandon(
        &self,
        transaction_id: TransactionId,
        reason: &str,
    ) -> Result<(), ActivationError> {
        let Some(record) = self.db.get(transaction_id).await? else {
            self.cache.mark_failed(transaction_id, "Transaction not found");
            return Ok(());
        };

        if record.status.is_terminal() {
            return Ok(());
        }

        warn!(transaction_id = %transaction_id, reason = %reason, "Abandoning activation job");
        self.settle_failed(&record, reason).await?;
        Ok(())
    }

    /// Resume activations stuck in a non-terminal state for longer than
    /// `threshold`.
    ///
    /// A stale PROCESSING row means the run died between the claim and the
    /// terminal write; the gateway call re-executes directly. A stale
    /// PENDING row means the enqueue was lost, so it re-enters through the
    /// normal claim path. The success proof is re-validatable and the
    /// refund is conditional, so resumption is idempotent either way.
    /// Returns the number of transactions re-driven.
    pub async fn resume_stale(&self, threshold: Duration) -> Result<usize, ActivationError> {
        let stale = self.db.find_stale(threshold).await?;
        let count = stale.len();

        for record in stale {
            warn!(
                transaction_id = %record.transaction_id,
                status = %record.status,
                updated_at = %record.updated_at,
                "Resuming stale transaction"
            );
            self.db.increment_retry(record.transaction_id).await?;
            let result = match record.status {
                // Never claimed: take the claim before driving
                ActivationState::Pending => self.process(record.transaction_id).await.map(|_| ()),
                _ => self.drive(&record).await.map(|_| ()),
            };
            if let Err(e) = result {
                error!(
                    transaction_id = %record.transaction_id,
                    error = %e,
                    "Failed to resume stale transaction"
                );
            }
        }

        Ok(count)
    }

    /// Send a terminal notification, deduplicated by (transaction, outcome).
    ///
    /// Everything in here is best effort: dedup-record errors, missing
    /// users/emails and delivery failures are logged and swallowed.
    async fn notify_terminal(
        &self,
        record: &ActivationRecord,
        outcome: ActivationState,
        reference: Option<&str>,
        error_reason: Option<&str>,
    ) {
        let transaction_id = record.transaction_id;

        match record_notification(self.db.pool(), transaction_id, outcome).await {
            Ok(true) => {}
            Ok(false) => {
                info!(
                    transaction_id = %transaction_id,
                    outcome = %outcome,
                    "Notification already sent, skipping"
                );
                return;
            }
            Err(e) => {
                error!(transaction_id = %transaction_id, error = %e, "Failed to record notification");
                return;
            }
        }

        let email = match UserRepository::get_by_id(self.db.pool(), record.user_id).await {
            Ok(Some(user)) => match user.email {
                Some(email) => email,
                None => {
                    warn!(user_id = record.user_id, "User has no email, skipping notification");
                    return;
                }
            },
            Ok(None) => {
                warn!(user_id = record.user_id, "User not found, skipping notification");
                return;
            }
            Err(e) => {
                error!(user_id = record.user_id, error = %e, "User lookup failed, skipping notification");
                return;
            }
        };

        let offer_name = OfferRepository::get_by_id(self.db.pool(), record.offer_id)
            .await
            .ok()
            .flatten()
            .map(|o| o.name)
            .unwrap_or_else(|| format!("#{}", record.offer_id));

        let (subject, body) = match outcome {
            ActivationState::Success => (
                "Offer Activation Successful",
                format!(
                    "Your offer {} has been successfully activated. Reference: {}",
                    offer_name,
                    reference.unwrap_or("N/A")
                ),
            ),
            _ => (
                "Offer Activation Failed",
                format!(
                    "Your offer {} activation failed. Amount has been refunded. Error: {}",
                    offer_name,
                    error_reason.unwrap_or("Unknown error")
                ),
            ),
        };

        if let Err(e) = self.notifier.send(&email, subject, &body).await {
            warn!(transaction_id = %transaction_id, error = %e, "Notification delivery failed");
        }
    }
}
