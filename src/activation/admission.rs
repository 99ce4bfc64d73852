//! Admission: synchronous request-side entry into the pipeline

use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::account::AccountRepository;
use crate::cache::StatusCache;
use crate::error::ActivationError;
use crate::offers::{load_active_offers_cached, Offer, OfferRepository, UserOfferRepository};

use super::db::TransactionDb;
use super::queue::ActivationQueue;
use super::state::ActivationState;
use super::types::TransactionId;

/// What the caller gets back synchronously (202-equivalent)
#[derive(Debug, Clone)]
pub struct AdmissionReceipt {
    pub transaction_id: TransactionId,
    pub status: ActivationState,
}

/// Admits activation requests: validates funds, debits the balance, records
/// the PENDING transaction and inactive grant, and enqueues the job.
///
/// Debit, transaction insert and grant upsert run under a single database
/// transaction, so a crash mid-admission never leaves a debited balance
/// without a ledger record.
pub struct AdmissionService {
    pool: PgPool,
    cache: Arc<StatusCache>,
    queue: ActivationQueue,
}

impl AdmissionService {
    pub fn new(pool: PgPool, cache: Arc<StatusCache>, queue: ActivationQueue) -> Self {
        Self { pool, cache, queue }
    }

    /// Active offer catalog, served through the TTL cache.
    pub async fn catalog(&self) -> Result<Vec<Offer>, ActivationError> {
        load_active_offers_cached(self.pool.clone())
            .await
            .map_err(ActivationError::System)
    }

    /// Start the activation of `offer_id` for `user_id`.
    ///
    /// Fails with `NotFound` when the offer is missing or inactive, and with
    /// `InsufficientFunds` (nothing mutated) when the balance is below the
    /// offer price.
    pub async fn admit(
        &self,
        user_id: i64,
        offer_id: i64,
    ) -> Result<AdmissionReceipt, ActivationError> {
        let offer = OfferRepository::get_active(&self.pool, offer_id)
            .await?
            .ok_or(ActivationError::NotFound("Offer"))?;

        let transaction_id = TransactionId::new();
        let expiration_date = Utc::now() + chrono::Duration::days(offer.duration_days as i64);

        let mut tx = self.pool.begin().await?;

        AccountRepository::ensure_exists_tx(&mut tx, user_id).await?;

        if !AccountRepository::debit_if_sufficient_tx(&mut tx, user_id, offer.price).await? {
            tx.rollback().await?;
            warn!(
                user_id = user_id,
                offer_id = offer_id,
                price = %offer.price,
                "Admission rejected: insufficient balance"
            );
            return Err(ActivationError::InsufficientFunds);
        }

        TransactionDb::create_pending_tx(&mut tx, transaction_id, user_id, offer_id, offer.price)
            .await?;

        UserOfferRepository::upsert_pending_tx(
            &mut tx,
            user_id,
            offer_id,
            &transaction_id.to_string(),
            expiration_date,
        )
        .await?;

        tx.commit().await?;

        info!(
            transaction_id = %transaction_id,
            user_id = user_id,
            offer_id = offer_id,
            amount = %offer.price,
            "Activation admitted"
        );

        // Projection seed and enqueue happen after the durable commit;
        // both are recoverable if lost (ledger fallback, stale sweep).
        self.cache
            .put_pending(transaction_id, user_id, offer.price, Utc::now());
        self.queue.enqueue(transaction_id);

        Ok(AdmissionReceipt {
            transaction_id,
            status: ActivationState::Pending,
        })
    }
}
