//! Activation ledger persistence
//!
//! PostgreSQL persistence for the activation state machine. Every state
//! update is an atomic CAS (Compare-And-Swap): the transition applies only
//! if the row is still in the expected state, so duplicate or concurrent
//! runs of the same job cannot both win a transition.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::time::Duration;

use crate::account::AccountRepository;
use crate::error::ActivationError;

use super::state::ActivationState;
use super::types::{ActivationRecord, TransactionId};

/// Activation ledger operations
pub struct TransactionDb {
    pool: PgPool,
}

impl TransactionDb {
    /// Create a new TransactionDb with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool (grant/notification lookups share it)
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a PENDING activation inside an open ledger transaction.
    ///
    /// Admission runs debit + transaction + grant creation under one
    /// transaction boundary, so a crash mid-sequence leaves no dangling
    /// debit.
    pub async fn create_pending_tx(
        tx: &mut Transaction<'_, Postgres>,
        transaction_id: TransactionId,
        user_id: i64,
        offer_id: i64,
        amount: Decimal,
    ) -> Result<i64, ActivationError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transactions_tb
                (transaction_id, user_id, offer_id, amount, status, created_at, updated_at)
            VALUES
                ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING id
            "#,
        )
        .bind(transaction_id.to_string())
        .bind(user_id)
        .bind(offer_id)
        .bind(amount)
        .bind(ActivationState::Pending.id())
        .fetch_one(&mut **tx)
        .await?;

        Ok(id)
    }

    /// Get an activation record by transaction_id
    pub async fn get(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<ActivationRecord>, ActivationError> {
        let row = sqlx::query(
            r#"
            SELECT transaction_id, user_id, offer_id, amount, status,
                   error_message, retry_count, created_at, updated_at, completed_at
            FROM transactions_tb
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    /// Get an activation record only if it belongs to the given user.
    ///
    /// The status surface uses this so a foreign transaction_id is
    /// indistinguishable from an unknown one.
    pub async fn get_owned(
        &self,
        transaction_id: TransactionId,
        user_id: i64,
    ) -> Result<Option<ActivationRecord>, ActivationError> {
        let row = sqlx::query(
            r#"
            SELECT transaction_id, user_id, offer_id, amount, status,
                   error_message, retry_count, created_at, updated_at, completed_at
            FROM transactions_tb
            WHERE transaction_id = $1 AND user_id = $2
            "#,
        )
        .bind(transaction_id.to_string())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    /// Atomic claim: PENDING -> PROCESSING.
    ///
    /// Returns true if this caller won the claim; false means another run
    /// already claimed or settled the transaction.
    pub async fn claim(&self, transaction_id: TransactionId) -> Result<bool, ActivationError> {
        let result = sqlx::query(
            r#"
            UPDATE transactions_tb
            SET status = $1, updated_at = NOW()
            WHERE transaction_id = $2 AND status = $3
            "#,
        )
        .bind(ActivationState::Processing.id())
        .bind(transaction_id.to_string())
        .bind(ActivationState::Pending.id())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Atomic settle: PROCESSING -> SUCCESS with completed_at.
    ///
    /// Returns false when the transaction is no longer PROCESSING (another
    /// run settled it first).
    pub async fn complete_success(
        &self,
        transaction_id: TransactionId,
    ) -> Result<bool, ActivationError> {
        let result = sqlx::query(
            r#"
            UPDATE transactions_tb
            SET status = $1, completed_at = NOW(), updated_at = NOW()
            WHERE transaction_id = $2 AND status = $3
            "#,
        )
        .bind(ActivationState::Success.id())
        .bind(transaction_id.to_string())
        .bind(ActivationState::Processing.id())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Atomic settle with compensation: {PENDING, PROCESSING} -> FAILED plus
    /// refund credit, in one database transaction.
    ///
    /// The refund only happens when this caller wins the CAS, which makes it
    /// exactly-once under job retries and duplicate enqueues. Returns true
    /// when the transition (and therefore the refund) was applied.
    pub async fn fail_with_refund(
        &self,
        transaction_id: TransactionId,
        error: &str,
    ) -> Result<bool, ActivationError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            UPDATE transactions_tb
            SET status = $1, error_message = $2, completed_at = NOW(), updated_at = NOW()
            WHERE transaction_id = $3 AND status IN ($4, $5)
            RETURNING user_id, amount
            "#,
        )
        .bind(ActivationState::Failed.id())
        .bind(error)
        .bind(transaction_id.to_string())
        .bind(ActivationState::Pending.id())
        .bind(ActivationState::Processing.id())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            // Already terminal - no transition, no refund
            tx.rollback().await?;
            return Ok(false);
        };

        let user_id: i64 = row.get("user_id");
        let amount: Decimal = row.get("amount");

        AccountRepository::credit_tx(&mut tx, user_id, amount).await?;
        tx.commit().await?;

        tracing::info!(
            transaction_id = %transaction_id,
            user_id = user_id,
            amount = %amount,
            "Activation failed, amount refunded"
        );
        Ok(true)
    }

    /// Increment the retry counter of a transaction
    pub async fn increment_retry(
        &self,
        transaction_id: TransactionId,
    ) -> Result<(), ActivationError> {
        sqlx::query(
            r#"
            UPDATE transactions_tb
            SET retry_count = retry_count + 1, updated_at = NOW()
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Find activations stuck in a non-terminal state for longer than
    /// `threshold`.
    ///
    /// A stale PROCESSING row belongs to a run that died between the claim
    /// and the terminal write; a stale PENDING row lost its enqueue (queue
    /// closed at shutdown, or crash right after the admission commit). The
    /// recovery sweep picks up both.
    pub async fn find_stale(
        &self,
        threshold: Duration,
    ) -> Result<Vec<ActivationRecord>, ActivationError> {
        let threshold_secs = threshold.as_secs() as i64;

        let rows = sqlx::query(
            r#"
            SELECT transaction_id, user_id, offer_id, amount, status,
                   error_message, retry_count, created_at, updated_at, completed_at
            FROM transactions_tb
            WHERE status IN ($1, $2)
              AND updated_at < NOW() - INTERVAL '1 second' * $3
            ORDER BY updated_at ASC
            LIMIT 100
            "#,
        )
        .bind(ActivationState::Pending.id())
        .bind(ActivationState::Processing.id())
        .bind(threshold_secs)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(row_to_record(&row)?);
        }

        Ok(records)
    }
}

/// Record a terminal notification for dedup.
///
/// Insert-if-absent keyed by (transaction_id, outcome): returns true exactly
/// once per transaction and terminal state, so retried jobs never re-notify.
pub async fn record_notification(
    pool: &PgPool,
    transaction_id: TransactionId,
    outcome: ActivationState,
) -> Result<bool, ActivationError> {
    let result = sqlx::query(
        r#"
        INSERT INTO activation_notices_tb (transaction_id, outcome)
        VALUES ($1, $2)
        ON CONFLICT (transaction_id, outcome) DO NOTHING
        "#,
    )
    .bind(transaction_id.to_string())
    .bind(outcome.id())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Convert a database row to an ActivationRecord
fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<ActivationRecord, ActivationError> {
    let transaction_id_str: String = row.get("transaction_id");
    let transaction_id: TransactionId = transaction_id_str
        .parse()
        .map_err(|_| ActivationError::System("Invalid transaction_id format".to_string()))?;

    let status_id: i16 = row.get("status");
    let status = ActivationState::from_id(status_id)
        .ok_or_else(|| ActivationError::System(format!("Invalid status ID: {}", status_id)))?;

    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");
    let completed_at: Option<DateTime<Utc>> = row.get("completed_at");

    Ok(ActivationRecord {
        transaction_id,
        user_id: row.get("user_id"),
        offer_id: row.get("offer_id"),
        amount: row.get("amount"),
        status,
        error_message: row.get("error_message"),
        retry_count: row.get("retry_count"),
        created_at,
        updated_at,
        completed_at,
    })
}
