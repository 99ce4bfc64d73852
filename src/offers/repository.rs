//! Repository layer for offers and grants

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use super::models::{Offer, UserOffer};

/// Offer catalog queries
pub struct OfferRepository;

impl OfferRepository {
    /// Load all active offers
    pub async fn load_active(pool: &PgPool) -> Result<Vec<Offer>, sqlx::Error> {
        let rows: Vec<Offer> = sqlx::query_as(
            r#"SELECT offer_id, name, description, price, duration_days,
                      is_active, created_at, updated_at
               FROM offers_tb WHERE is_active = TRUE
               ORDER BY offer_id"#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    /// Get an offer by ID, active or not
    pub async fn get_by_id(pool: &PgPool, offer_id: i64) -> Result<Option<Offer>, sqlx::Error> {
        let row: Option<Offer> = sqlx::query_as(
            r#"SELECT offer_id, name, description, price, duration_days,
                      is_active, created_at, updated_at
               FROM offers_tb WHERE offer_id = $1"#,
        )
        .bind(offer_id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    /// Get an active offer by ID
    pub async fn get_active(pool: &PgPool, offer_id: i64) -> Result<Option<Offer>, sqlx::Error> {
        let row: Option<Offer> = sqlx::query_as(
            r#"SELECT offer_id, name, description, price, duration_days,
                      is_active, created_at, updated_at
               FROM offers_tb WHERE offer_id = $1 AND is_active = TRUE"#,
        )
        .bind(offer_id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    /// Create an offer (seed/admin path)
    pub async fn create(
        pool: &PgPool,
        name: &str,
        description: &str,
        price: rust_decimal::Decimal,
        duration_days: i32,
    ) -> Result<i64, sqlx::Error> {
        let offer_id: i64 = sqlx::query_scalar(
            r#"INSERT INTO offers_tb (name, description, price, duration_days)
               VALUES ($1, $2, $3, $4)
               RETURNING offer_id"#,
        )
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(duration_days)
        .fetch_one(pool)
        .await?;

        Ok(offer_id)
    }
}

/// Grant persistence
pub struct UserOfferRepository;

impl UserOfferRepository {
    /// Upsert an inactive grant inside an open ledger transaction.
    ///
    /// Renewals replace the existing (user, offer) row: new transaction_id,
    /// new expiration, back to inactive until the activation settles.
    pub async fn upsert_pending_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        offer_id: i64,
        transaction_id: &str,
        expiration_date: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO user_offers_tb
                   (user_id, offer_id, transaction_id, expiration_date, is_active)
               VALUES ($1, $2, $3, $4, FALSE)
               ON CONFLICT (user_id, offer_id)
               DO UPDATE SET transaction_id = EXCLUDED.transaction_id,
                             activation_date = NOW(),
                             expiration_date = EXCLUDED.expiration_date,
                             is_active = FALSE"#,
        )
        .bind(user_id)
        .bind(offer_id)
        .bind(transaction_id)
        .bind(expiration_date)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Locate a grant by the transaction that created it
    pub async fn get_by_transaction(
        pool: &PgPool,
        transaction_id: &str,
    ) -> Result<Option<UserOffer>, sqlx::Error> {
        let row: Option<UserOffer> = sqlx::query_as(
            r#"SELECT id, user_id, offer_id, transaction_id,
                      activation_date, expiration_date, is_active
               FROM user_offers_tb WHERE transaction_id = $1"#,
        )
        .bind(transaction_id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    /// Flip a grant active on activation SUCCESS.
    ///
    /// Returns false when no grant matches the transaction (orphaned grant,
    /// non-fatal to the caller).
    pub async fn activate(pool: &PgPool, transaction_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE user_offers_tb SET is_active = TRUE
               WHERE transaction_id = $1"#,
        )
        .bind(transaction_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Active grants expiring within the window (but not yet expired)
    pub async fn find_expiring(
        pool: &PgPool,
        until: DateTime<Utc>,
    ) -> Result<Vec<UserOffer>, sqlx::Error> {
        let rows: Vec<UserOffer> = sqlx::query_as(
            r#"SELECT id, user_id, offer_id, transaction_id,
                      activation_date, expiration_date, is_active
               FROM user_offers_tb
               WHERE is_active = TRUE
                 AND expiration_date <= $1
                 AND expiration_date >= NOW()
               ORDER BY expiration_date ASC"#,
        )
        .bind(until)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}
