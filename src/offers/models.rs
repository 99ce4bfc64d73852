use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Purchasable subscription bundle (internet, TV, ...)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Offer {
    pub offer_id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub duration_days: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User-held entitlement produced by a successful activation.
///
/// Created inactive alongside the PENDING transaction and flipped active
/// only when that transaction reaches SUCCESS. Renewals replace the row
/// keyed by (user_id, offer_id).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserOffer {
    pub id: i64,
    pub user_id: i64,
    pub offer_id: i64,
    pub transaction_id: String,
    pub activation_date: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    pub is_active: bool,
}
