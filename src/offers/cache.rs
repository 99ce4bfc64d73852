//! TTL-based cache for the offer catalog
//!
//! Uses the `cached` crate for automatic TTL expiration, so catalog edits
//! become visible within the TTL without restarting the service.

use cached::proc_macro::cached;
use sqlx::PgPool;

use super::models::Offer;
use super::repository::OfferRepository;

/// Load all active offers, cached for 5 seconds.
#[cached(
    time = 5,
    key = "String",
    convert = r#"{ "active_offers".to_string() }"#,
    result = true
)]
pub async fn load_active_offers_cached(pool: PgPool) -> Result<Vec<Offer>, String> {
    tracing::debug!("[cache] Loading active offers from database");
    OfferRepository::load_active(&pool)
        .await
        .map_err(|e| format!("Failed to load offers: {}", e))
}
