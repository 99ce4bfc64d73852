//! Expiring-grant scan
//!
//! Scheduled job that reminds users about grants expiring soon. Pure
//! filter + notify: no state transitions, failures only logged.

use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::account::UserRepository;
use crate::error::ActivationError;
use crate::notify::Notifier;
use crate::offers::{OfferRepository, UserOfferRepository};

/// Days before expiration at which users get reminded
pub const EXPIRY_WINDOW_DAYS: i64 = 3;

/// Notify users whose active grants expire within the window.
///
/// Returns the number of reminders attempted.
pub async fn notify_expiring(
    pool: &PgPool,
    notifier: &Arc<dyn Notifier>,
    window: chrono::Duration,
) -> Result<u64, ActivationError> {
    let until = Utc::now() + window;
    let expiring = UserOfferRepository::find_expiring(pool, until).await?;

    info!(count = expiring.len(), "Found expiring grants");
    let mut notified = 0u64;

    for grant in expiring {
        let email = match UserRepository::get_by_id(pool, grant.user_id).await {
            Ok(Some(user)) => match user.email {
                Some(email) => email,
                None => continue,
            },
            Ok(None) => continue,
            Err(e) => {
                error!(user_id = grant.user_id, error = %e, "User lookup failed");
                continue;
            }
        };

        let offer_name = OfferRepository::get_by_id(pool, grant.offer_id)
            .await
            .ok()
            .flatten()
            .map(|o| o.name)
            .unwrap_or_else(|| format!("#{}", grant.offer_id));

        let body = format!(
            "Your offer {} will expire on {}. Renew it now to continue enjoying the service.",
            offer_name,
            grant.expiration_date.format("%Y-%m-%d")
        );

        if let Err(e) = notifier.send(&email, "Offer Expiring Soon", &body).await {
            warn!(user_id = grant.user_id, error = %e, "Expiry reminder delivery failed");
        }
        notified += 1;
    }

    info!(notified = notified, "Completed expiring-grant scan");
    Ok(notified)
}

/// Scheduled loop: one scan per `interval`.
pub async fn run(pool: PgPool, notifier: Arc<dyn Notifier>, interval: Duration) {
    info!(?interval, "Expiring-grant scan loop started");
    loop {
        if let Err(e) =
            notify_expiring(&pool, &notifier, chrono::Duration::days(EXPIRY_WINDOW_DAYS)).await
        {
            error!(error = %e, "Expiring-grant scan failed");
        }
        sleep(interval).await;
    }
}
