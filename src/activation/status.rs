//! Status query surface
//!
//! The fast-status cache is a read-through projection of the ledger: when
//! the ledger answers, it wins, and a stale cache entry is repaired in
//! place. The cache serves alone only when the ledger is unreachable.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{StatusCache, StatusEntry};
use crate::error::ActivationError;

use super::db::TransactionDb;
use super::types::{ActivationRecord, TransactionId};

/// API-boundary view of one activation
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub transaction_id: String,
    pub status: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

pub struct StatusService {
    db: Arc<TransactionDb>,
    cache: Arc<StatusCache>,
}

impl StatusService {
    pub fn new(db: Arc<TransactionDb>, cache: Arc<StatusCache>) -> Self {
        Self { db, cache }
    }

    /// Status of a transaction, scoped to its owner.
    ///
    /// A transaction owned by someone else is indistinguishable from an
    /// unknown one: both are `NotFound`.
    pub async fn status(
        &self,
        user_id: i64,
        transaction_id: TransactionId,
    ) -> Result<StatusView, ActivationError> {
        let cached = self.cache.get(transaction_id);

        match self.db.get_owned(transaction_id, user_id).await {
            Ok(Some(record)) => {
                let reference = cached.as_ref().and_then(|e| e.reference.clone());
                if let Some(entry) = &cached {
                    if entry.status != record.status {
                        debug!(
                            transaction_id = %transaction_id,
                            cache = %entry.status,
                            ledger = %record.status,
                            "Cache disagreed with ledger, reconciling"
                        );
                        self.cache.reconcile(&record, reference.as_deref());
                    }
                }
                Ok(view_from_record(&record, reference))
            }
            Ok(None) => Err(ActivationError::NotFound("Transaction")),
            Err(e) => {
                // Ledger down: serve the non-authoritative projection if it
                // exists for this owner.
                warn!(transaction_id = %transaction_id, error = %e, "Ledger unreachable, trying cache");
                match cached {
                    Some(entry) if entry.user_id == user_id => {
                        Ok(view_from_entry(transaction_id, &entry))
                    }
                    _ => Err(e),
                }
            }
        }
    }
}

fn view_from_record(record: &ActivationRecord, reference: Option<String>) -> StatusView {
    StatusView {
        transaction_id: record.transaction_id.to_string(),
        status: record.status.as_str().to_string(),
        amount: record.amount,
        created_at: record.created_at,
        updated_at: record.updated_at,
        completed_at: record.completed_at,
        reference,
        error_message: record.error_message.clone(),
    }
}

fn view_from_entry(transaction_id: TransactionId, entry: &StatusEntry) -> StatusView {
    StatusView {
        transaction_id: transaction_id.to_string(),
        status: entry.status.as_str().to_string(),
        amount: entry.amount,
        created_at: entry.created_at,
        updated_at: entry.updated_at,
        completed_at: None,
        reference: entry.reference.clone(),
        error_message: entry.error_message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationState;
    use rust_decimal_macros::dec;

    #[test]
    fn test_view_serialization_omits_absent_fields() {
        let record = ActivationRecord {
            transaction_id: TransactionId::new(),
            user_id: 1,
            offer_id: 2,
            amount: dec!(20.00),
            status: ActivationState::Pending,
            error_message: None,
            retry_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: None,
        };

        let view = view_from_record(&record, None);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["status"], "PENDING");
        assert!(json.get("reference").is_none());
        assert!(json.get("error_message").is_none());
        assert!(json.get("completed_at").is_none());
    }

    #[test]
    fn test_view_carries_reference_on_success() {
        let record = ActivationRecord {
            transaction_id: TransactionId::new(),
            user_id: 1,
            offer_id: 2,
            amount: dec!(20.00),
            status: ActivationState::Success,
            error_message: None,
            retry_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: Some(Utc::now()),
        };

        let view = view_from_record(&record, Some("REF-ABC".to_string()));
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["status"], "SUCCESS");
        assert_eq!(json["reference"], "REF-ABC");
        assert!(json.get("completed_at").is_some());
    }
}
