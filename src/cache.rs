//! Fast-status cache
//!
//! In-process concurrent map mirroring transaction status for low-latency
//! polling. Strictly a projection of the ledger: best effort, never
//! authoritative, entries live until overwritten. Writes are fire and
//! forget; the status surface reconciles against the ledger on read.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::activation::{ActivationRecord, ActivationState, TransactionId};

/// Flat per-transaction cache record
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    pub user_id: i64,
    pub status: ActivationState,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reference: Option<String>,
    pub error_message: Option<String>,
}

/// Concurrent status projection keyed by transaction id
pub struct StatusCache {
    entries: DashMap<TransactionId, StatusEntry>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Seed a PENDING entry at admission
    pub fn put_pending(
        &self,
        transaction_id: TransactionId,
        user_id: i64,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) {
        self.entries.insert(
            transaction_id,
            StatusEntry {
                user_id,
                status: ActivationState::Pending,
                amount,
                created_at,
                updated_at: Utc::now(),
                reference: None,
                error_message: None,
            },
        );
    }

    /// Mirror a non-terminal transition (PROCESSING)
    pub fn mark_processing(&self, transaction_id: TransactionId) {
        self.touch(transaction_id, ActivationState::Processing, None, None);
    }

    /// Mirror SUCCESS with the partner reference
    pub fn mark_success(&self, transaction_id: TransactionId, reference: &str) {
        self.touch(
            transaction_id,
            ActivationState::Success,
            Some(reference.to_string()),
            None,
        );
    }

    /// Mirror FAILED with the failure reason
    pub fn mark_failed(&self, transaction_id: TransactionId, error_message: &str) {
        self.touch(
            transaction_id,
            ActivationState::Failed,
            None,
            Some(error_message.to_string()),
        );
    }

    /// Read an entry
    pub fn get(&self, transaction_id: TransactionId) -> Option<StatusEntry> {
        self.entries.get(&transaction_id).map(|e| e.clone())
    }

    /// Rebuild an entry from the authoritative ledger record
    pub fn reconcile(&self, record: &ActivationRecord, reference: Option<&str>) {
        self.entries.insert(
            record.transaction_id,
            StatusEntry {
                user_id: record.user_id,
                status: record.status,
                amount: record.amount,
                created_at: record.created_at,
                updated_at: record.updated_at,
                reference: reference.map(|r| r.to_string()),
                error_message: record.error_message.clone(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(
        &self,
        transaction_id: TransactionId,
        status: ActivationState,
        reference: Option<String>,
        error_message: Option<String>,
    ) {
        let now = Utc::now();
        match self.entries.get_mut(&transaction_id) {
            Some(mut entry) => {
                entry.status = status;
                entry.updated_at = now;
                if reference.is_some() {
                    entry.reference = reference;
                }
                if error_message.is_some() {
                    entry.error_message = error_message;
                }
            }
            None => {
                // Entry dropped or never seeded; record what we know.
                self.entries.insert(
                    transaction_id,
                    StatusEntry {
                        user_id: 0,
                        status,
                        amount: Decimal::ZERO,
                        created_at: now,
                        updated_at: now,
                        reference,
                        error_message,
                    },
                );
            }
        }
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pending_then_success_keeps_seeded_fields() {
        let cache = StatusCache::new();
        let id = TransactionId::new();
        let created = Utc::now();

        cache.put_pending(id, 42, dec!(20.00), created);
        cache.mark_processing(id);
        cache.mark_success(id, "REF-ABC");

        let entry = cache.get(id).expect("entry");
        assert_eq!(entry.user_id, 42);
        assert_eq!(entry.amount, dec!(20.00));
        assert_eq!(entry.status, ActivationState::Success);
        assert_eq!(entry.reference.as_deref(), Some("REF-ABC"));
        assert!(entry.error_message.is_none());
    }

    #[test]
    fn test_failed_entry_carries_reason() {
        let cache = StatusCache::new();
        let id = TransactionId::new();

        cache.put_pending(id, 7, dec!(9.99), Utc::now());
        cache.mark_failed(id, "Timeout calling partner activation system");

        let entry = cache.get(id).expect("entry");
        assert_eq!(entry.status, ActivationState::Failed);
        assert_eq!(
            entry.error_message.as_deref(),
            Some("Timeout calling partner activation system")
        );
    }

    #[test]
    fn test_mark_without_seed_records_what_is_known() {
        let cache = StatusCache::new();
        let id = TransactionId::new();

        // "Transaction not found" path writes without a prior seed
        cache.mark_failed(id, "Transaction not found");

        let entry = cache.get(id).expect("entry");
        assert_eq!(entry.status, ActivationState::Failed);
    }

    #[test]
    fn test_unknown_id_misses() {
        let cache = StatusCache::new();
        assert!(cache.get(TransactionId::new()).is_none());
        assert!(cache.is_empty());
    }
}
