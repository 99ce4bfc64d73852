//! Partner gateway
//!
//! The partner performs the actual activation and returns a `reference`,
//! the proof-of-activation token. Two interchangeable implementations:
//! [`RemotePartnerGateway`] drives a partner HTTP API, [`LocalPartnerGateway`]
//! records the partner-of-record in-process. The variant is chosen at
//! configuration time; the orchestrator only sees the trait.
//!
//! Boundary contract: `activate` never returns an error. Every failure mode
//! maps to [`GatewayOutcome::Failed`] with a structured reason, and
//! `Success` implies a persisted, independently re-readable
//! proof-of-activation record.

mod local;
mod remote;

use async_trait::async_trait;

use crate::activation::ActivationRecord;

pub use local::LocalPartnerGateway;
pub use remote::RemotePartnerGateway;

/// Structured result of a partner activation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// Reference obtained and independently validated
    Success { reference: String },
    /// Any failure: validation mismatch, network error, bad response
    Failed { reason: String },
}

impl GatewayOutcome {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, GatewayOutcome::Success { .. })
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        GatewayOutcome::Failed {
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait PartnerGateway: Send + Sync {
    fn name(&self) -> &'static str;

    /// Activate the offer behind `record` with the partner system.
    async fn activate(&self, record: &ActivationRecord) -> GatewayOutcome;
}

/// Generate a partner reference token (`REF-` + 12 hex chars)
pub(crate) fn generate_reference() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("REF-{}", hex[..12].to_uppercase())
}

/// Scripted gateway for tests: returns a fixed sequence of outcomes.
pub struct MockGateway {
    outcomes: std::sync::Mutex<Vec<GatewayOutcome>>,
    pub calls: std::sync::atomic::AtomicUsize,
}

impl MockGateway {
    /// Outcomes are returned in order; the last one repeats.
    pub fn with_outcomes(outcomes: Vec<GatewayOutcome>) -> Self {
        Self {
            outcomes: std::sync::Mutex::new(outcomes),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn succeeding(reference: &str) -> Self {
        Self::with_outcomes(vec![GatewayOutcome::Success {
            reference: reference.to_string(),
        }])
    }

    pub fn failing(reason: &str) -> Self {
        Self::with_outcomes(vec![GatewayOutcome::failed(reason)])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl PartnerGateway for MockGateway {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn activate(&self, _record: &ActivationRecord) -> GatewayOutcome {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.len() > 1 {
            outcomes.remove(0)
        } else {
            outcomes[0].clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_format() {
        let reference = generate_reference();
        assert!(reference.starts_with("REF-"));
        assert_eq!(reference.len(), 16);
        assert!(reference[4..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(reference, generate_reference());
    }

    #[test]
    fn test_outcome_helpers() {
        assert!(GatewayOutcome::Success {
            reference: "REF-ABC".to_string()
        }
        .is_success());
        assert!(!GatewayOutcome::failed("nope").is_success());
    }

    #[tokio::test]
    async fn test_mock_gateway_sequences_outcomes() {
        let gateway = MockGateway::with_outcomes(vec![
            GatewayOutcome::failed("first"),
            GatewayOutcome::Success {
                reference: "REF-OK".to_string(),
            },
        ]);

        let record = crate::activation::ActivationRecord {
            transaction_id: crate::activation::TransactionId::new(),
            user_id: 1,
            offer_id: 1,
            amount: rust_decimal::Decimal::ZERO,
            status: crate::activation::ActivationState::Processing,
            error_message: None,
            retry_count: 0,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            completed_at: None,
        };

        assert!(!gateway.activate(&record).await.is_success());
        assert!(gateway.activate(&record).await.is_success());
        // last outcome repeats
        assert!(gateway.activate(&record).await.is_success());
        assert_eq!(gateway.call_count(), 3);
    }
}
