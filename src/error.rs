//! Pipeline error types

use thiserror::Error;

/// Errors of the activation pipeline.
///
/// `is_retryable` drives the worker's retry decision: permanent
/// rejections drop the job, everything else gets another attempt.
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Insufficient balance")]
    InsufficientFunds,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("System error: {0}")]
    System(String),
}

impl ActivationError {
    /// Permanent rejections are not worth a retry
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ActivationError::NotFound(_) | ActivationError::InsufficientFunds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_api_contract() {
        assert_eq!(
            ActivationError::NotFound("Offer").to_string(),
            "Offer not found"
        );
        assert_eq!(
            ActivationError::NotFound("Transaction").to_string(),
            "Transaction not found"
        );
        assert_eq!(
            ActivationError::InsufficientFunds.to_string(),
            "Insufficient balance"
        );
    }

    #[test]
    fn test_retryability() {
        assert!(!ActivationError::NotFound("Offer").is_retryable());
        assert!(!ActivationError::InsufficientFunds.is_retryable());
        assert!(ActivationError::Database(sqlx::Error::PoolClosed).is_retryable());
        assert!(ActivationError::System("boom".to_string()).is_retryable());
    }
}
