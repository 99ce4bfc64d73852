//! Remote partner gateway (HTTP)

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::activation::ActivationRecord;
use crate::config::PartnerConfig;
use crate::error::ActivationError;

use super::{GatewayOutcome, PartnerGateway};

#[derive(Debug, Serialize)]
struct ActivationPayload {
    user_id: i64,
    offer_id: i64,
    amount: f64,
}

#[derive(Debug, Deserialize)]
struct ActivationResponse {
    reference: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValidationResponse {
    #[serde(default)]
    is_valid: bool,
}

/// Partner gateway backed by the partner HTTP API.
///
/// Activation is a POST with bearer auth and a fixed timeout; the returned
/// reference is then confirmed through the validation endpoint before the
/// call is considered successful.
pub struct RemotePartnerGateway {
    client: reqwest::Client,
    activation_url: String,
    validation_url: String,
    api_key: String,
}

impl RemotePartnerGateway {
    pub fn new(config: &PartnerConfig) -> Result<Self, ActivationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("offerflow/1.0")
            .build()
            .map_err(|e| ActivationError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            activation_url: config.activation_url.clone(),
            validation_url: config.validation_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Confirm a reference through the validation endpoint.
    ///
    /// Validation is a read: re-validating an already-validated reference is
    /// a no-op on the partner side.
    async fn validate_reference(&self, reference: &str) -> bool {
        let url = format!("{}/{}/", self.validation_url, reference);
        debug!(reference = %reference, url = %url, "Validating partner reference");

        let response = match self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!(reference = %reference, error = %e, "Error validating partner reference");
                return false;
            }
        };

        if response.status() != reqwest::StatusCode::OK {
            error!(
                reference = %reference,
                status = %response.status(),
                "Validation endpoint returned non-200"
            );
            return false;
        }

        match response.json::<ValidationResponse>().await {
            Ok(v) => v.is_valid,
            Err(e) => {
                error!(reference = %reference, error = %e, "Invalid JSON from validation endpoint");
                false
            }
        }
    }
}

#[async_trait]
impl PartnerGateway for RemotePartnerGateway {
    fn name(&self) -> &'static str {
        "Remote"
    }

    async fn activate(&self, record: &ActivationRecord) -> GatewayOutcome {
        let payload = ActivationPayload {
            user_id: record.user_id,
            offer_id: record.offer_id,
            amount: record.amount.to_f64().unwrap_or_default(),
        };

        let url = format!("{}/", self.activation_url);
        info!(
            transaction_id = %record.transaction_id,
            url = %url,
            "Calling partner activation endpoint"
        );

        let response = match self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                error!(transaction_id = %record.transaction_id, "Partner activation timed out");
                return GatewayOutcome::failed("Timeout calling partner activation system");
            }
            Err(e) if e.is_connect() => {
                error!(transaction_id = %record.transaction_id, error = %e, "Partner connection error");
                return GatewayOutcome::failed("Connection error with partner activation system");
            }
            Err(e) => {
                error!(transaction_id = %record.transaction_id, error = %e, "Partner request error");
                return GatewayOutcome::failed(format!("Request error: {}", e));
            }
        };

        let status = response.status();
        if status != reqwest::StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            error!(
                transaction_id = %record.transaction_id,
                status = %status,
                body = %body,
                "Partner activation returned error status"
            );
            let detail = serde_json::from_str::<ActivationResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or(body);
            return GatewayOutcome::failed(format!(
                "Partner system error: {} - {}",
                status.as_u16(),
                detail
            ));
        }

        let parsed = match response.json::<ActivationResponse>().await {
            Ok(p) => p,
            Err(e) => {
                error!(transaction_id = %record.transaction_id, error = %e, "Non-JSON partner response");
                return GatewayOutcome::failed("Invalid response format from partner system");
            }
        };

        let Some(reference) = parsed.reference.filter(|r| !r.is_empty()) else {
            warn!(transaction_id = %record.transaction_id, "Partner response missing reference");
            return GatewayOutcome::failed("Invalid reference received from partner system");
        };

        if !self.validate_reference(&reference).await {
            warn!(
                transaction_id = %record.transaction_id,
                reference = %reference,
                "Partner reference failed validation"
            );
            return GatewayOutcome::failed("Invalid reference received from partner system");
        }

        info!(
            transaction_id = %record.transaction_id,
            reference = %reference,
            "Partner activation validated"
        );
        GatewayOutcome::Success { reference }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PartnerConfig;

    #[test]
    fn test_gateway_builds_from_config() {
        let config = PartnerConfig::default();
        let gateway = RemotePartnerGateway::new(&config).expect("client builds");
        assert_eq!(gateway.name(), "Remote");
    }

    #[test]
    fn test_activation_payload_shape() {
        let payload = ActivationPayload {
            user_id: 7,
            offer_id: 3,
            amount: 19.99,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["user_id"], 7);
        assert_eq!(json["offer_id"], 3);
        assert_eq!(json["amount"], 19.99);
    }

    #[test]
    fn test_validation_response_defaults_to_invalid() {
        let parsed: ValidationResponse = serde_json::from_str("{}").unwrap();
        assert!(!parsed.is_valid);

        let parsed: ValidationResponse = serde_json::from_str(r#"{"is_valid": true}"#).unwrap();
        assert!(parsed.is_valid);
    }
}
