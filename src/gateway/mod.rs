//! Payment gateway adapter
//!
//! Translates ledger intents into the processor's hold/capture/refund and
//! transfer primitives. Each call is a single external round trip with
//! pass-through error propagation; retries belong to the caller. A
//! timed-out call must be treated as unknown-outcome and re-verified, never
//! assumed failed.

use axum::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Gateway errors. The processor's error detail is preserved verbatim and
/// never interpreted by the ledger beyond "non-ok".
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway rejected {operation}: {detail}")]
    Rejected {
        operation: &'static str,
        detail: String,
    },
}

/// Metadata attached to a hold so the processor's dashboard can trace it
#[derive(Debug, Clone, Copy)]
pub struct HoldMetadata {
    pub campaign_id: Uuid,
    pub backer_id: Uuid,
}

/// Processor boundary consumed by the pledge ledger and sweep job
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Reserve funds without charging; returns the processor's hold id
    async fn create_hold(
        &self,
        amount: i64,
        metadata: HoldMetadata,
    ) -> Result<String, GatewayError>;

    /// Convert a hold into an actual charge
    async fn capture(&self, hold_id: &str) -> Result<(), GatewayError>;

    /// Release a hold back to the backer
    async fn refund(&self, hold_id: &str) -> Result<(), GatewayError>;

    /// Pay out to a connected account; returns the transfer id
    async fn transfer(
        &self,
        amount: i64,
        destination: &str,
        campaign_id: Uuid,
    ) -> Result<String, GatewayError>;
}

/// Stripe implementation over its REST API. A hold is a manual-capture
/// PaymentIntent.
pub struct StripeGateway {
    client: Client,
    secret_key: String,
    currency: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct StripeObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
    code: Option<String>,
}

impl StripeGateway {
    pub fn new(secret_key: String, currency: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            secret_key,
            currency,
            base_url: "https://api.stripe.com".to_string(),
        }
    }

    /// Override the API host, for tests against a local stub
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn post(
        &self,
        operation: &'static str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<StripeObject, GatewayError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(params)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(response.json::<StripeObject>().await?);
        }

        let status = response.status();
        let detail = response
            .json::<StripeErrorBody>()
            .await
            .ok()
            .map(|body| {
                body.error
                    .message
                    .or(body.error.code)
                    .unwrap_or_else(|| format!("http {}", status))
            })
            .unwrap_or_else(|| format!("http {}", status));

        Err(GatewayError::Rejected { operation, detail })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_hold(
        &self,
        amount: i64,
        metadata: HoldMetadata,
    ) -> Result<String, GatewayError> {
        let params = [
            ("amount", amount.to_string()),
            ("currency", self.currency.clone()),
            // Manual capture keeps the funds in escrow until lock-in
            ("capture_method", "manual".to_string()),
            ("metadata[campaign_id]", metadata.campaign_id.to_string()),
            ("metadata[backer_id]", metadata.backer_id.to_string()),
            ("metadata[type]", "deposit".to_string()),
        ];

        let intent = self
            .post("create_hold", "/v1/payment_intents", &params)
            .await?;

        Ok(intent.id)
    }

    async fn capture(&self, hold_id: &str) -> Result<(), GatewayError> {
        self.post(
            "capture",
            &format!("/v1/payment_intents/{}/capture", hold_id),
            &[],
        )
        .await?;

        Ok(())
    }

    async fn refund(&self, hold_id: &str) -> Result<(), GatewayError> {
        let params = [("payment_intent", hold_id.to_string())];
        self.post("refund", "/v1/refunds", &params).await?;

        Ok(())
    }

    async fn transfer(
        &self,
        amount: i64,
        destination: &str,
        campaign_id: Uuid,
    ) -> Result<String, GatewayError> {
        let params = [
            ("amount", amount.to_string()),
            ("currency", self.currency.clone()),
            ("destination", destination.to_string()),
            ("metadata[campaign_id]", campaign_id.to_string()),
        ];

        let transfer = self.post("transfer", "/v1/transfers", &params).await?;

        Ok(transfer.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_error_preserves_detail() {
        let err = GatewayError::Rejected {
            operation: "capture",
            detail: "card_declined".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("capture"));
        assert!(text.contains("card_declined"));
    }
}
