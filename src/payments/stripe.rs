use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::{is_intent_id, PaymentIntent, PaymentProvider, ProviderError, Refund};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// HTTP client for the Stripe REST API (form-encoded requests, basic auth with the secret key).
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    base_url: String,
}

impl StripeClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| {
                    if let Some(kind) = &b.error.kind {
                        warn!(error_type = %kind, "Stripe returned an error");
                    }
                    b.error.message
                })
                .unwrap_or_else(|| format!("Stripe request failed with status {}", status));
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[instrument(skip(self, secret_key))]
    async fn create_intent(
        &self,
        secret_key: &str,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, ProviderError> {
        let params = [
            ("amount", amount_minor.to_string()),
            ("currency", currency.to_string()),
            ("payment_method_types[]", "card".to_string()),
        ];

        let intent: PaymentIntent = self
            .execute(
                self.client
                    .post(self.url("payment_intents"))
                    .basic_auth(secret_key, Some(""))
                    .form(&params),
            )
            .await?;

        info!(payment_intent_id = %intent.id, "PaymentIntent created");
        Ok(intent)
    }

    #[instrument(skip(self, secret_key))]
    async fn retrieve_intent(
        &self,
        secret_key: &str,
        intent_id: &str,
    ) -> Result<PaymentIntent, ProviderError> {
        if !is_intent_id(intent_id) {
            return Err(ProviderError::InvalidRequest(format!(
                "malformed payment intent id {:?}",
                intent_id
            )));
        }
        self.execute(
            self.client
                .get(self.url(&format!("payment_intents/{}", intent_id)))
                .basic_auth(secret_key, Some("")),
        )
        .await
    }

    #[instrument(skip(self, secret_key))]
    async fn create_refund(
        &self,
        secret_key: &str,
        intent_id: &str,
        amount_minor: Option<i64>,
    ) -> Result<Refund, ProviderError> {
        let mut params = vec![("payment_intent", intent_id.to_string())];
        if let Some(amount) = amount_minor {
            params.push(("amount", amount.to_string()));
        }

        let refund: Refund = self
            .execute(
                self.client
                    .post(self.url("refunds"))
                    .basic_auth(secret_key, Some(""))
                    .form(&params),
            )
            .await?;

        info!(refund_id = %refund.id, payment_intent_id = %intent_id, "Refund created");
        Ok(refund)
    }
}
