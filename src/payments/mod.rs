//! Payment provider bridge.
//!
//! [`PaymentProvider`] is the seam to the external processor; [`stripe::StripeClient`] speaks
//! the Stripe-compatible HTTP API and [`webhook`] verifies signed event deliveries.
//! Credentials are passed per call because they are read fresh from gateway settings.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod stripe;
pub mod webhook;

pub use stripe::StripeClient;

/// Provider view of a payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub status: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
}

/// Provider view of a refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub payment_intent: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider answered with an error body; `message` is its human-readable text.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Payment provider unreachable: {0}")]
    Transport(String),

    #[error("Unexpected payment provider response: {0}")]
    Decode(String),

    #[error("Invalid payment provider request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Provider message text, used to recognise refunds that were already applied.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// External payment processor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates a card payment intent for `amount_minor` units of `currency`.
    async fn create_intent(
        &self,
        secret_key: &str,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, ProviderError>;

    async fn retrieve_intent(
        &self,
        secret_key: &str,
        intent_id: &str,
    ) -> Result<PaymentIntent, ProviderError>;

    /// Refunds the intent in full when `amount_minor` is `None`.
    async fn create_refund(
        &self,
        secret_key: &str,
        intent_id: &str,
        amount_minor: Option<i64>,
    ) -> Result<Refund, ProviderError>;
}

/// True for ids of the form `pi_<alphanumerics or underscores>`.
pub fn is_intent_id(value: &str) -> bool {
    value
        .strip_prefix("pi_")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_'))
}

/// Converts a major-unit amount to minor units, rounding half away from zero.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}
