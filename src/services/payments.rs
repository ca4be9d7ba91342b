use crate::{
    auth::AuthUser,
    common::{new_object_id, parse_object_id},
    db::DbPool,
    entities::gateway_setting::{self, Gateway},
    entities::order::{Entity as OrderEntity, OrderStatus},
    entities::payment::{self, Entity as PaymentEntity, PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    payments::{is_intent_id, to_minor_units, webhook, PaymentProvider, Refund},
    services::gateway_settings::GatewayConfigProvider,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
use tracing::{error, info, instrument, warn};

const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
const PAYMENT_FAILED: &str = "payment_intent.payment_failed";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    pub amount: Decimal,
    pub order_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub payment_intent_id: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// Resolved Stripe credentials for one operation.
struct StripeCredentials {
    setting: gateway_setting::Model,
    secret_key: String,
}

/// Bridge between orders and the external payment processor.
#[derive(Clone)]
pub struct PaymentService {
    db_pool: Arc<DbPool>,
    provider: Arc<dyn PaymentProvider>,
    gateways: Arc<dyn GatewayConfigProvider>,
    fallback_webhook_secret: Option<String>,
    webhook_tolerance_secs: u64,
    currency: String,
    event_sender: Arc<EventSender>,
}

impl PaymentService {
    pub fn new(
        db_pool: Arc<DbPool>,
        provider: Arc<dyn PaymentProvider>,
        gateways: Arc<dyn GatewayConfigProvider>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db_pool,
            provider,
            gateways,
            fallback_webhook_secret: None,
            webhook_tolerance_secs: webhook::DEFAULT_TOLERANCE_SECS,
            currency: "usd".to_string(),
            event_sender,
        }
    }

    /// Secret used when the active gateway has no webhook secret for its mode.
    pub fn with_fallback_webhook_secret(mut self, secret: Option<String>) -> Self {
        self.fallback_webhook_secret = secret.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_webhook_tolerance(mut self, tolerance_secs: u64) -> Self {
        self.webhook_tolerance_secs = tolerance_secs;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into().to_ascii_lowercase();
        self
    }

    async fn stripe_credentials(&self) -> Result<StripeCredentials, ServiceError> {
        let setting = self
            .gateways
            .active_gateway(Gateway::Stripe)
            .await?
            .ok_or_else(|| {
                ServiceError::GatewayNotConfigured(
                    "Stripe payment gateway is not configured or active".to_string(),
                )
            })?;

        let secret_key = setting
            .secret_key()
            .map(str::to_string)
            .ok_or_else(|| {
                ServiceError::GatewayNotConfigured(format!(
                    "Stripe {} secret key is missing",
                    setting.mode
                ))
            })?;

        Ok(StripeCredentials {
            setting,
            secret_key,
        })
    }

    /// Creates a provider payment intent for an order and records it as pending.
    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id, order_id = %request.order_id))]
    pub async fn create_intent(
        &self,
        actor: &AuthUser,
        request: CreateIntentRequest,
    ) -> Result<CreateIntentResponse, ServiceError> {
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Amount must be greater than zero".to_string(),
            ));
        }
        let amount_minor = to_minor_units(request.amount)
            .ok_or_else(|| ServiceError::ValidationError("Amount is out of range".to_string()))?;

        let order_id = parse_object_id(&request.order_id, "Invalid order ID format")?;
        let db = &*self.db_pool;
        let order = OrderEntity::find_by_id(order_id.clone())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if !actor.can_access(&order.user_id) {
            return Err(ServiceError::Forbidden("Access forbidden".to_string()));
        }

        let credentials = self.stripe_credentials().await?;
        let intent = self
            .provider
            .create_intent(&credentials.secret_key, amount_minor, &self.currency)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Payment intent creation failed");
                ServiceError::GatewayError(e.message())
            })?;

        let now = Utc::now();
        payment::ActiveModel {
            id: Set(new_object_id()),
            user_id: Set(actor.user_id.clone()),
            order_id: Set(order_id.clone()),
            payment_intent_id: Set(intent.id.clone()),
            amount: Set(request.amount),
            currency: Set(self.currency.clone()),
            status: Set(PaymentStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(
            order_id = %order_id,
            payment_intent_id = %intent.id,
            mode = %credentials.setting.mode,
            "Payment intent created"
        );
        self.event_sender
            .send_or_log(Event::PaymentIntentCreated {
                order_id,
                payment_intent_id: intent.id.clone(),
            })
            .await;

        Ok(CreateIntentResponse {
            client_secret: intent.client_secret,
            payment_intent_id: intent.id,
        })
    }

    /// Syncs the local payment record with the provider's view of the intent and returns the
    /// provider status.
    #[instrument(skip(self))]
    pub async fn confirm(&self, payment_intent_id: &str) -> Result<String, ServiceError> {
        if !is_intent_id(payment_intent_id) {
            return Err(ServiceError::ValidationError(
                "Invalid payment intent ID".to_string(),
            ));
        }
        let credentials = self.stripe_credentials().await?;
        let intent = self
            .provider
            .retrieve_intent(&credentials.secret_key, payment_intent_id)
            .await
            .map_err(|e| ServiceError::GatewayError(e.message()))?;

        let db = &*self.db_pool;
        let local = PaymentEntity::find()
            .filter(payment::Column::PaymentIntentId.eq(payment_intent_id))
            .one(db)
            .await?;

        match local {
            Some(record) => {
                let status = PaymentStatus::from_provider_status(&intent.status);
                let mut active = record.into_active_model();
                active.status = Set(status);
                active.updated_at = Set(Utc::now());
                active.update(db).await?;
                info!(payment_intent_id, status = %status, "Payment status synced");
            }
            None => warn!(payment_intent_id, "No local payment record for intent"),
        }

        Ok(intent.status)
    }

    /// Verifies and applies a signed provider event.
    #[instrument(skip(self, payload, signature))]
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> Result<(), ServiceError> {
        let setting = self
            .gateways
            .active_gateway(Gateway::Stripe)
            .await?
            .ok_or_else(|| {
                ServiceError::SignatureInvalid(
                    "Webhook signature verification failed: Stripe gateway not active"
                        .to_string(),
                )
            })?;

        let secret = match setting.webhook_secret() {
            Some(secret) => secret.to_string(),
            None => {
                warn!(mode = %setting.mode, "No webhook secret for gateway mode; using configured fallback");
                self.fallback_webhook_secret.clone().unwrap_or_default()
            }
        };

        let event = webhook::construct_event(
            payload,
            signature,
            &secret,
            self.webhook_tolerance_secs,
            Utc::now().timestamp(),
        )
        .map_err(|e| {
            warn!(error = %e, "Webhook rejected");
            ServiceError::SignatureInvalid(format!("Webhook signature verification failed: {}", e))
        })?;

        info!(event_id = %event.id, event_type = %event.event_type, "Webhook received");

        match (event.event_type.as_str(), event.object_id()) {
            (PAYMENT_SUCCEEDED, Some(intent_id)) => self.apply_payment_succeeded(intent_id).await?,
            (PAYMENT_FAILED, Some(intent_id)) => self.apply_payment_failed(intent_id).await?,
            (other, _) => info!(event_type = other, "Unhandled webhook event type"),
        }

        self.event_sender
            .send_or_log(Event::WebhookReceived {
                event_type: event.event_type,
            })
            .await;
        Ok(())
    }

    async fn apply_payment_succeeded(&self, intent_id: &str) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;

        let record = match PaymentEntity::find()
            .filter(payment::Column::PaymentIntentId.eq(intent_id))
            .one(&txn)
            .await?
        {
            Some(record) => record,
            None => {
                warn!(payment_intent_id = intent_id, "Succeeded event for unknown intent");
                return Ok(());
            }
        };

        let now = Utc::now();
        let order_id = record.order_id.clone();
        let mut active = record.into_active_model();
        active.status = Set(PaymentStatus::Succeeded);
        active.updated_at = Set(now);
        active.update(&txn).await?;

        if let Some(order) = OrderEntity::find_by_id(order_id.clone()).one(&txn).await? {
            let was_cancelled = order.status == OrderStatus::Cancelled;
            let mut active = order.into_active_model();
            active.is_paid = Set(true);
            active.paid_at = Set(Some(now));
            if !was_cancelled {
                active.status = Set(OrderStatus::Processing);
            }
            active.payment_result_id = Set(Some(intent_id.to_string()));
            active.payment_result_status = Set(Some("succeeded".to_string()));
            active.updated_at = Set(now);
            active.update(&txn).await?;
        } else {
            warn!(order_id = %order_id, "Payment references a missing order");
        }

        txn.commit().await?;

        info!(payment_intent_id = intent_id, order_id = %order_id, "Payment succeeded");
        self.event_sender
            .send_or_log(Event::PaymentSucceeded {
                payment_intent_id: intent_id.to_string(),
            })
            .await;
        Ok(())
    }

    async fn apply_payment_failed(&self, intent_id: &str) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let Some(record) = PaymentEntity::find()
            .filter(payment::Column::PaymentIntentId.eq(intent_id))
            .one(db)
            .await?
        else {
            warn!(payment_intent_id = intent_id, "Failure event for unknown intent");
            return Ok(());
        };

        let mut active = record.into_active_model();
        active.status = Set(PaymentStatus::Failed);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;

        info!(payment_intent_id = intent_id, "Payment failed");
        self.event_sender
            .send_or_log(Event::PaymentFailed {
                payment_intent_id: intent_id.to_string(),
            })
            .await;
        Ok(())
    }

    /// Refunds an intent, in full when `amount` is `None`.
    #[instrument(skip(self))]
    pub async fn refund(
        &self,
        payment_intent_id: &str,
        amount: Option<Decimal>,
    ) -> Result<Refund, ServiceError> {
        let amount_minor = match amount {
            Some(amount) if amount <= Decimal::ZERO => {
                return Err(ServiceError::ValidationError(
                    "Refund amount must be greater than zero".to_string(),
                ))
            }
            Some(amount) => Some(to_minor_units(amount).ok_or_else(|| {
                ServiceError::ValidationError("Refund amount is out of range".to_string())
            })?),
            None => None,
        };

        let credentials = self.stripe_credentials().await?;
        let refund = self
            .provider
            .create_refund(&credentials.secret_key, payment_intent_id, amount_minor)
            .await
            .map_err(|e| {
                error!(error = %e, payment_intent_id, "Refund failed");
                ServiceError::RefundFailed(e.message())
            })?;

        info!(payment_intent_id, refund_id = %refund.id, "Refund issued");
        self.event_sender
            .send_or_log(Event::RefundIssued {
                payment_intent_id: payment_intent_id.to_string(),
                refund_id: refund.id.clone(),
            })
            .await;

        Ok(refund)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::gateway_setting::GatewayMode;
    use crate::events;
    use crate::payments::{MockPaymentProvider, ProviderError};
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    struct StaticGateway(Option<gateway_setting::Model>);

    #[async_trait]
    impl GatewayConfigProvider for StaticGateway {
        async fn active_gateway(
            &self,
            _gateway: Gateway,
        ) -> Result<Option<gateway_setting::Model>, ServiceError> {
            Ok(self.0.clone())
        }
    }

    fn setting(secret: Option<&str>) -> gateway_setting::Model {
        let now = Utc::now();
        gateway_setting::Model {
            id: new_object_id(),
            gateway: Gateway::Stripe,
            mode: GatewayMode::Test,
            test_secret_key: secret.map(str::to_string),
            test_publishable_key: None,
            test_webhook_secret: None,
            live_secret_key: None,
            live_publishable_key: None,
            live_webhook_secret: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    async fn service(
        provider: MockPaymentProvider,
        gateway: Option<gateway_setting::Model>,
    ) -> PaymentService {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        let (sender, _rx) = events::channel();
        PaymentService::new(
            Arc::new(db),
            Arc::new(provider),
            Arc::new(StaticGateway(gateway)),
            Arc::new(sender),
        )
    }

    #[tokio::test]
    async fn missing_gateway_is_reported_before_provider_calls() {
        let svc = service(MockPaymentProvider::new(), None).await;
        assert_matches!(
            svc.refund("pi_1", None).await,
            Err(ServiceError::GatewayNotConfigured(msg))
                if msg == "Stripe payment gateway is not configured or active"
        );

        let svc = service(MockPaymentProvider::new(), Some(setting(Some("  ")))).await;
        assert_matches!(
            svc.refund("pi_1", None).await,
            Err(ServiceError::GatewayNotConfigured(msg)) if msg == "Stripe test secret key is missing"
        );
    }

    #[tokio::test]
    async fn partial_refund_is_sent_in_minor_units() {
        let mut provider = MockPaymentProvider::new();
        provider
            .expect_create_refund()
            .withf(|key, intent, amount| key == "sk_test_1" && intent == "pi_1" && *amount == Some(1050))
            .times(1)
            .returning(|_, intent, amount| {
                Ok(Refund {
                    id: "re_1".into(),
                    status: "succeeded".into(),
                    amount: amount.unwrap_or_default(),
                    payment_intent: Some(intent.to_string()),
                })
            });

        let svc = service(provider, Some(setting(Some("sk_test_1")))).await;
        let refund = svc
            .refund("pi_1", Some(rust_decimal_macros::dec!(10.5)))
            .await
            .unwrap();
        assert_eq!(refund.id, "re_1");
    }

    #[tokio::test]
    async fn provider_refund_errors_carry_provider_message() {
        let mut provider = MockPaymentProvider::new();
        provider.expect_create_refund().returning(|_, _, _| {
            Err(ProviderError::Api {
                status: 400,
                message: "Charge ch_1 has already been refunded.".into(),
            })
        });

        let svc = service(provider, Some(setting(Some("sk_test_1")))).await;
        assert_matches!(
            svc.refund("pi_1", None).await,
            Err(ServiceError::RefundFailed(msg)) if msg.contains("already been refunded")
        );
    }

    #[tokio::test]
    async fn webhook_without_active_gateway_is_rejected() {
        let svc = service(MockPaymentProvider::new(), None).await;
        assert_matches!(
            svc.handle_webhook(b"{}", "t=1,v1=00").await,
            Err(ServiceError::SignatureInvalid(msg))
                if msg == "Webhook signature verification failed: Stripe gateway not active"
        );
    }
}
