use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Customer-facing messages sent on order lifecycle events.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    OrderConfirmation {
        to: String,
        order_id: String,
        total_price: Decimal,
    },
    ShippingUpdate {
        to: String,
        order_id: String,
        tracking_number: Option<String>,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Self::OrderConfirmation { to, .. } | Self::ShippingUpdate { to, .. } => to,
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderConfirmation { .. } => "Order Confirmation",
            Self::ShippingUpdate { .. } => "Your Order Has Shipped",
        }
    }

    pub fn html_body(&self) -> String {
        match self {
            Self::OrderConfirmation {
                order_id,
                total_price,
                ..
            } => format!(
                "<h1>Order Confirmed!</h1>\
                 <p>Thank you for your order. Your order ID is: {}</p>\
                 <p>Total Amount: ${:.2}</p>\
                 <p>We'll send you another email when your order ships.</p>",
                order_id, total_price
            ),
            Self::ShippingUpdate {
                order_id,
                tracking_number,
                ..
            } => format!(
                "<h1>Your Order Has Shipped!</h1>\
                 <p>Your order (ID: {}) has been shipped.</p>\
                 <p>Tracking Number: {}</p>\
                 <p>Thank you for shopping with us!</p>",
                order_id,
                tracking_number.as_deref().unwrap_or("N/A")
            ),
        }
    }
}

/// Notification delivery errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Relay rejected message with status {0}")]
    Rejected(u16),
}

/// Outbound delivery channel for [`Notification`]s.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Delivers a notification, logging failures instead of returning them.
pub async fn notify_best_effort(notifier: &dyn Notifier, notification: Notification) {
    if let Err(e) = notifier.send(&notification).await {
        warn!(
            subject = notification.subject(),
            to = notification.recipient(),
            error = %e,
            "Notification delivery failed"
        );
    }
}

/// Writes notifications to the log. Used when no relay is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            to = notification.recipient(),
            subject = notification.subject(),
            "Notification (log only)"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: String,
}

/// Posts notifications as JSON to a mail relay endpoint.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    from: String,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>, from: impl Into<String>) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            from: from.into(),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    #[instrument(skip(self, notification), fields(subject = notification.subject()))]
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let message = RelayMessage {
            from: &self.from,
            to: notification.recipient(),
            subject: notification.subject(),
            html: notification.html_body(),
        };

        let response = self.client.post(&self.endpoint).json(&message).send().await?;
        if !response.status().is_success() {
            return Err(NotificationError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}
