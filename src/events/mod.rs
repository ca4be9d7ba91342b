use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::metrics;

/// Capacity of the in-process event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the processor is gone.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropping domain event");
        }
    }
}

/// Creates a sender and its receiving end, to be driven by [`process_events`].
pub fn channel() -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    (EventSender::new(tx), rx)
}

/// Domain events emitted after a state change has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: String,
        total_price: Decimal,
    },
    OrderPaid(String),
    OrderCancelled(String),
    OrderStatusChanged {
        order_id: String,
        old_status: String,
        new_status: String,
    },
    OrderDelivered(String),

    PaymentIntentCreated {
        order_id: String,
        payment_intent_id: String,
    },
    PaymentSucceeded {
        payment_intent_id: String,
    },
    PaymentFailed {
        payment_intent_id: String,
    },
    RefundIssued {
        payment_intent_id: String,
        refund_id: String,
    },
    WebhookReceived {
        event_type: String,
    },

    ReturnRequested {
        return_id: String,
        order_id: String,
    },
    ReturnStatusChanged {
        return_id: String,
        new_status: String,
    },
}

/// Consumes events until every sender is dropped, logging each one and updating counters.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!(?event, "Received event");
        record(&event);
    }

    info!("Event processing loop stopped");
}

fn record(event: &Event) {
    match event {
        Event::OrderCreated { .. } => metrics::ORDERS_CREATED.inc(),
        Event::OrderPaid(_) => metrics::ORDER_TRANSITIONS
            .with_label_values(&["Paid"])
            .inc(),
        Event::OrderCancelled(_) => metrics::ORDER_TRANSITIONS
            .with_label_values(&["Cancelled"])
            .inc(),
        Event::OrderStatusChanged { new_status, .. } => metrics::ORDER_TRANSITIONS
            .with_label_values(&[new_status.as_str()])
            .inc(),
        Event::OrderDelivered(_) => metrics::ORDER_TRANSITIONS
            .with_label_values(&["Delivered"])
            .inc(),
        Event::PaymentIntentCreated { .. } => metrics::PAYMENT_EVENTS
            .with_label_values(&["intent_created"])
            .inc(),
        Event::PaymentSucceeded { .. } => metrics::PAYMENT_EVENTS
            .with_label_values(&["succeeded"])
            .inc(),
        Event::PaymentFailed { .. } => metrics::PAYMENT_EVENTS
            .with_label_values(&["failed"])
            .inc(),
        Event::RefundIssued { .. } => metrics::REFUNDS_ISSUED.inc(),
        Event::WebhookReceived { event_type } => metrics::WEBHOOK_EVENTS
            .with_label_values(&[event_type.as_str()])
            .inc(),
        Event::ReturnRequested { .. } => metrics::RETURN_EVENTS
            .with_label_values(&["Processing"])
            .inc(),
        Event::ReturnStatusChanged { new_status, .. } => metrics::RETURN_EVENTS
            .with_label_values(&[new_status.as_str()])
            .inc(),
    }
}
