/*!
 * # Metrics
 *
 * Prometheus counters for the order, payment and return lifecycle. Counters are
 * registered with the default registry on first use and exposed in text format at
 * `GET /metrics`.
 */

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref ORDERS_CREATED: IntCounter = register_counter(
        "storefront_orders_created_total",
        "Total number of orders created"
    );
    pub static ref ORDER_TRANSITIONS: IntCounterVec = register_counter_vec(
        "storefront_order_transitions_total",
        "Order status transitions by target status",
        &["status"]
    );
    pub static ref PAYMENT_EVENTS: IntCounterVec = register_counter_vec(
        "storefront_payment_events_total",
        "Payment intent lifecycle events by outcome",
        &["outcome"]
    );
    pub static ref REFUNDS_ISSUED: IntCounter = register_counter(
        "storefront_refunds_issued_total",
        "Total number of refunds issued through the payment provider"
    );
    pub static ref RETURN_EVENTS: IntCounterVec = register_counter_vec(
        "storefront_return_events_total",
        "Return requests by status",
        &["status"]
    );
    pub static ref WEBHOOK_EVENTS: IntCounterVec = register_counter_vec(
        "storefront_webhook_events_total",
        "Verified webhook events by type",
        &["event_type"]
    );
}

fn register_counter(name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).expect("metric can be created");
    if let Err(e) = prometheus::register(Box::new(counter.clone())) {
        error!(metric = name, error = %e, "Failed to register metric");
    }
    counter
}

fn register_counter_vec(name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    let counter = IntCounterVec::new(Opts::new(name, help), labels).expect("metric can be created");
    if let Err(e) = prometheus::register(Box::new(counter.clone())) {
        error!(metric = name, error = %e, "Failed to register metric");
    }
    counter
}

/// Forces registration so every counter appears in the first scrape.
pub fn init() {
    lazy_static::initialize(&ORDERS_CREATED);
    lazy_static::initialize(&ORDER_TRANSITIONS);
    lazy_static::initialize(&PAYMENT_EVENTS);
    lazy_static::initialize(&REFUNDS_ISSUED);
    lazy_static::initialize(&RETURN_EVENTS);
    lazy_static::initialize(&WEBHOOK_EVENTS);
}

/// Renders the default registry in Prometheus text format.
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// `GET /metrics`
pub async fn metrics_handler() -> Response {
    match render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_output_contains_lifecycle_counters() {
        init();
        ORDERS_CREATED.inc();
        RETURN_EVENTS.with_label_values(&["Processing"]).inc();

        let text = render().unwrap();
        assert!(text.contains("storefront_orders_created_total"));
        assert!(text.contains("storefront_return_events_total"));
    }
}
