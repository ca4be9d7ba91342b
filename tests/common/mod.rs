#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use serde_json::{json, Value};
use storefront_api::{
    auth::{AuthService, ADMIN_ROLE},
    common::new_object_id,
    config::AppConfig,
    db,
    entities::{gateway_setting, order, product},
    events,
    handlers::AppServices,
    notifications::{Notification, NotificationError, Notifier},
    payments::{PaymentIntent, PaymentProvider, ProviderError, Refund},
    AppState,
};
use tower::ServiceExt;

pub const CUSTOMER_ID: &str = "aaaaaaaaaaaaaaaaaaaaaaaa";
pub const CUSTOMER_EMAIL: &str = "customer@example.com";
pub const OTHER_CUSTOMER_ID: &str = "bbbbbbbbbbbbbbbbbbbbbbbb";
pub const ADMIN_ID: &str = "cccccccccccccccccccccccc";
pub const STRIPE_SECRET_KEY: &str = "sk_test_harness";
pub const WEBHOOK_SECRET: &str = "whsec_harness";

const JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

/// Call recorded by [`FakeProvider`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    CreateIntent { amount_minor: i64, currency: String },
    RetrieveIntent { intent_id: String },
    Refund { intent_id: String, amount_minor: Option<i64> },
}

/// In-process payment provider with scripted refund outcomes.
#[derive(Default)]
pub struct FakeProvider {
    calls: Mutex<Vec<ProviderCall>>,
    refund_results: Mutex<VecDeque<Result<Refund, ProviderError>>>,
    intent_status: Mutex<Option<String>>,
}

impl FakeProvider {
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn refund_calls(&self) -> Vec<ProviderCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ProviderCall::Refund { .. }))
            .collect()
    }

    /// Queues the outcome of the next refund call.
    pub fn push_refund_result(&self, result: Result<Refund, ProviderError>) {
        self.refund_results.lock().unwrap().push_back(result);
    }

    pub fn set_intent_status(&self, status: &str) {
        *self.intent_status.lock().unwrap() = Some(status.to_string());
    }

    fn record(&self, call: ProviderCall) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        calls.len()
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_intent(
        &self,
        _secret_key: &str,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, ProviderError> {
        let n = self.record(ProviderCall::CreateIntent {
            amount_minor,
            currency: currency.to_string(),
        });
        Ok(PaymentIntent {
            id: format!("pi_test_{}", n),
            client_secret: Some(format!("pi_test_{}_secret", n)),
            status: "requires_payment_method".to_string(),
            amount: amount_minor,
            currency: currency.to_string(),
        })
    }

    async fn retrieve_intent(
        &self,
        _secret_key: &str,
        intent_id: &str,
    ) -> Result<PaymentIntent, ProviderError> {
        self.record(ProviderCall::RetrieveIntent {
            intent_id: intent_id.to_string(),
        });
        let status = self
            .intent_status
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "succeeded".to_string());
        Ok(PaymentIntent {
            id: intent_id.to_string(),
            client_secret: None,
            status,
            amount: 0,
            currency: "usd".to_string(),
        })
    }

    async fn create_refund(
        &self,
        _secret_key: &str,
        intent_id: &str,
        amount_minor: Option<i64>,
    ) -> Result<Refund, ProviderError> {
        let n = self.record(ProviderCall::Refund {
            intent_id: intent_id.to_string(),
            amount_minor,
        });
        let scripted = self.refund_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(Refund {
                id: format!("re_test_{}", n),
                status: "succeeded".to_string(),
                amount: amount_minor.unwrap_or_default(),
                payment_intent: Some(intent_id.to_string()),
            })
        })
    }
}

/// Notifier that keeps every message it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Helper harness for spinning up an application state backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub provider: Arc<FakeProvider>,
    pub notifier: Arc<RecordingNotifier>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A single connection keeps every query on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_sender, event_rx) = events::channel();
        let event_sender = Arc::new(event_sender);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let provider = Arc::new(FakeProvider::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let services = AppServices::new(
            db_arc.clone(),
            &cfg,
            provider.clone(),
            notifier.clone(),
            event_sender.clone(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            services,
            auth: Arc::new(AuthService::from_config(&cfg)),
            event_sender,
        };

        Self {
            router: storefront_api::app(state.clone()),
            state,
            provider,
            notifier,
            _event_task: event_task,
        }
    }

    pub fn token_for(&self, user_id: &str, email: Option<&str>, roles: &[&str]) -> String {
        self.state
            .auth
            .issue_token(user_id, email, roles, Duration::hours(1))
            .expect("token")
    }

    pub fn customer_token(&self) -> String {
        self.token_for(CUSTOMER_ID, Some(CUSTOMER_EMAIL), &[])
    }

    pub fn other_customer_token(&self) -> String {
        self.token_for(OTHER_CUSTOMER_ID, Some("other@example.com"), &[])
    }

    pub fn admin_token(&self) -> String {
        self.token_for(ADMIN_ID, Some("admin@example.com"), &[ADMIN_ROLE])
    }

    /// Sends a JSON request and returns the status with the parsed body (`Null` when empty).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.send(request).await
    }

    /// Sends raw bytes with the given headers, as a webhook sender would.
    pub async fn request_raw(
        &self,
        uri: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::from(body)).expect("request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body bytes");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> product::Model {
        let now = Utc::now();
        let id = new_object_id();
        product::ActiveModel {
            id: Set(id.clone()),
            name: Set(name.to_string()),
            slug: Set(format!("{}-{}", name.to_lowercase().replace(' ', "-"), id)),
            description: Set(format!("{} description", name)),
            price: Set(price),
            category: Set("Test".to_string()),
            brand: Set(None),
            images: Set(json!(["/images/test.jpg"])),
            stock: Set(stock),
            discount: Set(0),
            featured: Set(false),
            ratings: Set(0.0),
            num_of_reviews: Set(0),
            created_by: Set(ADMIN_ID.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }

    pub async fn stock_of(&self, product_id: &str) -> i32 {
        product::Entity::find_by_id(product_id.to_string())
            .one(&*self.state.db)
            .await
            .expect("product query")
            .expect("product exists")
            .stock
    }

    pub async fn order_model(&self, order_id: &str) -> order::Model {
        order::Entity::find_by_id(order_id.to_string())
            .one(&*self.state.db)
            .await
            .expect("order query")
            .expect("order exists")
    }

    /// Moves an order's delivery timestamp, keeping its status.
    pub async fn set_delivered_at(&self, order_id: &str, delivered_at: chrono::DateTime<Utc>) {
        let mut active = self.order_model(order_id).await.into_active_model();
        active.delivered_at = Set(Some(delivered_at));
        active.update(&*self.state.db).await.expect("update order");
    }

    /// Records a provider payment reference on the order, as a webhook would.
    pub async fn set_payment_reference(&self, order_id: &str, intent_id: &str) {
        let mut active = self.order_model(order_id).await.into_active_model();
        active.is_paid = Set(true);
        active.paid_at = Set(Some(Utc::now()));
        active.payment_result_id = Set(Some(intent_id.to_string()));
        active.payment_result_status = Set(Some("succeeded".to_string()));
        active.update(&*self.state.db).await.expect("update order");
    }

    /// Stores an active test-mode Stripe gateway with secret and webhook keys.
    pub async fn activate_stripe(&self) {
        let now = Utc::now();
        gateway_setting::ActiveModel {
            id: Set(new_object_id()),
            gateway: Set(gateway_setting::Gateway::Stripe),
            mode: Set(gateway_setting::GatewayMode::Test),
            test_secret_key: Set(Some(STRIPE_SECRET_KEY.to_string())),
            test_publishable_key: Set(Some("pk_test_harness".to_string())),
            test_webhook_secret: Set(Some(WEBHOOK_SECRET.to_string())),
            live_secret_key: Set(None),
            live_publishable_key: Set(None),
            live_webhook_secret: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed gateway setting");
    }

    /// Places an order as the default customer and returns the response body.
    pub async fn place_order(&self, lines: &[(&product::Model, i32)]) -> (StatusCode, Value) {
        let token = self.customer_token();
        self.request(
            Method::POST,
            "/api/orders",
            Some(&token),
            Some(order_payload(lines)),
        )
        .await
    }

    /// Places an order and drives it to `Delivered`, returning its id.
    pub async fn delivered_order(&self, lines: &[(&product::Model, i32)]) -> String {
        let (status, body) = self.place_order(lines).await;
        assert_eq!(status, StatusCode::CREATED, "order creation failed: {body}");
        let order_id = body["data"]["order"]["id"]
            .as_str()
            .expect("order id")
            .to_string();

        let admin = self.admin_token();
        let (status, body) = self
            .request(
                Method::PUT,
                &format!("/api/orders/{}/deliver", order_id),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "deliver failed: {body}");
        order_id
    }
}

/// Checkout body whose price breakdown matches `lines`.
pub fn order_payload(lines: &[(&product::Model, i32)]) -> Value {
    let items_price: Decimal = lines
        .iter()
        .map(|(p, qty)| p.price * Decimal::from(*qty))
        .sum();
    let items: Vec<Value> = lines
        .iter()
        .map(|(p, qty)| {
            json!({
                "product": p.id,
                "quantity": qty,
                "price": p.price.to_string(),
            })
        })
        .collect();

    json!({
        "items": items,
        "shippingAddress": {
            "address": "1 Main St",
            "city": "Springfield",
            "postalCode": "12345",
            "country": "US"
        },
        "paymentMethod": "Stripe",
        "itemsPrice": items_price.to_string(),
        "taxPrice": "0",
        "shippingPrice": "0",
        "totalPrice": items_price.to_string(),
    })
}

/// Parses a decimal that the API serialized as a JSON string or number.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}
