//! Storefront API Library
//!
//! Order, payment and return lifecycle for a single-tenant storefront, plus the catalog,
//! cart and shipping settings that feed checkout.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod notifications;
pub mod payments;
pub mod services;

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use tracing::info;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub auth: Arc<auth::AuthService>,
    pub event_sender: Arc<events::EventSender>,
}

/// Success envelope: `{statusCode, data, message, success}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.is_success(),
        }
    }

    /// `200 OK` with the default message.
    pub fn ok(data: T) -> Self {
        Self::new(StatusCode::OK, data, "Success")
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<ApiResponse<T>, errors::ServiceError>;

/// Every `/api` route.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::orders::order_routes())
        .merge(handlers::payments::payment_routes())
        .merge(handlers::returns::return_routes())
        .merge(handlers::products::product_routes())
        .merge(handlers::reviews::review_routes())
        .merge(handlers::cart::cart_routes())
        .merge(handlers::shipping::shipping_routes())
}

fn cors_layer(config: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        info!("Using permissive CORS because explicit origins were not configured");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Full application router with the HTTP middleware stack applied.
pub fn app(state: AppState) -> Router {
    let auth_service = state.auth.clone();
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/api", api_routes())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(middleware_helpers::configure_http_tracing())
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(cors)
        // Inject AuthService into request extensions for auth middleware
        .layer(axum::middleware::from_fn_with_state(
            auth_service,
            |axum::extract::State(auth): axum::extract::State<Arc<auth::AuthService>>,
             mut req: axum::extract::Request,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_uses_camel_case_keys() {
        let body = serde_json::to_value(ApiResponse::ok(json!({ "x": 1 }))).unwrap();
        assert_eq!(
            body,
            json!({ "statusCode": 200, "data": { "x": 1 }, "message": "Success", "success": true })
        );
    }

    #[test]
    fn created_envelope_carries_status() {
        let response = ApiResponse::new(StatusCode::CREATED, json!({}), "Order created successfully")
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
