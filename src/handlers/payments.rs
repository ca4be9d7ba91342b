use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde_json::{json, Value};

use super::common::ValidJson;
use crate::auth::{AuthRouterExt, AuthUser, ADMIN_ROLE};
use crate::errors::ServiceError;
use crate::services::gateway_settings::UpsertGatewaySettingRequest;
use crate::services::payments::{ConfirmPaymentRequest, CreateIntentRequest, RefundRequest};
use crate::{ApiResponse, ApiResult, AppState};

/// Name of the header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Payment routes, mounted under `/api`.
pub fn payment_routes() -> Router<AppState> {
    // Signature-verified instead of token-authenticated.
    let webhook = Router::new().route("/payment/webhook", post(webhook));

    let customer = Router::new()
        .route("/payment/create-intent", post(create_intent))
        .route("/payment/confirm", post(confirm_payment))
        .route("/payment/active", get(active_gateways))
        .with_auth();

    let admin = Router::new()
        .route("/payment/refund", post(refund))
        .route("/payment/settings", get(list_settings).post(upsert_setting))
        .with_role(ADMIN_ROLE);

    webhook.merge(customer).merge(admin)
}

/// POST /api/payment/create-intent
async fn create_intent(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(request): ValidJson<CreateIntentRequest>,
) -> ApiResult<Value> {
    let intent = state.services.payments.create_intent(&user, request).await?;
    Ok(ApiResponse::with_message(
        json!(intent),
        "Payment intent created",
    ))
}

/// POST /api/payment/confirm
async fn confirm_payment(
    State(state): State<AppState>,
    _user: AuthUser,
    ValidJson(request): ValidJson<ConfirmPaymentRequest>,
) -> ApiResult<Value> {
    let status = state
        .services
        .payments
        .confirm(&request.payment_intent_id)
        .await?;
    Ok(ApiResponse::with_message(
        json!({ "status": status }),
        "Payment confirmed",
    ))
}

/// POST /api/payment/webhook
///
/// Takes the raw body; the signature covers the exact bytes sent.
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ServiceError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    state
        .services
        .payments
        .handle_webhook(&body, signature)
        .await?;
    Ok(Json(json!({ "received": true })))
}

/// POST /api/payment/refund (admin)
async fn refund(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<RefundRequest>,
) -> ApiResult<Value> {
    let refund = state
        .services
        .payments
        .refund(&request.payment_intent_id, request.amount)
        .await?;
    Ok(ApiResponse::with_message(
        json!({ "refund": refund }),
        "Refund processed successfully",
    ))
}

/// GET /api/payment/active
async fn active_gateways(State(state): State<AppState>, _user: AuthUser) -> ApiResult<Value> {
    let gateways = state.services.gateway_settings.list_active_public().await?;
    Ok(ApiResponse::ok(json!({ "gateways": gateways })))
}

/// GET /api/payment/settings (admin)
async fn list_settings(State(state): State<AppState>) -> ApiResult<Value> {
    let settings = state.services.gateway_settings.list_all().await?;
    Ok(ApiResponse::ok(json!({ "settings": settings })))
}

/// POST /api/payment/settings (admin)
async fn upsert_setting(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<UpsertGatewaySettingRequest>,
) -> ApiResult<Value> {
    let setting = state.services.gateway_settings.upsert(request).await?;
    Ok(ApiResponse::with_message(
        json!({ "setting": setting }),
        "Payment settings updated successfully",
    ))
}
