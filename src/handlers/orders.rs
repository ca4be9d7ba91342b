use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use super::common::ValidJson;
use crate::auth::{AuthRouterExt, AuthUser, ADMIN_ROLE};
use crate::services::orders::{CreateOrderRequest, PaymentResultInput, UpdateOrderStatusRequest};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TrackOrderRequest {
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Order routes, mounted under `/api`.
pub fn order_routes() -> Router<AppState> {
    let public = Router::new().route("/orders/track", post(track_order));

    let customer = Router::new()
        .route("/orders", post(create_order))
        .route("/orders/my-orders", get(list_my_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/pay", put(mark_paid))
        .route("/orders/:id/cancel", put(cancel_order))
        .with_auth();

    let admin = Router::new()
        .route("/orders", get(list_all_orders))
        .route("/orders/:id/deliver", put(mark_delivered))
        .route("/orders/:id/status", put(update_status))
        .with_role(ADMIN_ROLE);

    public.merge(customer).merge(admin)
}

/// POST /api/orders
async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(request): ValidJson<CreateOrderRequest>,
) -> ApiResult<Value> {
    let order = state.services.orders.create_order(&user, request).await?;
    Ok(ApiResponse::new(
        StatusCode::CREATED,
        json!({ "order": order }),
        "Order created successfully",
    ))
}

/// GET /api/orders/my-orders
async fn list_my_orders(State(state): State<AppState>, user: AuthUser) -> ApiResult<Value> {
    let orders = state.services.orders.list_my_orders(&user).await?;
    Ok(ApiResponse::ok(json!({ "orders": orders })))
}

/// GET /api/orders/:id
async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let order = state.services.orders.get_order(&user, &id).await?;
    Ok(ApiResponse::ok(json!({ "order": order })))
}

/// PUT /api/orders/:id/pay
async fn mark_paid(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidJson(result): ValidJson<PaymentResultInput>,
) -> ApiResult<Value> {
    let order = state.services.orders.mark_paid(&user, &id, result).await?;
    Ok(ApiResponse::with_message(
        json!({ "order": order }),
        "Order updated successfully",
    ))
}

/// PUT /api/orders/:id/cancel
async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let order = state.services.orders.cancel_order(&user, &id).await?;
    Ok(ApiResponse::with_message(
        json!({ "order": order }),
        "Order cancelled successfully",
    ))
}

/// GET /api/orders (admin)
async fn list_all_orders(State(state): State<AppState>) -> ApiResult<Value> {
    let orders = state.services.orders.list_all_orders().await?;
    Ok(ApiResponse::ok(json!({ "orders": orders })))
}

/// PUT /api/orders/:id/deliver (admin)
async fn mark_delivered(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let order = state.services.orders.mark_delivered(&id).await?;
    Ok(ApiResponse::with_message(
        json!({ "order": order }),
        "Order updated successfully",
    ))
}

/// PUT /api/orders/:id/status (admin)
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<UpdateOrderStatusRequest>,
) -> ApiResult<Value> {
    let order = state.services.orders.update_status(&id, request).await?;
    Ok(ApiResponse::with_message(
        json!({ "order": order }),
        "Order updated successfully",
    ))
}

/// POST /api/orders/track
async fn track_order(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<TrackOrderRequest>,
) -> ApiResult<Value> {
    let order = state
        .services
        .orders
        .track_order(request.order_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(json!({ "order": order })))
}
