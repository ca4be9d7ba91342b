use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};

use super::common::ValidJson;
use crate::auth::{AuthRouterExt, AuthUser};
use crate::services::cart::{AddToCartRequest, UpdateCartItemRequest};
use crate::{ApiResponse, ApiResult, AppState};

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/add", post(add_to_cart))
        .route("/cart/:item_id", put(update_cart_item).delete(remove_from_cart))
        .with_auth()
}

/// GET /api/cart
async fn get_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<Value> {
    let cart = state.services.cart.get_cart(&user.user_id).await?;
    Ok(ApiResponse::ok(json!({ "cart": cart })))
}

/// POST /api/cart/add
async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(request): ValidJson<AddToCartRequest>,
) -> ApiResult<Value> {
    let cart = state.services.cart.add_item(&user.user_id, request).await?;
    Ok(ApiResponse::with_message(json!({ "cart": cart }), "Item added to cart"))
}

/// PUT /api/cart/:itemId
async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
    ValidJson(request): ValidJson<UpdateCartItemRequest>,
) -> ApiResult<Value> {
    let cart = state
        .services
        .cart
        .update_item(&user.user_id, &item_id, request)
        .await?;
    Ok(ApiResponse::with_message(
        json!({ "cart": cart }),
        "Cart updated successfully",
    ))
}

/// DELETE /api/cart/:itemId
async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
) -> ApiResult<Value> {
    let cart = state
        .services
        .cart
        .remove_item(&user.user_id, &item_id)
        .await?;
    Ok(ApiResponse::with_message(
        json!({ "cart": cart }),
        "Item removed from cart",
    ))
}
