use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

use super::common::ValidJson;
use crate::auth::{AuthRouterExt, ADMIN_ROLE};
use crate::services::shipping::UpdateShippingRequest;
use crate::{ApiResponse, ApiResult, AppState};

pub fn shipping_routes() -> Router<AppState> {
    let public = Router::new().route("/shipping", get(get_settings));
    let admin = Router::new()
        .route("/shipping/settings", post(update_settings))
        .with_role(ADMIN_ROLE);

    public.merge(admin)
}

/// GET /api/shipping
async fn get_settings(State(state): State<AppState>) -> ApiResult<Value> {
    let settings = state.services.shipping.get_settings().await?;
    Ok(ApiResponse::with_message(
        json!({ "settings": settings }),
        "Shipping settings retrieved successfully",
    ))
}

/// POST /api/shipping/settings (admin)
async fn update_settings(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<UpdateShippingRequest>,
) -> ApiResult<Value> {
    let settings = state.services.shipping.update_settings(request).await?;
    Ok(ApiResponse::with_message(
        json!({ "settings": settings }),
        "Shipping settings updated successfully",
    ))
}
