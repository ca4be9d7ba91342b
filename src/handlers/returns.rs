use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};

use super::common::ValidJson;
use crate::auth::{AuthRouterExt, AuthUser, ADMIN_ROLE};
use crate::services::returns::{CreateReturnRequest, UpdateReturnStatusRequest};
use crate::{ApiResponse, ApiResult, AppState};

pub fn return_routes() -> Router<AppState> {
    let customer = Router::new()
        .route("/returns", post(create_return))
        .route("/returns/my-returns", get(list_my_returns))
        .with_auth();

    let admin = Router::new()
        .route("/returns", get(list_all_returns))
        .route("/returns/:id/status", put(update_return_status))
        .with_role(ADMIN_ROLE);

    customer.merge(admin)
}

/// POST /api/returns
async fn create_return(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(request): ValidJson<CreateReturnRequest>,
) -> ApiResult<Value> {
    let return_request = state.services.returns.create_return(&user, request).await?;
    Ok(ApiResponse::new(
        StatusCode::CREATED,
        json!({ "returnRequest": return_request }),
        "Return request submitted successfully",
    ))
}

/// GET /api/returns/my-returns
async fn list_my_returns(State(state): State<AppState>, user: AuthUser) -> ApiResult<Value> {
    let returns = state.services.returns.list_my_returns(&user).await?;
    Ok(ApiResponse::ok(json!({ "returns": returns })))
}

/// GET /api/returns (admin)
async fn list_all_returns(State(state): State<AppState>) -> ApiResult<Value> {
    let returns = state.services.returns.list_all_returns().await?;
    Ok(ApiResponse::ok(json!({ "returns": returns })))
}

/// PUT /api/returns/:id/status (admin)
async fn update_return_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<UpdateReturnStatusRequest>,
) -> ApiResult<Value> {
    let return_request = state.services.returns.update_status(&id, request).await?;
    Ok(ApiResponse::with_message(
        json!({ "returnRequest": return_request }),
        "Return status updated successfully",
    ))
}
