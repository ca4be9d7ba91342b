use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};

use super::common::ValidJson;
use crate::auth::{AuthRouterExt, AuthUser, ADMIN_ROLE};
use crate::services::reviews::{CreateReviewRequest, UpdateReviewRequest};
use crate::{ApiResponse, ApiResult, AppState};

pub fn review_routes() -> Router<AppState> {
    let public = Router::new().route("/reviews/product/:product_id", get(list_product_reviews));

    let customer = Router::new()
        .route("/reviews", post(create_review))
        .route("/reviews/:id", put(update_review).delete(delete_review))
        .with_auth();

    let admin = Router::new()
        .route("/reviews", get(list_all_reviews))
        .with_role(ADMIN_ROLE);

    public.merge(customer).merge(admin)
}

/// GET /api/reviews/product/:idOrSlug
async fn list_product_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Value> {
    let reviews = state.services.reviews.list_for_product(&product_id).await?;
    Ok(ApiResponse::ok(json!({ "reviews": reviews })))
}

/// POST /api/reviews
async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(request): ValidJson<CreateReviewRequest>,
) -> ApiResult<Value> {
    let review = state.services.reviews.create_review(&user, request).await?;
    Ok(ApiResponse::new(
        StatusCode::CREATED,
        json!({ "review": review }),
        "Review added successfully",
    ))
}

/// PUT /api/reviews/:id
async fn update_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<UpdateReviewRequest>,
) -> ApiResult<Value> {
    let review = state.services.reviews.update_review(&user, &id, request).await?;
    Ok(ApiResponse::with_message(
        json!({ "review": review }),
        "Review updated successfully",
    ))
}

/// DELETE /api/reviews/:id
async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    state.services.reviews.delete_review(&user, &id).await?;
    Ok(ApiResponse::with_message(Value::Null, "Review deleted successfully"))
}

/// GET /api/reviews (admin)
async fn list_all_reviews(State(state): State<AppState>) -> ApiResult<Value> {
    let reviews = state.services.reviews.list_all().await?;
    Ok(ApiResponse::ok(json!({ "reviews": reviews })))
}
