use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

use super::common::ValidJson;
use crate::auth::{AuthRouterExt, AuthUser, ADMIN_ROLE};
use crate::errors::ServiceError;
use crate::services::products::{CreateProductRequest, ProductListQuery, UpdateProductRequest};
use crate::{ApiResponse, ApiResult, AppState};

pub fn product_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/products", get(list_products))
        .route("/products/categories", get(list_categories))
        .route("/products/:id", get(get_product));

    let admin = Router::new()
        .route("/products", post(create_product))
        .route(
            "/products/:id",
            axum::routing::put(update_product).delete(delete_product),
        )
        .with_role(ADMIN_ROLE);

    public.merge(admin)
}

/// GET /api/products
async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<ProductListQuery>, QueryRejection>,
) -> ApiResult<Value> {
    let Query(query) = query.map_err(|e| ServiceError::ValidationError(e.body_text()))?;
    let page = state.services.products.list_products(query).await?;
    Ok(ApiResponse::ok(json!(page)))
}

/// GET /api/products/categories
async fn list_categories(State(state): State<AppState>) -> ApiResult<Value> {
    let categories = state.services.products.list_categories().await?;
    Ok(ApiResponse::ok(json!({ "categories": categories })))
}

/// GET /api/products/:idOrSlug
async fn get_product(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let product = state.services.products.get_product(&id).await?;
    Ok(ApiResponse::ok(json!({ "product": product })))
}

/// POST /api/products (admin)
async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(request): ValidJson<CreateProductRequest>,
) -> ApiResult<Value> {
    let product = state
        .services
        .products
        .create_product(&user.user_id, request)
        .await?;
    Ok(ApiResponse::new(
        StatusCode::CREATED,
        json!({ "product": product }),
        "Product created successfully",
    ))
}

/// PUT /api/products/:id (admin)
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<UpdateProductRequest>,
) -> ApiResult<Value> {
    let product = state.services.products.update_product(&id, request).await?;
    Ok(ApiResponse::with_message(
        json!({ "product": product }),
        "Product updated successfully",
    ))
}

/// DELETE /api/products/:id (admin)
async fn delete_product(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    state.services.products.delete_product(&id).await?;
    Ok(ApiResponse::with_message(json!({}), "Product deleted successfully"))
}
