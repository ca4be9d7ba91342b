use crate::{
    common::{checked_total, new_object_id, parse_object_id},
    db::DbPool,
    entities::cart::{self, Entity as CartEntity, Model as CartModel},
    entities::cart_item::{self, Entity as CartItemEntity, Model as CartItemModel},
    entities::product::Entity as ProductEntity,
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

const CART_NOT_FOUND: &str = "Cart not found";
const ITEM_NOT_FOUND: &str = "Item not found in cart";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    pub id: String,
    pub product: String,
    pub quantity: i32,
    pub price: Decimal,
}

impl From<CartItemModel> for CartItemResponse {
    fn from(item: CartItemModel) -> Self {
        Self {
            id: item.id,
            product: item.product_id,
            quantity: item.quantity,
            price: item.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub id: String,
    pub user: String,
    pub items: Vec<CartItemResponse>,
    pub total_price: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl CartResponse {
    fn from_parts(cart: CartModel, items: Vec<CartItemModel>) -> Self {
        Self {
            id: cart.id,
            user: cart.user_id,
            items: items.into_iter().map(CartItemResponse::from).collect(),
            total_price: cart.total_price,
            updated_at: cart.updated_at,
        }
    }
}

/// Per-user shopping cart with price snapshots.
#[derive(Clone)]
pub struct CartService {
    db_pool: Arc<DbPool>,
}

impl CartService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Returns the user's cart, creating an empty one on first access.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: &str) -> Result<CartResponse, ServiceError> {
        let db = &*self.db_pool;
        let cart = match find_cart(db, user_id).await? {
            Some(cart) => cart,
            None => create_cart(db, user_id).await?,
        };
        let items = cart_items(db, &cart.id).await?;
        Ok(CartResponse::from_parts(cart, items))
    }

    /// Adds a product, merging with an existing line for the same product.
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn add_item(
        &self,
        user_id: &str,
        request: AddToCartRequest,
    ) -> Result<CartResponse, ServiceError> {
        request.validate()?;
        let product_id = parse_object_id(&request.product_id, "Invalid product ID format")?;
        let txn = self.db_pool.begin().await?;

        let product = ProductEntity::find_by_id(product_id.clone())
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let cart = match find_cart(&txn, user_id).await? {
            Some(cart) => cart,
            None => create_cart(&txn, user_id).await?,
        };

        let existing = CartItemEntity::find()
            .filter(cart_item::Column::CartId.eq(cart.id.as_str()))
            .filter(cart_item::Column::ProductId.eq(product_id.as_str()))
            .one(&txn)
            .await?;

        match existing {
            Some(line) => {
                let quantity = line.quantity.checked_add(request.quantity).ok_or_else(|| {
                    ServiceError::ValidationError("Cart quantity is out of range".to_string())
                })?;
                let mut active = line.into_active_model();
                active.quantity = Set(quantity);
                active.update(&txn).await?;
            }
            None => {
                cart_item::ActiveModel {
                    id: Set(new_object_id()),
                    cart_id: Set(cart.id.clone()),
                    product_id: Set(product_id.clone()),
                    quantity: Set(request.quantity),
                    price: Set(product.price),
                    created_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?;
            }
        }

        let response = recompute(&txn, cart).await?;
        txn.commit().await?;

        info!(cart_id = %response.id, product_id = %product_id, "Item added to cart");
        Ok(response)
    }

    #[instrument(skip(self, request))]
    pub async fn update_item(
        &self,
        user_id: &str,
        item_id: &str,
        request: UpdateCartItemRequest,
    ) -> Result<CartResponse, ServiceError> {
        request.validate()?;
        let txn = self.db_pool.begin().await?;

        let cart = find_cart(&txn, user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(CART_NOT_FOUND.to_string()))?;

        let line = CartItemEntity::find_by_id(item_id.trim().to_ascii_lowercase())
            .filter(cart_item::Column::CartId.eq(cart.id.as_str()))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ITEM_NOT_FOUND.to_string()))?;

        let mut active = line.into_active_model();
        active.quantity = Set(request.quantity);
        active.update(&txn).await?;

        let response = recompute(&txn, cart).await?;
        txn.commit().await?;
        Ok(response)
    }

    /// Removes a line. Unknown item ids leave the cart unchanged.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: &str, item_id: &str) -> Result<CartResponse, ServiceError> {
        let txn = self.db_pool.begin().await?;

        let cart = find_cart(&txn, user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(CART_NOT_FOUND.to_string()))?;

        CartItemEntity::delete_many()
            .filter(cart_item::Column::Id.eq(item_id.trim().to_ascii_lowercase()))
            .filter(cart_item::Column::CartId.eq(cart.id.as_str()))
            .exec(&txn)
            .await?;

        let response = recompute(&txn, cart).await?;
        txn.commit().await?;
        Ok(response)
    }
}

async fn find_cart<C: ConnectionTrait>(db: &C, user_id: &str) -> Result<Option<CartModel>, ServiceError> {
    Ok(CartEntity::find()
        .filter(cart::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

async fn create_cart<C: ConnectionTrait>(db: &C, user_id: &str) -> Result<CartModel, ServiceError> {
    let now = Utc::now();
    let cart = cart::ActiveModel {
        id: Set(new_object_id()),
        user_id: Set(user_id.to_string()),
        total_price: Set(Decimal::ZERO),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(cart)
}

async fn cart_items<C: ConnectionTrait>(db: &C, cart_id: &str) -> Result<Vec<CartItemModel>, ServiceError> {
    Ok(CartItemEntity::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .order_by_asc(cart_item::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Recomputes the cart total from its lines and stores it.
async fn recompute<C: ConnectionTrait>(db: &C, cart: CartModel) -> Result<CartResponse, ServiceError> {
    let items = cart_items(db, &cart.id).await?;
    let total = checked_total(items.iter().map(|item| (item.price, item.quantity)))
        .ok_or_else(|| ServiceError::ValidationError("Cart total is out of range".to_string()))?;

    let mut active = cart.into_active_model();
    active.total_price = Set(total);
    active.updated_at = Set(Utc::now());
    let cart = active.update(db).await?;

    Ok(CartResponse::from_parts(cart, items))
}
