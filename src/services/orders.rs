use crate::{
    auth::AuthUser,
    common::{checked_total, is_object_id, new_object_id, parse_object_id},
    db::DbPool,
    entities::order::{self, Entity as OrderEntity, Model as OrderModel, OrderStatus, PaymentMethod},
    entities::order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel},
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::{notify_best_effort, Notification, Notifier},
    services::stock,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel,
    ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

const INVALID_ORDER_ID: &str = "Invalid order ID format";
const ORDER_NOT_FOUND: &str = "Order not found";
const ACCESS_FORBIDDEN: &str = "Access forbidden";

/// Tolerance when comparing the declared items price against the line items.
const PRICE_TOLERANCE: Decimal = dec!(0.01);

/// Request/Response types for the order service
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    #[validate(length(min = 1, message = "Product is required"))]
    pub product: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate]
    #[serde(default)]
    pub items: Vec<OrderItemInput>,
    pub shipping_address: serde_json::Value,
    pub payment_method: PaymentMethod,
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

/// Provider payment details recorded when an order is marked paid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct PaymentResultInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub id: Option<String>,
    pub status: Option<String>,
    pub update_time: Option<String>,
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product: String,
    pub name: String,
    pub image: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
}

impl From<OrderItemModel> for OrderItemResponse {
    fn from(item: OrderItemModel) -> Self {
        Self {
            product: item.product_id,
            name: item.name,
            image: item.image,
            quantity: item.quantity,
            price: item.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub user: String,
    pub user_email: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub shipping_address: serde_json::Value,
    pub payment_method: PaymentMethod,
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub payment_result: Option<PaymentResult>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderResponse {
    pub fn from_parts(order: OrderModel, items: Vec<OrderItemModel>) -> Self {
        let payment_result = if order.payment_result_id.is_some()
            || order.payment_result_status.is_some()
        {
            Some(PaymentResult {
                id: order.payment_result_id,
                status: order.payment_result_status,
                update_time: order.payment_result_update_time,
                email_address: order.payment_result_email,
            })
        } else {
            None
        };

        Self {
            id: order.id,
            user: order.user_id,
            user_email: order.user_email,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            shipping_address: order.shipping_address,
            payment_method: order.payment_method,
            items_price: order.items_price,
            tax_price: order.tax_price,
            shipping_price: order.shipping_price,
            total_price: order.total_price,
            status: order.status,
            is_paid: order.is_paid,
            paid_at: order.paid_at,
            is_delivered: order.is_delivered,
            delivered_at: order.delivered_at,
            payment_result,
            tracking_number: order.tracking_number,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Public tracking view of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedOrder {
    pub id: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub total_price: Decimal,
    pub is_delivered: bool,
    pub is_paid: bool,
    pub tracking_number: Option<String>,
    pub items: Vec<OrderItemResponse>,
}

/// Order state machine: checkout, payment marking, cancellation, fulfilment.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    notifier: Arc<dyn Notifier>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    /// Creates a new order service instance
    pub fn new(
        db_pool: Arc<DbPool>,
        notifier: Arc<dyn Notifier>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db_pool,
            notifier,
            event_sender,
        }
    }

    /// Places an order, decrementing stock for every line in one transaction.
    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id))]
    pub async fn create_order(
        &self,
        actor: &AuthUser,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        if request.items.is_empty() {
            return Err(ServiceError::ValidationError("No order items".to_string()));
        }
        request.validate()?;
        validate_price_breakdown(&request)?;

        let db = &*self.db_pool;
        let now = Utc::now();
        let order_id = new_object_id();

        // Dropping the transaction on an early return rolls back every earlier decrement.
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let mut item_models = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let product = stock::reserve(&txn, &item.product, item.quantity).await?;
            item_models.push(order_item::ActiveModel {
                id: Set(new_object_id()),
                order_id: Set(order_id.clone()),
                product_id: Set(item.product.clone()),
                name: Set(item.name.clone().unwrap_or(product.name)),
                image: Set(item
                    .image
                    .clone()
                    .or_else(|| product_first_image(&product.images))),
                quantity: Set(item.quantity),
                price: Set(item.price),
            });
        }

        let order_model = order::ActiveModel {
            id: Set(order_id.clone()),
            user_id: Set(actor.user_id.clone()),
            user_email: Set(actor.email.clone()),
            shipping_address: Set(request.shipping_address),
            payment_method: Set(request.payment_method),
            items_price: Set(request.items_price),
            tax_price: Set(request.tax_price),
            shipping_price: Set(request.shipping_price),
            total_price: Set(request.total_price),
            status: Set(OrderStatus::Processing),
            is_paid: Set(false),
            paid_at: Set(None),
            is_delivered: Set(false),
            delivered_at: Set(None),
            payment_result_id: Set(None),
            payment_result_status: Set(None),
            payment_result_update_time: Set(None),
            payment_result_email: Set(None),
            tracking_number: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(item_models.len());
        for item in item_models {
            items.push(item.insert(&txn).await?);
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, total_price = %order_model.total_price, "Order created");

        if let Some(email) = &order_model.user_email {
            notify_best_effort(
                self.notifier.as_ref(),
                Notification::OrderConfirmation {
                    to: email.clone(),
                    order_id: order_id.clone(),
                    total_price: order_model.total_price,
                },
            )
            .await;
        }

        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id: order_id.clone(),
                total_price: order_model.total_price,
            })
            .await;

        Ok(OrderResponse::from_parts(order_model, items))
    }

    /// Fetches an order visible to `actor`.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn get_order(
        &self,
        actor: &AuthUser,
        order_id: &str,
    ) -> Result<OrderResponse, ServiceError> {
        let order_id = parse_object_id(order_id, INVALID_ORDER_ID)?;
        let db = &*self.db_pool;
        let order = find_order(db, &order_id).await?;

        if !actor.can_access(&order.user_id) {
            return Err(ServiceError::Forbidden(ACCESS_FORBIDDEN.to_string()));
        }

        let items = order.find_related(OrderItemEntity).all(db).await?;
        Ok(OrderResponse::from_parts(order, items))
    }

    /// Orders placed by `actor`, newest first.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn list_my_orders(&self, actor: &AuthUser) -> Result<Vec<OrderResponse>, ServiceError> {
        let rows = OrderEntity::find()
            .filter(order::Column::UserId.eq(actor.user_id.as_str()))
            .order_by_desc(order::Column::CreatedAt)
            .find_with_related(OrderItemEntity)
            .all(&*self.db_pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(order, items)| OrderResponse::from_parts(order, items))
            .collect())
    }

    /// Every order, newest first.
    #[instrument(skip(self))]
    pub async fn list_all_orders(&self) -> Result<Vec<OrderResponse>, ServiceError> {
        let rows = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .find_with_related(OrderItemEntity)
            .all(&*self.db_pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(order, items)| OrderResponse::from_parts(order, items))
            .collect())
    }

    /// Records a successful payment. Re-applying the same result is harmless.
    #[instrument(skip(self, actor, result), fields(user_id = %actor.user_id))]
    pub async fn mark_paid(
        &self,
        actor: &AuthUser,
        order_id: &str,
        result: PaymentResultInput,
    ) -> Result<OrderResponse, ServiceError> {
        let order_id = parse_object_id(order_id, INVALID_ORDER_ID)?;
        let db = &*self.db_pool;
        let order = find_order(db, &order_id).await?;

        if !actor.can_access(&order.user_id) {
            return Err(ServiceError::Forbidden(ACCESS_FORBIDDEN.to_string()));
        }
        if order.status == OrderStatus::Cancelled {
            return Err(ServiceError::InvalidOperation(
                "Cannot pay for a cancelled order".to_string(),
            ));
        }

        let now = Utc::now();
        let mut active = order.into_active_model();
        active.is_paid = Set(true);
        active.paid_at = Set(Some(now));
        active.status = Set(OrderStatus::Processing);
        active.payment_result_id = Set(result.id);
        active.payment_result_status = Set(result.status);
        active.payment_result_update_time = Set(result.update_time);
        active.payment_result_email = Set(result.email_address);
        active.updated_at = Set(now);
        let updated = active.update(db).await?;

        info!(order_id = %order_id, "Order marked paid");
        self.event_sender
            .send_or_log(Event::OrderPaid(order_id.clone()))
            .await;

        let items = updated.find_related(OrderItemEntity).all(db).await?;
        Ok(OrderResponse::from_parts(updated, items))
    }

    /// Cancels an order on behalf of its owner and restores stock.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn cancel_order(
        &self,
        actor: &AuthUser,
        order_id: &str,
    ) -> Result<OrderResponse, ServiceError> {
        let order_id = parse_object_id(order_id, INVALID_ORDER_ID)?;
        let txn = self.db_pool.begin().await?;

        let order = find_order(&txn, &order_id).await?;
        if order.user_id != actor.user_id {
            return Err(ServiceError::Forbidden(ACCESS_FORBIDDEN.to_string()));
        }

        let items = cancel_and_restock(&txn, &order).await?;
        let updated = find_order(&txn, &order_id).await?;
        txn.commit().await?;

        info!(order_id = %order_id, "Order cancelled");
        self.event_sender
            .send_or_log(Event::OrderCancelled(order_id.clone()))
            .await;

        Ok(OrderResponse::from_parts(updated, items))
    }

    /// Admin status overwrite. `Cancelled` goes through the guarded restock path.
    #[instrument(skip(self, request), fields(new_status = %request.status))]
    pub async fn update_status(
        &self,
        order_id: &str,
        request: UpdateOrderStatusRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let order_id = parse_object_id(order_id, INVALID_ORDER_ID)?;
        let txn = self.db_pool.begin().await?;

        let order = find_order(&txn, &order_id).await?;
        let old_status = order.status;
        if old_status == OrderStatus::Cancelled {
            return Err(ServiceError::InvalidOperation(
                "Cancelled orders cannot be updated".to_string(),
            ));
        }

        let tracking_number = request
            .tracking_number
            .filter(|t| !t.trim().is_empty());

        let items = if request.status == OrderStatus::Cancelled {
            cancel_and_restock(&txn, &order).await?
        } else {
            order.find_related(OrderItemEntity).all(&txn).await?
        };

        let now = Utc::now();
        let current = find_order(&txn, &order_id).await?;
        let mut active = current.into_active_model();
        active.status = Set(request.status);
        if let Some(tracking) = tracking_number {
            active.tracking_number = Set(Some(tracking));
        }
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(order_id = %order_id, old_status = %old_status, new_status = %updated.status, "Order status updated");

        if updated.status == OrderStatus::Shipped {
            match &updated.user_email {
                Some(email) => {
                    notify_best_effort(
                        self.notifier.as_ref(),
                        Notification::ShippingUpdate {
                            to: email.clone(),
                            order_id: order_id.clone(),
                            tracking_number: updated.tracking_number.clone(),
                        },
                    )
                    .await
                }
                None => warn!(order_id = %order_id, "No email on order; skipping shipping notification"),
            }
        }

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id: order_id.clone(),
                old_status: old_status.to_string(),
                new_status: updated.status.to_string(),
            })
            .await;

        Ok(OrderResponse::from_parts(updated, items))
    }

    /// Marks an order delivered.
    #[instrument(skip(self))]
    pub async fn mark_delivered(&self, order_id: &str) -> Result<OrderResponse, ServiceError> {
        let order_id = parse_object_id(order_id, INVALID_ORDER_ID)?;
        let db = &*self.db_pool;
        let order = find_order(db, &order_id).await?;

        if order.status == OrderStatus::Cancelled {
            return Err(ServiceError::InvalidOperation(
                "Cannot deliver a cancelled order".to_string(),
            ));
        }

        let now = Utc::now();
        let mut active = order.into_active_model();
        active.is_delivered = Set(true);
        active.delivered_at = Set(Some(now));
        active.status = Set(OrderStatus::Delivered);
        active.updated_at = Set(now);
        let updated = active.update(db).await?;

        info!(order_id = %order_id, "Order delivered");
        self.event_sender
            .send_or_log(Event::OrderDelivered(order_id.clone()))
            .await;

        let items = updated.find_related(OrderItemEntity).all(db).await?;
        Ok(OrderResponse::from_parts(updated, items))
    }

    /// Public order lookup returning the tracking subset.
    #[instrument(skip(self))]
    pub async fn track_order(&self, order_id: Option<&str>) -> Result<TrackedOrder, ServiceError> {
        let order_id = order_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ServiceError::ValidationError("Please provide order ID".to_string()))?;

        if !is_object_id(order_id) {
            return Err(ServiceError::ValidationError(
                "Invalid order ID format. Please provide the full 24-character Order ID."
                    .to_string(),
            ));
        }

        let db = &*self.db_pool;
        let order = find_order(db, &order_id.to_ascii_lowercase()).await?;
        let items = order.find_related(OrderItemEntity).all(db).await?;

        Ok(TrackedOrder {
            id: order.id,
            status: order.status,
            created_at: order.created_at,
            total_price: order.total_price,
            is_delivered: order.is_delivered,
            is_paid: order.is_paid,
            tracking_number: order.tracking_number,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
        })
    }
}

async fn find_order<C: ConnectionTrait>(db: &C, order_id: &str) -> Result<OrderModel, ServiceError> {
    OrderEntity::find_by_id(order_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(ORDER_NOT_FOUND.to_string()))
}

/// Moves `order` to `Cancelled` with a guarded write and restores stock for its lines.
///
/// The write only matches orders not yet shipped, delivered or cancelled, so concurrent
/// cancellations restore stock once.
async fn cancel_and_restock<C: ConnectionTrait>(
    txn: &C,
    order: &OrderModel,
) -> Result<Vec<OrderItemModel>, ServiceError> {
    match order.status {
        OrderStatus::Shipped | OrderStatus::Delivered => {
            return Err(ServiceError::InvalidOperation(
                "Cannot cancel shipped or delivered orders".to_string(),
            ))
        }
        OrderStatus::Cancelled => {
            return Err(ServiceError::InvalidOperation(
                "Order is already cancelled".to_string(),
            ))
        }
        OrderStatus::Processing => {}
    }

    let result = OrderEntity::update_many()
        .col_expr(order::Column::Status, Expr::value(OrderStatus::Cancelled))
        .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(order::Column::Id.eq(order.id.as_str()))
        .filter(order::Column::Status.is_not_in([
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ]))
        .exec(txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::InvalidOperation(
            "Order is already cancelled".to_string(),
        ));
    }

    let items = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.eq(order.id.as_str()))
        .all(txn)
        .await?;

    stock::restore_lines(
        txn,
        items
            .iter()
            .map(|item| (item.product_id.clone(), item.quantity))
            .collect(),
    )
    .await?;

    Ok(items)
}

fn validate_price_breakdown(request: &CreateOrderRequest) -> Result<(), ServiceError> {
    let amounts = [
        request.items_price,
        request.tax_price,
        request.shipping_price,
        request.total_price,
    ];
    if amounts.iter().any(|a| a.is_sign_negative())
        || request.items.iter().any(|i| i.price.is_sign_negative())
    {
        return Err(ServiceError::ValidationError(
            "Prices must not be negative".to_string(),
        ));
    }

    let computed = checked_total(request.items.iter().map(|item| (item.price, item.quantity)))
        .ok_or_else(|| ServiceError::ValidationError("Order total is out of range".to_string()))?;

    let matches = computed
        .checked_sub(request.items_price)
        .is_some_and(|diff| diff.abs() <= PRICE_TOLERANCE);
    if !matches {
        return Err(ServiceError::ValidationError(
            "Items price does not match order items".to_string(),
        ));
    }
    Ok(())
}

fn product_first_image(images: &serde_json::Value) -> Option<String> {
    images
        .as_array()
        .and_then(|a| a.first())
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
