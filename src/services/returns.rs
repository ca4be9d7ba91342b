use crate::{
    auth::AuthUser,
    common::{new_object_id, parse_object_id},
    db::DbPool,
    entities::order::{Entity as OrderEntity, Model as OrderModel, OrderStatus, PaymentMethod},
    entities::order_item::{Entity as OrderItemEntity, Model as OrderItemModel},
    entities::return_item::{self, Entity as ReturnItemEntity, Model as ReturnItemModel},
    entities::return_request::{self, Entity as ReturnEntity, Model as ReturnModel, ReturnStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{payments::PaymentService, stock},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

/// Provider messages meaning the refund was already applied.
const ALREADY_REFUNDED_MARKERS: [&str; 2] =
    ["already been refunded", "greater than unrefunded amount"];

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReturnItemInput {
    pub product: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReturnRequest {
    pub order_id: String,
    #[validate(length(min = 1, message = "Return reason is required"))]
    pub reason: String,
    #[serde(default)]
    pub items: Vec<ReturnItemInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReturnStatusRequest {
    pub status: ReturnStatus,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnItemResponse {
    pub product: String,
    pub quantity: i32,
    pub price: Decimal,
}

impl From<ReturnItemModel> for ReturnItemResponse {
    fn from(item: ReturnItemModel) -> Self {
        Self {
            product: item.product_id,
            quantity: item.quantity,
            price: item.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnResponse {
    pub id: String,
    pub order: String,
    pub user: String,
    pub reason: String,
    pub items: Vec<ReturnItemResponse>,
    pub total_refund_amount: Decimal,
    pub status: ReturnStatus,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReturnResponse {
    pub fn from_parts(model: ReturnModel, items: Vec<ReturnItemModel>) -> Self {
        Self {
            id: model.id,
            order: model.order_id,
            user: model.user_id,
            reason: model.reason,
            items: items.into_iter().map(ReturnItemResponse::from).collect(),
            total_refund_amount: model.total_refund_amount,
            status: model.status,
            admin_notes: model.admin_notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Return eligibility, restocking and refund automation.
#[derive(Clone)]
pub struct ReturnService {
    db_pool: Arc<DbPool>,
    payments: Arc<PaymentService>,
    event_sender: Arc<EventSender>,
    window_hours: u32,
}

impl ReturnService {
    pub fn new(
        db_pool: Arc<DbPool>,
        payments: Arc<PaymentService>,
        event_sender: Arc<EventSender>,
        window_hours: u32,
    ) -> Self {
        Self {
            db_pool,
            payments,
            event_sender,
            window_hours,
        }
    }

    /// Opens a return for a delivered order inside the return window.
    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id, order_id = %request.order_id))]
    pub async fn create_return(
        &self,
        actor: &AuthUser,
        request: CreateReturnRequest,
    ) -> Result<ReturnResponse, ServiceError> {
        request.validate()?;
        let order_id = parse_object_id(&request.order_id, "Invalid order ID format")?;
        let db = &*self.db_pool;

        let order = OrderEntity::find_by_id(order_id.clone())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if !actor.can_access(&order.user_id) {
            return Err(ServiceError::Forbidden(
                "Unauthorized to return this order".to_string(),
            ));
        }
        self.check_eligibility(&order, Utc::now())?;

        let ordered = order.find_related(OrderItemEntity).all(db).await?;

        let (lines, total_refund_amount) = if request.items.is_empty() {
            let lines: Vec<_> = ordered
                .iter()
                .map(|oi| (oi.product_id.clone(), oi.quantity, oi.price))
                .collect();
            (lines, order.total_price)
        } else {
            requested_lines(&ordered, &request.items)?
        };

        let now = Utc::now();
        let return_id = new_object_id();
        let txn = db.begin().await?;

        let saved = return_request::ActiveModel {
            id: Set(return_id.clone()),
            order_id: Set(order_id.clone()),
            user_id: Set(actor.user_id.clone()),
            reason: Set(request.reason),
            total_refund_amount: Set(total_refund_amount),
            status: Set(ReturnStatus::Processing),
            admin_notes: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for (product_id, quantity, price) in lines {
            let item = return_item::ActiveModel {
                id: Set(new_object_id()),
                return_id: Set(return_id.clone()),
                product_id: Set(product_id),
                quantity: Set(quantity),
                price: Set(price),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        txn.commit().await?;

        info!(return_id = %return_id, order_id = %order_id, refund = %total_refund_amount, "Return requested");
        self.event_sender
            .send_or_log(Event::ReturnRequested {
                return_id,
                order_id,
            })
            .await;

        Ok(ReturnResponse::from_parts(saved, items))
    }

    fn check_eligibility(&self, order: &OrderModel, now: DateTime<Utc>) -> Result<(), ServiceError> {
        if order.status != OrderStatus::Delivered {
            return Err(ServiceError::InvalidOperation(
                "Only delivered orders can be returned".to_string(),
            ));
        }

        let delivered = order.delivered_at.unwrap_or(order.updated_at);
        let elapsed_secs = (now - delivered).num_seconds().unsigned_abs();
        if elapsed_secs > u64::from(self.window_hours) * 3600 {
            return Err(ServiceError::InvalidOperation(format!(
                "Return period ({} hours) has expired",
                self.window_hours
            )));
        }
        Ok(())
    }

    /// Returns opened by `actor`, newest first.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn list_my_returns(&self, actor: &AuthUser) -> Result<Vec<ReturnResponse>, ServiceError> {
        let rows = ReturnEntity::find()
            .filter(return_request::Column::UserId.eq(actor.user_id.as_str()))
            .order_by_desc(return_request::Column::CreatedAt)
            .find_with_related(ReturnItemEntity)
            .all(&*self.db_pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(r, items)| ReturnResponse::from_parts(r, items))
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn list_all_returns(&self) -> Result<Vec<ReturnResponse>, ServiceError> {
        let rows = ReturnEntity::find()
            .order_by_desc(return_request::Column::CreatedAt)
            .find_with_related(ReturnItemEntity)
            .all(&*self.db_pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(r, items)| ReturnResponse::from_parts(r, items))
            .collect())
    }

    /// Admin transition. Approval restocks once; a first move to `Refunded` refunds through the
    /// payment provider for Stripe-paid orders.
    #[instrument(skip(self, request), fields(new_status = %request.status))]
    pub async fn update_status(
        &self,
        return_id: &str,
        request: UpdateReturnStatusRequest,
    ) -> Result<ReturnResponse, ServiceError> {
        let return_id = parse_object_id(return_id, "Invalid return ID format")?;
        let db = &*self.db_pool;
        let existing = ReturnEntity::find_by_id(return_id.clone())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Return request not found".to_string()))?;

        let mut admin_notes = request.admin_notes.filter(|n| !n.trim().is_empty());

        if request.status == ReturnStatus::Refunded && existing.status != ReturnStatus::Refunded {
            admin_notes = self.refund_for_return(&existing, admin_notes).await?;
        }

        let txn = db.begin().await?;

        if request.status == ReturnStatus::Approved && existing.status != ReturnStatus::Approved {
            let result = ReturnEntity::update_many()
                .col_expr(return_request::Column::Status, Expr::value(ReturnStatus::Approved))
                .col_expr(return_request::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(return_request::Column::Id.eq(return_id.as_str()))
                .filter(return_request::Column::Status.ne(ReturnStatus::Approved))
                .exec(&txn)
                .await?;

            if result.rows_affected == 1 {
                let items = ReturnItemEntity::find()
                    .filter(return_item::Column::ReturnId.eq(return_id.as_str()))
                    .all(&txn)
                    .await?;
                stock::restore_lines(
                    &txn,
                    items
                        .iter()
                        .map(|i| (i.product_id.clone(), i.quantity))
                        .collect(),
                )
                .await?;
                info!(return_id = %return_id, lines = items.len(), "Stock restored for approved return");
            } else {
                warn!(return_id = %return_id, "Return already approved concurrently; stock untouched");
            }
        }

        let current = ReturnEntity::find_by_id(return_id.clone())
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Return request not found".to_string()))?;
        let mut active = current.into_active_model();
        active.status = Set(request.status);
        if let Some(notes) = admin_notes {
            active.admin_notes = Set(Some(notes));
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(return_id = %return_id, old_status = %existing.status, new_status = %updated.status, "Return status updated");
        self.event_sender
            .send_or_log(Event::ReturnStatusChanged {
                return_id: return_id.clone(),
                new_status: updated.status.to_string(),
            })
            .await;

        let items = updated.find_related(ReturnItemEntity).all(db).await?;
        Ok(ReturnResponse::from_parts(updated, items))
    }

    /// Issues the provider refund for a return and returns the admin notes to store.
    async fn refund_for_return(
        &self,
        existing: &ReturnModel,
        admin_notes: Option<String>,
    ) -> Result<Option<String>, ServiceError> {
        let Some(order) = OrderEntity::find_by_id(existing.order_id.clone())
            .one(&*self.db_pool)
            .await?
        else {
            return Ok(admin_notes);
        };

        let intent_id = match (&order.payment_method, &order.payment_result_id) {
            (PaymentMethod::Stripe, Some(id)) if !id.is_empty() => id.clone(),
            _ => return Ok(admin_notes),
        };

        let amount = if existing.total_refund_amount > Decimal::ZERO {
            existing.total_refund_amount
        } else {
            order.total_price
        };

        match self.payments.refund(&intent_id, Some(amount)).await {
            Ok(refund) => {
                let note = format!(" | Integrated Stripe Refund processed: {}", refund.id);
                Ok(Some(match admin_notes {
                    Some(notes) => notes + &note,
                    None => format!("Stripe Refund processed.{}", note),
                }))
            }
            Err(ServiceError::RefundFailed(message)) if is_already_refunded(&message) => {
                info!(return_id = %existing.id, "Refund already applied at provider; continuing");
                let note = " | Refund verified/already partially processed in Stripe.";
                Ok(Some(match admin_notes {
                    Some(notes) => notes + note,
                    None => format!("Refund verified in Stripe.{}", note),
                }))
            }
            Err(e) => {
                error!(return_id = %existing.id, error = %e, "Automated refund failed");
                Err(ServiceError::RefundProcessingFailed(format!(
                    "Automated refund failed: {}",
                    e.response_message()
                )))
            }
        }
    }
}

/// Merges requested lines per product and prices them from the order's snapshot.
///
/// Quantities for the same product are summed before the ordered-quantity check.
fn requested_lines(
    ordered: &[OrderItemModel],
    requested: &[ReturnItemInput],
) -> Result<(Vec<(String, i32, Decimal)>, Decimal), ServiceError> {
    let mut merged: Vec<(String, i32)> = Vec::with_capacity(requested.len());
    for item in requested {
        if !ordered.iter().any(|oi| oi.product_id == item.product) {
            return Err(ServiceError::ValidationError(format!(
                "Item {} not found in order",
                item.product
            )));
        }
        if item.quantity < 1 {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for {} must be at least 1",
                item.product
            )));
        }
        match merged.iter_mut().find(|(product, _)| *product == item.product) {
            Some((_, quantity)) => *quantity = quantity.saturating_add(item.quantity),
            None => merged.push((item.product.clone(), item.quantity)),
        }
    }

    let mut lines = Vec::with_capacity(merged.len());
    let mut total = Decimal::ZERO;
    for (product, quantity) in merged {
        let matching = ordered.iter().filter(|oi| oi.product_id == product);
        let ordered_quantity: i32 = matching.clone().map(|oi| oi.quantity).sum();
        if quantity > ordered_quantity {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for {} exceeds order quantity",
                product
            )));
        }
        let price = matching.map(|oi| oi.price).next().unwrap_or_default();
        total = price
            .checked_mul(Decimal::from(quantity))
            .and_then(|line| total.checked_add(line))
            .ok_or_else(|| {
                ServiceError::ValidationError("Refund amount is out of range".to_string())
            })?;
        lines.push((product, quantity, price));
    }
    Ok((lines, total))
}

fn is_already_refunded(message: &str) -> bool {
    ALREADY_REFUNDED_MARKERS.iter().any(|m| message.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_idempotent_refund_messages() {
        assert!(is_already_refunded("Charge ch_1 has already been refunded."));
        assert!(is_already_refunded(
            "Refund amount ($30.00) is greater than unrefunded amount on charge ($10.00)"
        ));
        assert!(!is_already_refunded("Your card was declined."));
    }

    fn ordered_line(product: &str, quantity: i32, price: Decimal) -> OrderItemModel {
        OrderItemModel {
            id: new_object_id(),
            order_id: "0123456789abcdef01234567".to_string(),
            product_id: product.to_string(),
            name: product.to_string(),
            image: None,
            quantity,
            price,
        }
    }

    fn requested(product: &str, quantity: i32) -> ReturnItemInput {
        ReturnItemInput {
            product: product.to_string(),
            quantity,
        }
    }

    #[test]
    fn duplicate_lines_are_merged_before_the_quantity_check() {
        let ordered = vec![ordered_line("p1", 1, Decimal::new(4000, 2))];
        let err = requested_lines(&ordered, &[requested("p1", 1), requested("p1", 1)]).unwrap_err();
        assert!(
            matches!(&err, ServiceError::ValidationError(m) if m == "Quantity for p1 exceeds order quantity")
        );

        let ordered = vec![ordered_line("p1", 3, Decimal::new(4000, 2))];
        let (lines, total) =
            requested_lines(&ordered, &[requested("p1", 1), requested("p1", 2)]).unwrap();
        assert_eq!(lines, vec![("p1".to_string(), 3, Decimal::new(4000, 2))]);
        assert_eq!(total, Decimal::new(12000, 2));
    }

    #[test]
    fn non_positive_quantities_cannot_offset_other_lines() {
        let ordered = vec![ordered_line("p1", 1, Decimal::ONE)];
        let err = requested_lines(&ordered, &[requested("p1", 2), requested("p1", -1)]).unwrap_err();
        assert!(
            matches!(&err, ServiceError::ValidationError(m) if m == "Quantity for p1 must be at least 1")
        );
    }

    #[test]
    fn oversized_refund_totals_are_rejected() {
        let ordered = vec![ordered_line("p1", 2, Decimal::MAX)];
        let err = requested_lines(&ordered, &[requested("p1", 2)]).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
