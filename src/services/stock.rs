//! Stock ledger.
//!
//! Every stock change goes through these functions so the non-negative invariant is enforced
//! by a single conditional `UPDATE`. They take any [`ConnectionTrait`] so callers can run them
//! inside their own transaction.

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::{debug, warn};

use crate::entities::product;
use crate::errors::ServiceError;

/// Atomically takes `quantity` units of `product_id` out of stock.
///
/// Fails with `NotFound` when the product does not exist and with `InsufficientStock` when
/// fewer than `quantity` units are available; stock is unchanged in both cases. Returns the
/// product as read before the decrement.
pub async fn reserve<C: ConnectionTrait>(
    db: &C,
    product_id: &str,
    quantity: i32,
) -> Result<product::Model, ServiceError> {
    if quantity < 1 {
        return Err(ServiceError::ValidationError(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let product = product::Entity::find_by_id(product_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product not found: {}", product_id)))?;

    let result = product::Entity::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).sub(quantity),
        )
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::Stock.gte(quantity))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        // Re-read so the message reports the stock that made the update miss.
        let available = product::Entity::find_by_id(product_id.to_string())
            .one(db)
            .await?
            .map(|p| p.stock)
            .unwrap_or(product.stock);
        return Err(ServiceError::InsufficientStock(format!(
            "Insufficient stock for product: {}. Available: {}",
            product.name, available
        )));
    }

    debug!(product_id = %product_id, quantity, "Stock reserved");
    Ok(product)
}

/// Returns `quantity` units of `product_id` to stock. Products that no longer exist are skipped.
pub async fn restore<C: ConnectionTrait>(
    db: &C,
    product_id: &str,
    quantity: i32,
) -> Result<(), ServiceError> {
    if quantity < 1 {
        return Ok(());
    }

    let result = product::Entity::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).add(quantity),
        )
        .filter(product::Column::Id.eq(product_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        warn!(product_id = %product_id, quantity, "Skipping stock restore for missing product");
    } else {
        debug!(product_id = %product_id, quantity, "Stock restored");
    }
    Ok(())
}

/// Restores every `(product_id, quantity)` line.
pub async fn restore_lines<C: ConnectionTrait>(
    db: &C,
    lines: Vec<(String, i32)>,
) -> Result<(), ServiceError> {
    for (product_id, quantity) in lines {
        restore(db, &product_id, quantity).await?;
    }
    Ok(())
}
