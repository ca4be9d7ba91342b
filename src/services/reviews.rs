use crate::{
    auth::AuthUser,
    common::{is_object_id, new_object_id, parse_object_id},
    db::DbPool,
    entities::{
        product::{self, Entity as ProductEntity},
        review::{self, Entity as ReviewEntity, Model as ReviewModel},
    },
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

const REVIEW_NOT_FOUND: &str = "Review not found";
const ACCESS_FORBIDDEN: &str = "Access forbidden";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub product: String,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(min = 1, max = 2000, message = "Comment is required"))]
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
    #[validate(length(min = 1, max = 2000, message = "Comment is required"))]
    pub comment: Option<String>,
}

/// Product reviews and the rating summary kept on each product.
#[derive(Clone)]
pub struct ReviewService {
    db_pool: Arc<DbPool>,
}

impl ReviewService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Reviews for a product id or slug, newest first. Unknown products have none.
    #[instrument(skip(self))]
    pub async fn list_for_product(&self, id_or_slug: &str) -> Result<Vec<ReviewModel>, ServiceError> {
        let db = &*self.db_pool;
        let key = id_or_slug.trim();
        let product_id = if is_object_id(key) {
            key.to_ascii_lowercase()
        } else {
            match ProductEntity::find()
                .filter(product::Column::Slug.eq(key))
                .one(db)
                .await?
            {
                Some(product) => product.id,
                None => return Ok(Vec::new()),
            }
        };

        Ok(ReviewEntity::find()
            .filter(review::Column::ProductId.eq(product_id))
            .order_by_desc(review::Column::CreatedAt)
            .all(db)
            .await?)
    }

    /// Every review in the store, newest first.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<ReviewModel>, ServiceError> {
        Ok(ReviewEntity::find()
            .order_by_desc(review::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id))]
    pub async fn create_review(
        &self,
        actor: &AuthUser,
        request: CreateReviewRequest,
    ) -> Result<ReviewModel, ServiceError> {
        request.validate()?;
        let product_id = parse_object_id(&request.product, "Invalid product ID")?;

        let txn = self.db_pool.begin().await?;

        if ProductEntity::find_by_id(product_id.clone())
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }

        let already_reviewed = ReviewEntity::find()
            .filter(review::Column::ProductId.eq(product_id.clone()))
            .filter(review::Column::UserId.eq(actor.user_id.clone()))
            .one(&txn)
            .await?
            .is_some();
        if already_reviewed {
            return Err(ServiceError::BadRequest("Product already reviewed".to_string()));
        }

        let now = Utc::now();
        let review = review::ActiveModel {
            id: Set(new_object_id()),
            product_id: Set(product_id.clone()),
            user_id: Set(actor.user_id.clone()),
            user_name: Set(actor.name.clone()),
            rating: Set(request.rating),
            comment: Set(request.comment.trim().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        refresh_rating(&txn, &product_id).await?;
        txn.commit().await?;

        info!(review_id = %review.id, product_id = %product_id, rating = review.rating, "Review added");
        Ok(review)
    }

    /// Owner-only partial update of rating and comment.
    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id))]
    pub async fn update_review(
        &self,
        actor: &AuthUser,
        review_id: &str,
        request: UpdateReviewRequest,
    ) -> Result<ReviewModel, ServiceError> {
        request.validate()?;
        let review_id = parse_object_id(review_id, "Invalid review ID")?;

        let txn = self.db_pool.begin().await?;
        let existing = ReviewEntity::find_by_id(review_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(REVIEW_NOT_FOUND.to_string()))?;
        if existing.user_id != actor.user_id {
            return Err(ServiceError::Forbidden(ACCESS_FORBIDDEN.to_string()));
        }

        let product_id = existing.product_id.clone();
        let mut active = existing.into_active_model();
        if let Some(rating) = request.rating {
            active.rating = Set(rating);
        }
        if let Some(comment) = request.comment {
            active.comment = Set(comment.trim().to_string());
        }
        let updated = active.update(&txn).await?;

        refresh_rating(&txn, &product_id).await?;
        txn.commit().await?;

        info!(review_id = %updated.id, rating = updated.rating, "Review updated");
        Ok(updated)
    }

    /// Removes a review. Allowed for its author and for admins.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn delete_review(&self, actor: &AuthUser, review_id: &str) -> Result<(), ServiceError> {
        let review_id = parse_object_id(review_id, "Invalid review ID")?;

        let txn = self.db_pool.begin().await?;
        let existing = ReviewEntity::find_by_id(review_id.clone())
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(REVIEW_NOT_FOUND.to_string()))?;
        if !actor.can_access(&existing.user_id) {
            return Err(ServiceError::Forbidden(ACCESS_FORBIDDEN.to_string()));
        }

        let product_id = existing.product_id.clone();
        existing.delete(&txn).await?;
        refresh_rating(&txn, &product_id).await?;
        txn.commit().await?;

        info!(review_id = %review_id, product_id = %product_id, "Review deleted");
        Ok(())
    }
}

/// Mean rating and review count, `(0.0, 0)` when there are no ratings.
fn summarize(ratings: &[i32]) -> (f64, i32) {
    if ratings.is_empty() {
        return (0.0, 0);
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let count = ratings.len();
    (sum as f64 / count as f64, i32::try_from(count).unwrap_or(i32::MAX))
}

/// Rewrites `ratings` and `num_of_reviews` on the product from its current reviews.
async fn refresh_rating<C: ConnectionTrait>(db: &C, product_id: &str) -> Result<(), ServiceError> {
    let ratings: Vec<i32> = ReviewEntity::find()
        .filter(review::Column::ProductId.eq(product_id))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.rating)
        .collect();
    let (average, count) = summarize(&ratings);

    let Some(product) = ProductEntity::find_by_id(product_id.to_string()).one(db).await? else {
        return Ok(());
    };
    let mut active = product.into_active_model();
    active.ratings = Set(average);
    active.num_of_reviews = Set(count);
    active.update(db).await?;
    Ok(())
}
