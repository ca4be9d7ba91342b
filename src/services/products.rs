use crate::{
    common::{is_object_id, new_object_id, parse_object_id, slugify},
    db::DbPool,
    entities::product::{self, Entity as ProductEntity, Model as ProductModel},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::{Validate, ValidationError};

const PRODUCT_NOT_FOUND: &str = "Product not found";
const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        return Err(ValidationError::new("must_not_be_negative"));
    }
    Ok(())
}

/// Query string for `GET /products`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub featured: Option<bool>,
    /// `price`, `-price`, `name`, `createdAt` or `-createdAt`.
    pub sort: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<ProductModel>,
    pub pagination: Pagination,
}

/// A category name with the number of products filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub name: String,
    pub product_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom = "validate_non_negative")]
    pub price: Decimal,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,
    #[serde(default)]
    #[validate(range(min = 0, max = 100, message = "Discount must be between 0 and 100"))]
    pub discount: i32,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub price: Option<Decimal>,
    #[validate(length(min = 1))]
    pub category: Option<String>,
    pub brand: Option<String>,
    pub images: Option<Vec<String>>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
    #[validate(range(min = 0, max = 100, message = "Discount must be between 0 and 100"))]
    pub discount: Option<i32>,
    pub featured: Option<bool>,
}

/// Product catalog reads and admin maintenance.
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Filtered, sorted page of the catalog.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: ProductListQuery) -> Result<ProductPage, ServiceError> {
        let page = query.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = query
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);

        let select = apply_sort(filtered(&query), query.sort.as_deref());
        let paginator = select.paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page - 1).await?;

        Ok(ProductPage {
            products,
            pagination: Pagination {
                page,
                limit,
                total,
                pages: total.div_ceil(limit),
            },
        })
    }

    /// Looks a product up by id, or by slug when the key is not an id.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id_or_slug: &str) -> Result<ProductModel, ServiceError> {
        let key = id_or_slug.trim();
        let select = if is_object_id(key) {
            ProductEntity::find_by_id(key.to_ascii_lowercase())
        } else {
            ProductEntity::find().filter(product::Column::Slug.eq(key))
        };

        select
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(PRODUCT_NOT_FOUND.to_string()))
    }

    /// Distinct categories in use, alphabetically.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategorySummary>, ServiceError> {
        let rows: Vec<(String, i64)> = ProductEntity::find()
            .select_only()
            .column(product::Column::Category)
            .column_as(Expr::col(product::Column::Id).count(), "product_count")
            .group_by(product::Column::Category)
            .order_by_asc(product::Column::Category)
            .into_tuple()
            .all(&*self.db_pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(name, product_count)| CategorySummary { name, product_count })
            .collect())
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(
        &self,
        created_by: &str,
        request: CreateProductRequest,
    ) -> Result<ProductModel, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let now = Utc::now();
        let slug = unique_slug(db, &request.name, None).await?;

        let product = product::ActiveModel {
            id: Set(new_object_id()),
            name: Set(request.name),
            slug: Set(slug),
            description: Set(request.description),
            price: Set(request.price),
            category: Set(request.category),
            brand: Set(request.brand),
            images: Set(serde_json::json!(request.images)),
            stock: Set(request.stock),
            discount: Set(request.discount),
            featured: Set(request.featured),
            ratings: Set(0.0),
            num_of_reviews: Set(0),
            created_by: Set(created_by.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(product_id = %product.id, slug = %product.slug, "Product created");
        Ok(product)
    }

    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        product_id: &str,
        request: UpdateProductRequest,
    ) -> Result<ProductModel, ServiceError> {
        request.validate()?;
        let product_id = parse_object_id(product_id, "Invalid product ID format")?;
        let db = &*self.db_pool;
        let existing = ProductEntity::find_by_id(product_id.clone())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(PRODUCT_NOT_FOUND.to_string()))?;

        let renamed = request
            .name
            .as_ref()
            .filter(|name| **name != existing.name)
            .cloned();

        let mut active = existing.into_active_model();
        if let Some(name) = renamed {
            active.slug = Set(unique_slug(db, &name, Some(&product_id)).await?);
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(description);
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(category) = request.category {
            active.category = Set(category);
        }
        if let Some(brand) = request.brand {
            active.brand = Set(Some(brand));
        }
        if let Some(images) = request.images {
            active.images = Set(serde_json::json!(images));
        }
        if let Some(stock) = request.stock {
            active.stock = Set(stock);
        }
        if let Some(discount) = request.discount {
            active.discount = Set(discount);
        }
        if let Some(featured) = request.featured {
            active.featured = Set(featured);
        }

        let updated = active.update(db).await?;
        info!(product_id = %product_id, "Product updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: &str) -> Result<(), ServiceError> {
        let product_id = parse_object_id(product_id, "Invalid product ID format")?;
        let result = ProductEntity::delete_by_id(product_id.clone())
            .exec(&*self.db_pool)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(PRODUCT_NOT_FOUND.to_string()));
        }
        info!(product_id = %product_id, "Product deleted");
        Ok(())
    }
}

fn filtered(query: &ProductListQuery) -> Select<ProductEntity> {
    let mut select = ProductEntity::find();

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(product::Column::Name.contains(search))
                .add(product::Column::Description.contains(search)),
        );
    }
    if let Some(category) = query.category.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(product::Column::Category.eq(category));
    }
    if let Some(brand) = query.brand.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(product::Column::Brand.eq(brand));
    }
    if let Some(min) = query.min_price {
        select = select.filter(product::Column::Price.gte(min));
    }
    if let Some(max) = query.max_price {
        select = select.filter(product::Column::Price.lte(max));
    }
    if let Some(featured) = query.featured {
        select = select.filter(product::Column::Featured.eq(featured));
    }
    select
}

fn apply_sort(select: Select<ProductEntity>, sort: Option<&str>) -> Select<ProductEntity> {
    match sort.map(str::trim) {
        Some("price") => select.order_by_asc(product::Column::Price),
        Some("-price") => select.order_by_desc(product::Column::Price),
        Some("name") => select.order_by_asc(product::Column::Name),
        Some("-name") => select.order_by_desc(product::Column::Name),
        Some("createdAt") => select.order_by_asc(product::Column::CreatedAt),
        _ => select.order_by_desc(product::Column::CreatedAt),
    }
    .order_by_asc(product::Column::Id)
}

/// Slug derived from `name`, suffixed with a counter when already taken by another product.
async fn unique_slug<C: ConnectionTrait>(
    db: &C,
    name: &str,
    exclude_id: Option<&str>,
) -> Result<String, ServiceError> {
    let base = match slugify(name) {
        s if s.is_empty() => "product".to_string(),
        s => s,
    };

    let mut candidate = base.clone();
    let mut suffix = 2;
    loop {
        let mut select = ProductEntity::find().filter(product::Column::Slug.eq(candidate.as_str()));
        if let Some(id) = exclude_id {
            select = select.filter(product::Column::Id.ne(id));
        }
        if select.count(db).await? == 0 {
            return Ok(candidate);
        }
        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }
}
