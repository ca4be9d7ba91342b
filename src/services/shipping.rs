use crate::{
    common::new_object_id,
    db::DbPool,
    entities::shipping_setting::{self, Entity as ShippingSettingEntity, Model},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
use tracing::{info, instrument};

pub const DEFAULT_SHIPPING_FEE: Decimal = dec!(15);
pub const DEFAULT_FREE_SHIPPING_THRESHOLD: Decimal = dec!(100);

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShippingRequest {
    pub shipping_fee: Option<Decimal>,
    pub free_shipping_threshold: Option<Decimal>,
    pub is_active: Option<bool>,
}

/// Store-wide shipping fee and free-shipping threshold.
#[derive(Clone)]
pub struct ShippingService {
    db_pool: Arc<DbPool>,
}

impl ShippingService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Current settings, creating the defaults when none exist.
    #[instrument(skip(self))]
    pub async fn get_settings(&self) -> Result<Model, ServiceError> {
        let db = &*self.db_pool;
        if let Some(settings) = ShippingSettingEntity::find()
            .order_by_asc(shipping_setting::Column::CreatedAt)
            .one(db)
            .await?
        {
            return Ok(settings);
        }

        let now = Utc::now();
        let settings = shipping_setting::ActiveModel {
            id: Set(new_object_id()),
            shipping_fee: Set(DEFAULT_SHIPPING_FEE),
            free_shipping_threshold: Set(DEFAULT_FREE_SHIPPING_THRESHOLD),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!("Default shipping settings created");
        Ok(settings)
    }

    #[instrument(skip(self))]
    pub async fn update_settings(&self, request: UpdateShippingRequest) -> Result<Model, ServiceError> {
        let amounts = [request.shipping_fee, request.free_shipping_threshold];
        if amounts.iter().flatten().any(|a| a.is_sign_negative()) {
            return Err(ServiceError::ValidationError(
                "Shipping amounts must not be negative".to_string(),
            ));
        }

        let current = self.get_settings().await?;
        let mut active = current.into_active_model();
        if let Some(fee) = request.shipping_fee {
            active.shipping_fee = Set(fee);
        }
        if let Some(threshold) = request.free_shipping_threshold {
            active.free_shipping_threshold = Set(threshold);
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db_pool).await?;
        info!(shipping_fee = %updated.shipping_fee, threshold = %updated.free_shipping_threshold, "Shipping settings updated");
        Ok(updated)
    }
}
