use crate::{
    common::new_object_id,
    db::DbPool,
    entities::gateway_setting::{self, Entity as GatewaySettingEntity, Gateway, GatewayMode, Model},
    errors::ServiceError,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
use tracing::{info, instrument};

/// Source of payment gateway credentials. Implementations must not cache; settings can change
/// between requests.
#[async_trait]
pub trait GatewayConfigProvider: Send + Sync {
    /// The setting for `gateway` when it exists and is active.
    async fn active_gateway(&self, gateway: Gateway) -> Result<Option<Model>, ServiceError>;
}

/// Publishable view of an active gateway, safe to expose to shoppers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicGatewaySetting {
    pub gateway: Gateway,
    pub mode: GatewayMode,
    pub publishable_key: Option<String>,
    pub is_active: bool,
}

/// Partial update keyed by `gateway`. Omitted fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertGatewaySettingRequest {
    pub gateway: Gateway,
    #[serde(default)]
    pub mode: Option<GatewayMode>,
    #[serde(default)]
    pub test_secret_key: Option<String>,
    #[serde(default)]
    pub test_publishable_key: Option<String>,
    #[serde(default)]
    pub test_webhook_secret: Option<String>,
    #[serde(default)]
    pub live_secret_key: Option<String>,
    #[serde(default)]
    pub live_publishable_key: Option<String>,
    #[serde(default)]
    pub live_webhook_secret: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Database-backed gateway settings.
#[derive(Clone)]
pub struct GatewaySettingsService {
    db_pool: Arc<DbPool>,
}

impl GatewaySettingsService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// All stored settings, secrets included.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Model>, ServiceError> {
        let settings = GatewaySettingEntity::find()
            .order_by_asc(gateway_setting::Column::Gateway)
            .all(&*self.db_pool)
            .await?;
        Ok(settings)
    }

    #[instrument(skip(self))]
    pub async fn list_active_public(&self) -> Result<Vec<PublicGatewaySetting>, ServiceError> {
        let settings = GatewaySettingEntity::find()
            .filter(gateway_setting::Column::IsActive.eq(true))
            .order_by_asc(gateway_setting::Column::Gateway)
            .all(&*self.db_pool)
            .await?;

        Ok(settings
            .into_iter()
            .map(|s| PublicGatewaySetting {
                gateway: s.gateway,
                mode: s.mode,
                publishable_key: s.publishable_key().map(str::to_string),
                is_active: s.is_active,
            })
            .collect())
    }

    /// Creates or partially updates the setting for `request.gateway`.
    #[instrument(skip(self, request), fields(gateway = %request.gateway))]
    pub async fn upsert(&self, request: UpsertGatewaySettingRequest) -> Result<Model, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let existing = GatewaySettingEntity::find()
            .filter(gateway_setting::Column::Gateway.eq(request.gateway))
            .one(db)
            .await?;

        let saved = match existing {
            Some(setting) => {
                let mut active = setting.into_active_model();
                if let Some(mode) = request.mode {
                    active.mode = Set(mode);
                }
                if let Some(v) = request.test_secret_key {
                    active.test_secret_key = Set(Some(v));
                }
                if let Some(v) = request.test_publishable_key {
                    active.test_publishable_key = Set(Some(v));
                }
                if let Some(v) = request.test_webhook_secret {
                    active.test_webhook_secret = Set(Some(v));
                }
                if let Some(v) = request.live_secret_key {
                    active.live_secret_key = Set(Some(v));
                }
                if let Some(v) = request.live_publishable_key {
                    active.live_publishable_key = Set(Some(v));
                }
                if let Some(v) = request.live_webhook_secret {
                    active.live_webhook_secret = Set(Some(v));
                }
                if let Some(v) = request.is_active {
                    active.is_active = Set(v);
                }
                active.updated_at = Set(now);
                active.update(db).await?
            }
            None => {
                gateway_setting::ActiveModel {
                    id: Set(new_object_id()),
                    gateway: Set(request.gateway),
                    mode: Set(request.mode.unwrap_or_default()),
                    test_secret_key: Set(request.test_secret_key),
                    test_publishable_key: Set(request.test_publishable_key),
                    test_webhook_secret: Set(request.test_webhook_secret),
                    live_secret_key: Set(request.live_secret_key),
                    live_publishable_key: Set(request.live_publishable_key),
                    live_webhook_secret: Set(request.live_webhook_secret),
                    is_active: Set(request.is_active.unwrap_or(false)),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(db)
                .await?
            }
        };

        info!(gateway = %saved.gateway, mode = %saved.mode, is_active = saved.is_active, "Gateway setting saved");
        Ok(saved)
    }
}

#[async_trait]
impl GatewayConfigProvider for GatewaySettingsService {
    async fn active_gateway(&self, gateway: Gateway) -> Result<Option<Model>, ServiceError> {
        let setting = GatewaySettingEntity::find()
            .filter(gateway_setting::Column::Gateway.eq(gateway))
            .filter(gateway_setting::Column::IsActive.eq(true))
            .one(&*self.db_pool)
            .await?;
        Ok(setting)
    }
}
