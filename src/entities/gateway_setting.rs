use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Gateway {
    #[sea_orm(string_value = "stripe")]
    Stripe,
    #[sea_orm(string_value = "paypal")]
    Paypal,
    #[sea_orm(string_value = "cod")]
    Cod,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GatewayMode {
    #[default]
    #[sea_orm(string_value = "test")]
    Test,
    #[sea_orm(string_value = "live")]
    Live,
}

/// Credentials and activation flag for one payment gateway. One row per gateway.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gateway_settings")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub gateway: Gateway,
    pub mode: GatewayMode,
    pub test_secret_key: Option<String>,
    pub test_publishable_key: Option<String>,
    pub test_webhook_secret: Option<String>,
    pub live_secret_key: Option<String>,
    pub live_publishable_key: Option<String>,
    pub live_webhook_secret: Option<String>,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Secret key for the configured mode, ignoring blank values.
    pub fn secret_key(&self) -> Option<&str> {
        match self.mode {
            GatewayMode::Test => self.test_secret_key.as_deref(),
            GatewayMode::Live => self.live_secret_key.as_deref(),
        }
        .filter(|s| !s.trim().is_empty())
    }

    pub fn publishable_key(&self) -> Option<&str> {
        match self.mode {
            GatewayMode::Test => self.test_publishable_key.as_deref(),
            GatewayMode::Live => self.live_publishable_key.as_deref(),
        }
        .filter(|s| !s.trim().is_empty())
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        match self.mode {
            GatewayMode::Test => self.test_webhook_secret.as_deref(),
            GatewayMode::Live => self.live_webhook_secret.as_deref(),
        }
        .filter(|s| !s.trim().is_empty())
    }
}
