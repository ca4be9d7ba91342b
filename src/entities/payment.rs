use rust_decimal::Decimal;
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
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "succeeded")]
    Succeeded,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl PaymentStatus {
    /// Maps a provider intent status onto the local payment status.
    pub fn from_provider_status(status: &str) -> Self {
        match status {
            "succeeded" => Self::Succeeded,
            "canceled" | "requires_payment_method" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// Local record of a provider payment intent.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub order_id: String,
    pub payment_intent_id: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::PaymentStatus;
    use rstest::rstest;

    #[rstest]
    #[case("succeeded", PaymentStatus::Succeeded)]
    #[case("canceled", PaymentStatus::Failed)]
    #[case("requires_payment_method", PaymentStatus::Failed)]
    #[case("processing", PaymentStatus::Pending)]
    #[case("requires_action", PaymentStatus::Pending)]
    fn provider_status_mapping(#[case] raw: &str, #[case] expected: PaymentStatus) {
        assert_eq!(PaymentStatus::from_provider_status(raw), expected);
    }
}
