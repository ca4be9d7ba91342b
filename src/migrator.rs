use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_products_table::Migration),
            Box::new(m20240101_000002_create_orders_tables::Migration),
            Box::new(m20240101_000003_create_payments_table::Migration),
            Box::new(m20240101_000004_create_returns_tables::Migration),
            Box::new(m20240101_000005_create_gateway_settings_table::Migration),
            Box::new(m20240101_000006_create_shipping_settings_table::Migration),
            Box::new(m20240101_000007_create_carts_tables::Migration),
            Box::new(m20240101_000008_create_reviews_table::Migration),
        ]
    }
}

fn money<T: IntoIden + 'static>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .decimal_len(16, 4)
        .not_null()
        .default(0)
        .to_owned()
}

fn object_id<T: IntoIden + 'static>(col: T) -> ColumnDef {
    ColumnDef::new(col).string_len(24).not_null().to_owned()
}

mod m20240101_000001_create_products_table {
    use super::{money, object_id};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(object_id(Products::Id).primary_key())
                        .col(ColumnDef::new(Products::Name).string_len(100).not_null())
                        .col(ColumnDef::new(Products::Slug).string_len(160).not_null())
                        .col(ColumnDef::new(Products::Description).text().not_null())
                        .col(&mut money(Products::Price))
                        .col(ColumnDef::new(Products::Category).string().not_null())
                        .col(ColumnDef::new(Products::Brand).string().null())
                        .col(ColumnDef::new(Products::Images).json().not_null())
                        .col(
                            ColumnDef::new(Products::Stock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::Discount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::Featured)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Products::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_slug")
                        .table(Products::Table)
                        .col(Products::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category")
                        .table(Products::Table)
                        .col(Products::Category)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Name,
        Slug,
        Description,
        Price,
        Category,
        Brand,
        Images,
        Stock,
        Discount,
        Featured,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_orders_tables {
    use super::{money, object_id};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(object_id(Orders::Id).primary_key())
                        .col(ColumnDef::new(Orders::UserId).string().not_null())
                        .col(ColumnDef::new(Orders::UserEmail).string().null())
                        .col(ColumnDef::new(Orders::ShippingAddress).json().not_null())
                        .col(ColumnDef::new(Orders::PaymentMethod).string_len(20).not_null())
                        .col(&mut money(Orders::ItemsPrice))
                        .col(&mut money(Orders::TaxPrice))
                        .col(&mut money(Orders::ShippingPrice))
                        .col(&mut money(Orders::TotalPrice))
                        .col(
                            ColumnDef::new(Orders::Status)
                                .string_len(20)
                                .not_null()
                                .default("Processing"),
                        )
                        .col(
                            ColumnDef::new(Orders::IsPaid)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Orders::PaidAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::IsDelivered)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Orders::DeliveredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Orders::PaymentResultId).string().null())
                        .col(ColumnDef::new(Orders::PaymentResultStatus).string().null())
                        .col(
                            ColumnDef::new(Orders::PaymentResultUpdateTime)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Orders::PaymentResultEmail).string().null())
                        .col(ColumnDef::new(Orders::TrackingNumber).string().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_user_id")
                        .table(Orders::Table)
                        .col(Orders::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_created_at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await?;

            // No FK to products: lines keep their snapshot after a product is deleted.
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(object_id(OrderItems::Id).primary_key())
                        .col(object_id(OrderItems::OrderId))
                        .col(ColumnDef::new(OrderItems::ProductId).string().not_null())
                        .col(ColumnDef::new(OrderItems::Name).string().not_null())
                        .col(ColumnDef::new(OrderItems::Image).string().null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(&mut money(OrderItems::Price))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        UserId,
        UserEmail,
        ShippingAddress,
        PaymentMethod,
        ItemsPrice,
        TaxPrice,
        ShippingPrice,
        TotalPrice,
        Status,
        IsPaid,
        PaidAt,
        IsDelivered,
        DeliveredAt,
        PaymentResultId,
        PaymentResultStatus,
        PaymentResultUpdateTime,
        PaymentResultEmail,
        TrackingNumber,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        Name,
        Image,
        Quantity,
        Price,
    }
}

mod m20240101_000003_create_payments_table {
    use super::m20240101_000002_create_orders_tables::Orders;
    use super::{money, object_id};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_payments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Payments::Table)
                        .if_not_exists()
                        .col(object_id(Payments::Id).primary_key())
                        .col(ColumnDef::new(Payments::UserId).string().not_null())
                        .col(object_id(Payments::OrderId))
                        .col(ColumnDef::new(Payments::PaymentIntentId).string().not_null())
                        .col(&mut money(Payments::Amount))
                        .col(
                            ColumnDef::new(Payments::Currency)
                                .string_len(3)
                                .not_null()
                                .default("usd"),
                        )
                        .col(
                            ColumnDef::new(Payments::Status)
                                .string_len(20)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(Payments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Payments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payments_order_id")
                                .from(Payments::Table, Payments::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payments_payment_intent_id")
                        .table(Payments::Table)
                        .col(Payments::PaymentIntentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Payments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Payments {
        Table,
        Id,
        UserId,
        OrderId,
        PaymentIntentId,
        Amount,
        Currency,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_returns_tables {
    use super::m20240101_000002_create_orders_tables::Orders;
    use super::{money, object_id};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_returns_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Returns::Table)
                        .if_not_exists()
                        .col(object_id(Returns::Id).primary_key())
                        .col(object_id(Returns::OrderId))
                        .col(ColumnDef::new(Returns::UserId).string().not_null())
                        .col(ColumnDef::new(Returns::Reason).text().not_null())
                        .col(&mut money(Returns::TotalRefundAmount))
                        .col(
                            ColumnDef::new(Returns::Status)
                                .string_len(20)
                                .not_null()
                                .default("Processing"),
                        )
                        .col(ColumnDef::new(Returns::AdminNotes).text().null())
                        .col(
                            ColumnDef::new(Returns::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Returns::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_returns_order_id")
                                .from(Returns::Table, Returns::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_returns_user_id")
                        .table(Returns::Table)
                        .col(Returns::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ReturnItems::Table)
                        .if_not_exists()
                        .col(object_id(ReturnItems::Id).primary_key())
                        .col(object_id(ReturnItems::ReturnId))
                        .col(ColumnDef::new(ReturnItems::ProductId).string().not_null())
                        .col(ColumnDef::new(ReturnItems::Quantity).integer().not_null())
                        .col(&mut money(ReturnItems::Price))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_return_items_return_id")
                                .from(ReturnItems::Table, ReturnItems::ReturnId)
                                .to(Returns::Table, Returns::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReturnItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Returns::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Returns {
        Table,
        Id,
        OrderId,
        UserId,
        Reason,
        TotalRefundAmount,
        Status,
        AdminNotes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ReturnItems {
        Table,
        Id,
        ReturnId,
        ProductId,
        Quantity,
        Price,
    }
}

mod m20240101_000005_create_gateway_settings_table {
    use super::object_id;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_gateway_settings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(GatewaySettings::Table)
                        .if_not_exists()
                        .col(object_id(GatewaySettings::Id).primary_key())
                        .col(
                            ColumnDef::new(GatewaySettings::Gateway)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GatewaySettings::Mode)
                                .string_len(20)
                                .not_null()
                                .default("test"),
                        )
                        .col(ColumnDef::new(GatewaySettings::TestSecretKey).string().null())
                        .col(
                            ColumnDef::new(GatewaySettings::TestPublishableKey)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(GatewaySettings::TestWebhookSecret)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(GatewaySettings::LiveSecretKey).string().null())
                        .col(
                            ColumnDef::new(GatewaySettings::LivePublishableKey)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(GatewaySettings::LiveWebhookSecret)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(GatewaySettings::IsActive)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(GatewaySettings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GatewaySettings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_gateway_settings_gateway")
                        .table(GatewaySettings::Table)
                        .col(GatewaySettings::Gateway)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(GatewaySettings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum GatewaySettings {
        Table,
        Id,
        Gateway,
        Mode,
        TestSecretKey,
        TestPublishableKey,
        TestWebhookSecret,
        LiveSecretKey,
        LivePublishableKey,
        LiveWebhookSecret,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000006_create_shipping_settings_table {
    use super::{money, object_id};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_shipping_settings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ShippingSettings::Table)
                        .if_not_exists()
                        .col(object_id(ShippingSettings::Id).primary_key())
                        .col(&mut money(ShippingSettings::ShippingFee))
                        .col(&mut money(ShippingSettings::FreeShippingThreshold))
                        .col(
                            ColumnDef::new(ShippingSettings::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ShippingSettings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShippingSettings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ShippingSettings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ShippingSettings {
        Table,
        Id,
        ShippingFee,
        FreeShippingThreshold,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000007_create_carts_tables {
    use super::{money, object_id};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000007_create_carts_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Carts::Table)
                        .if_not_exists()
                        .col(object_id(Carts::Id).primary_key())
                        .col(ColumnDef::new(Carts::UserId).string().not_null())
                        .col(&mut money(Carts::TotalPrice))
                        .col(
                            ColumnDef::new(Carts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Carts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_carts_user_id")
                        .table(Carts::Table)
                        .col(Carts::UserId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(object_id(CartItems::Id).primary_key())
                        .col(object_id(CartItems::CartId))
                        .col(ColumnDef::new(CartItems::ProductId).string().not_null())
                        .col(ColumnDef::new(CartItems::Quantity).integer().not_null())
                        .col(&mut money(CartItems::Price))
                        .col(
                            ColumnDef::new(CartItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_cart_id")
                                .from(CartItems::Table, CartItems::CartId)
                                .to(Carts::Table, Carts::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Carts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Carts {
        Table,
        Id,
        UserId,
        TotalPrice,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CartItems {
        Table,
        Id,
        CartId,
        ProductId,
        Quantity,
        Price,
        CreatedAt,
    }
}

mod m20240101_000008_create_reviews_table {
    use super::object_id;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000008_create_reviews_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Reviews::Table)
                        .if_not_exists()
                        .col(object_id(Reviews::Id).primary_key())
                        .col(object_id(Reviews::ProductId))
                        .col(ColumnDef::new(Reviews::UserId).string().not_null())
                        .col(ColumnDef::new(Reviews::UserName).string().null())
                        .col(ColumnDef::new(Reviews::Rating).integer().not_null())
                        .col(ColumnDef::new(Reviews::Comment).text().not_null())
                        .col(
                            ColumnDef::new(Reviews::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reviews::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reviews_product_id")
                                .from(Reviews::Table, Reviews::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One review per customer and product.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reviews_product_user")
                        .table(Reviews::Table)
                        .col(Reviews::ProductId)
                        .col(Reviews::UserId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            // SQLite accepts a single column per ALTER TABLE.
            manager
                .alter_table(
                    Table::alter()
                        .table(Products::Table)
                        .add_column(
                            ColumnDef::new(Products::Ratings)
                                .double()
                                .not_null()
                                .default(0.0),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .alter_table(
                    Table::alter()
                        .table(Products::Table)
                        .add_column(
                            ColumnDef::new(Products::NumOfReviews)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .alter_table(
                    Table::alter()
                        .table(Products::Table)
                        .drop_column(Products::NumOfReviews)
                        .to_owned(),
                )
                .await?;
            manager
                .alter_table(
                    Table::alter()
                        .table(Products::Table)
                        .drop_column(Products::Ratings)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_table(Table::drop().table(Reviews::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Ratings,
        NumOfReviews,
    }

    #[derive(DeriveIden)]
    enum Reviews {
        Table,
        Id,
        ProductId,
        UserId,
        UserName,
        Rating,
        Comment,
        CreatedAt,
        UpdatedAt,
    }
}
