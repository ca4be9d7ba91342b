//! Seed data script - populates the database with a demo catalog
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - 8 products across three categories
//! - default shipping settings
//! - an inactive test-mode Stripe gateway row, ready for keys

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use std::time::Duration;
use tracing::info;

use storefront_api::{
    common::{new_object_id, slugify},
    entities::{gateway_setting, product, shipping_setting},
    migrator::Migrator,
    services::shipping::{DEFAULT_FREE_SHIPPING_THRESHOLD, DEFAULT_SHIPPING_FEE},
};

const SEED_ADMIN_ID: &str = "000000000000000000000001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("=== Storefront Seed Data ===");

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://storefront.db?mode=rwc".to_string());

    let mut options = ConnectOptions::new(database_url.clone());
    options
        .max_connections(5)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10));

    info!("Connecting to database: {}", database_url);
    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;

    info!("Creating products...");
    let created = create_products(&db).await?;
    info!("  Created {} products", created);

    info!("Creating shipping settings...");
    create_shipping_settings(&db).await?;

    info!("Creating gateway settings...");
    create_gateway_settings(&db).await?;

    info!("=== Seed Data Complete ===");
    info!("Try: curl http://localhost:8080/api/products");

    Ok(())
}

async fn create_products(db: &DatabaseConnection) -> anyhow::Result<usize> {
    let products_data: Vec<(&str, Decimal, &str, &str, i32, bool)> = vec![
        ("Wireless Bluetooth Headphones", dec!(79.99), "Over-ear headphones with 30-hour battery life.", "Electronics", 40, true),
        ("USB-C Fast Charger 65W", dec!(34.99), "GaN charger for laptops, phones and tablets.", "Electronics", 120, false),
        ("Mechanical Keyboard RGB", dec!(129.99), "Hot-swappable mechanical keyboard with per-key lighting.", "Electronics", 25, true),
        ("Classic Cotton T-Shirt", dec!(24.99), "Organic cotton t-shirt with a relaxed fit.", "Apparel", 200, false),
        ("Slim Fit Denim Jeans", dec!(89.99), "Stretch denim jeans with a modern slim fit.", "Apparel", 60, false),
        ("Merino Wool Sweater", dec!(119.99), "Temperature-regulating merino wool sweater.", "Apparel", 30, true),
        ("Leather Bifold Wallet", dec!(49.99), "Genuine leather wallet with RFID blocking.", "Accessories", 80, false),
        ("Canvas Backpack 25L", dec!(79.99), "Water-resistant backpack with laptop sleeve.", "Accessories", 45, false),
    ];

    let now = Utc::now();
    let mut created = 0;

    for (name, price, description, category, stock, featured) in products_data {
        let slug = slugify(name);
        let exists = product::Entity::find()
            .filter(product::Column::Slug.eq(slug.as_str()))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }

        product::ActiveModel {
            id: Set(new_object_id()),
            name: Set(name.to_string()),
            slug: Set(slug.clone()),
            description: Set(description.to_string()),
            price: Set(price),
            category: Set(category.to_string()),
            brand: Set(Some("Storefront Demo".to_string())),
            images: Set(json!([format!("/images/{}.jpg", slug)])),
            stock: Set(stock),
            discount: Set(0),
            featured: Set(featured),
            ratings: Set(0.0),
            num_of_reviews: Set(0),
            created_by: Set(SEED_ADMIN_ID.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        created += 1;
    }

    Ok(created)
}

async fn create_shipping_settings(db: &DatabaseConnection) -> anyhow::Result<()> {
    if shipping_setting::Entity::find().one(db).await?.is_some() {
        return Ok(());
    }

    let now = Utc::now();
    shipping_setting::ActiveModel {
        id: Set(new_object_id()),
        shipping_fee: Set(DEFAULT_SHIPPING_FEE),
        free_shipping_threshold: Set(DEFAULT_FREE_SHIPPING_THRESHOLD),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(())
}

async fn create_gateway_settings(db: &DatabaseConnection) -> anyhow::Result<()> {
    let exists = gateway_setting::Entity::find()
        .filter(gateway_setting::Column::Gateway.eq(gateway_setting::Gateway::Stripe))
        .one(db)
        .await?
        .is_some();
    if exists {
        return Ok(());
    }

    let now = Utc::now();
    gateway_setting::ActiveModel {
        id: Set(new_object_id()),
        gateway: Set(gateway_setting::Gateway::Stripe),
        mode: Set(gateway_setting::GatewayMode::Test),
        test_secret_key: Set(None),
        test_publishable_key: Set(None),
        test_webhook_secret: Set(None),
        live_secret_key: Set(None),
        live_publishable_key: Set(None),
        live_webhook_secret: Set(None),
        is_active: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(())
}
