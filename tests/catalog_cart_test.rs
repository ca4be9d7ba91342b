//! Catalog, cart, shipping settings and health endpoint tests.

mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

// ==================== Catalog ====================

#[tokio::test]
async fn admin_creates_and_updates_products_with_slugs() {
    let app = TestApp::new().await;
    let admin = app.admin_token();

    let request = json!({
        "name": "Trail Runner Shoes",
        "description": "Lightweight trail shoes",
        "price": "89.90",
        "category": "Footwear",
        "brand": "Acme",
        "images": ["/images/trail.jpg"],
        "stock": 12
    });
    let (status, body) = app
        .request(Method::POST, "/api/products", Some(&admin), Some(request.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Product created successfully");
    let product = &body["data"]["product"];
    assert_eq!(product["slug"], "trail-runner-shoes");
    let id = product["id"].as_str().unwrap().to_string();

    // Duplicate names get a numbered slug.
    let (_, body) = app
        .request(Method::POST, "/api/products", Some(&admin), Some(request))
        .await;
    assert_eq!(body["data"]["product"]["slug"], "trail-runner-shoes-2");

    let (status, body) = app
        .request(Method::GET, "/api/products/trail-runner-shoes", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["product"]["id"], id.as_str());

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/products/{}", id),
            Some(&admin),
            Some(json!({ "price": "79.90", "featured": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(decimal(&body["data"]["product"]["price"]), dec!(79.90));
    assert_eq!(body["data"]["product"]["featured"], true);
    assert_eq!(body["data"]["product"]["stock"], 12);

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/products/{}", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .request(Method::GET, &format!("/api/products/{}", id), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found");
}

#[tokio::test]
async fn product_writes_are_admin_only_and_validated() {
    let app = TestApp::new().await;
    let customer = app.customer_token();
    let admin = app.admin_token();
    let request = json!({ "name": "Cap", "price": "10", "category": "Hats" });

    let (status, _) = app
        .request(Method::POST, "/api/products", None, Some(request.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::POST, "/api/products", Some(&customer), Some(request))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/products",
            Some(&admin),
            Some(json!({ "name": "Cap", "price": "-1", "category": "Hats" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/products",
            Some(&admin),
            Some(json!({ "name": "Cap", "price": "10", "category": "Hats", "discount": 150 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_filters_sorts_and_paginates() {
    let app = TestApp::new().await;
    app.seed_product("Alpha Lamp", dec!(30.00), 1).await;
    app.seed_product("Beta Lamp", dec!(10.00), 1).await;
    app.seed_product("Gamma Chair", dec!(50.00), 1).await;

    let (status, body) = app
        .request(Method::GET, "/api/products?search=lamp&sort=price", None, None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let products = body["data"]["products"].as_array().unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0]["name"], "Beta Lamp");
    assert_eq!(products[1]["name"], "Alpha Lamp");

    let (_, body) = app
        .request(Method::GET, "/api/products?minPrice=20&sort=-price", None, None)
        .await;
    let names: Vec<_> = body["data"]["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Gamma Chair", "Alpha Lamp"]);

    let (_, body) = app
        .request(Method::GET, "/api/products?limit=2&page=2&sort=name", None, None)
        .await;
    assert_eq!(body["data"]["products"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["products"][0]["name"], "Gamma Chair");
    assert_eq!(
        body["data"]["pagination"],
        json!({ "page": 2, "limit": 2, "total": 3, "pages": 2 })
    );

    let (status, _) = app
        .request(Method::GET, "/api/products?page=abc", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ==================== Cart ====================

#[tokio::test]
async fn cart_merges_lines_and_recomputes_totals() {
    let app = TestApp::new().await;
    let token = app.customer_token();
    let lamp = app.seed_product("Lamp", dec!(12.50), 10).await;
    let bulb = app.seed_product("Bulb", dec!(2.00), 10).await;

    let (status, body) = app.request(Method::GET, "/api/cart", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cart"]["items"].as_array().unwrap().len(), 0);
    assert_eq!(decimal(&body["data"]["cart"]["totalPrice"]), dec!(0));

    app.request(
        Method::POST,
        "/api/cart/add",
        Some(&token),
        Some(json!({ "productId": lamp.id, "quantity": 1 })),
    )
    .await;
    app.request(
        Method::POST,
        "/api/cart/add",
        Some(&token),
        Some(json!({ "productId": lamp.id, "quantity": 2 })),
    )
    .await;
    let (status, body) = app
        .request(
            Method::POST,
            "/api/cart/add",
            Some(&token),
            Some(json!({ "productId": bulb.id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let cart = &body["data"]["cart"];
    let items = cart["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(decimal(&cart["totalPrice"]), dec!(39.50));

    let lamp_line = items
        .iter()
        .find(|i| i["product"] == lamp.id.as_str())
        .unwrap();
    assert_eq!(lamp_line["quantity"], 3);
    let line_id = lamp_line["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/cart/{}", line_id),
            Some(&token),
            Some(json!({ "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["data"]["cart"]["totalPrice"]), dec!(14.50));

    let (status, body) = app
        .request(Method::DELETE, &format!("/api/cart/{}", line_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cart"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(decimal(&body["data"]["cart"]["totalPrice"]), dec!(2.00));
}

#[tokio::test]
async fn cart_errors() {
    let app = TestApp::new().await;
    let token = app.customer_token();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/cart/add",
            Some(&token),
            Some(json!({ "productId": "ffffffffffffffffffffffff" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found");

    let (status, body) = app
        .request(
            Method::PUT,
            "/api/cart/ffffffffffffffffffffffff",
            Some(&token),
            Some(json!({ "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Cart not found");

    app.request(Method::GET, "/api/cart", Some(&token), None).await;
    let (status, body) = app
        .request(
            Method::PUT,
            "/api/cart/ffffffffffffffffffffffff",
            Some(&token),
            Some(json!({ "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Item not found in cart");

    let (status, _) = app.request(Method::GET, "/api/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ==================== Shipping ====================

#[tokio::test]
async fn shipping_settings_default_and_update() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/shipping", None, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Shipping settings retrieved successfully");
    assert_eq!(decimal(&body["data"]["settings"]["shippingFee"]), dec!(15));
    assert_eq!(
        decimal(&body["data"]["settings"]["freeShippingThreshold"]),
        dec!(100)
    );

    let admin = app.admin_token();
    let (status, body) = app
        .request(
            Method::POST,
            "/api/shipping/settings",
            Some(&admin),
            Some(json!({ "shippingFee": "7.50" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(decimal(&body["data"]["settings"]["shippingFee"]), dec!(7.50));
    assert_eq!(
        decimal(&body["data"]["settings"]["freeShippingThreshold"]),
        dec!(100)
    );

    let (status, body) = app
        .request(
            Method::POST,
            "/api/shipping/settings",
            Some(&admin),
            Some(json!({ "shippingFee": "-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Shipping amounts must not be negative");

    let customer = app.customer_token();
    let (status, _) = app
        .request(
            Method::POST,
            "/api/shipping/settings",
            Some(&customer),
            Some(json!({ "shippingFee": "1" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ==================== Health ====================

#[tokio::test]
async fn health_reports_database_up() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"], "up");
    assert!(body["version"].is_string());
}
