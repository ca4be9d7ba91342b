//! Product review and category listing tests.

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, CUSTOMER_ID};
use rust_decimal_macros::dec;
use serde_json::json;

async fn product_summary(app: &TestApp, id: &str) -> (f64, i64) {
    let (_, body) = app
        .request(Method::GET, &format!("/api/products/{}", id), None, None)
        .await;
    let product = &body["data"]["product"];
    (
        product["ratings"].as_f64().unwrap(),
        product["numOfReviews"].as_i64().unwrap(),
    )
}

#[tokio::test]
async fn reviews_roll_up_into_the_product_rating() {
    let app = TestApp::new().await;
    let product = app.seed_product("Desk Lamp", dec!(30), 5).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/reviews",
            Some(&app.customer_token()),
            Some(json!({ "product": product.id, "rating": 4, "comment": "Bright enough" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Review added successfully");
    assert_eq!(body["data"]["review"]["user"], CUSTOMER_ID);
    assert_eq!(body["data"]["review"]["product"], product.id.as_str());

    let (status, _) = app
        .request(
            Method::POST,
            "/api/reviews",
            Some(&app.other_customer_token()),
            Some(json!({ "product": product.id, "rating": 5, "comment": "Love it" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    assert_eq!(product_summary(&app, &product.id).await, (4.5, 2));

    // Listing works by slug as well as by id, newest first.
    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/reviews/product/{}", product.slug),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let reviews = body["data"]["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0]["comment"], "Love it");
    assert_eq!(reviews[1]["comment"], "Bright enough");
}

#[tokio::test]
async fn each_customer_reviews_a_product_once() {
    let app = TestApp::new().await;
    let product = app.seed_product("Kettle", dec!(25), 5).await;
    let token = app.customer_token();
    let review = json!({ "product": product.id, "rating": 3, "comment": "Fine" });

    let (status, _) = app
        .request(Method::POST, "/api/reviews", Some(&token), Some(review.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .request(Method::POST, "/api/reviews", Some(&token), Some(review))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Product already reviewed");
    assert_eq!(product_summary(&app, &product.id).await, (3.0, 1));
}

#[tokio::test]
async fn review_requests_are_validated() {
    let app = TestApp::new().await;
    let product = app.seed_product("Kettle", dec!(25), 5).await;
    let token = app.customer_token();

    let (status, _) = app
        .request(
            Method::POST,
            "/api/reviews",
            None,
            Some(json!({ "product": product.id, "rating": 3, "comment": "Fine" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/reviews",
            Some(&token),
            Some(json!({ "product": product.id, "rating": 6, "comment": "Fine" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/reviews",
            Some(&token),
            Some(json!({ "product": "ffffffffffffffffffffffff", "rating": 3, "comment": "Fine" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found");
}

#[tokio::test]
async fn only_the_author_updates_and_admins_may_delete() {
    let app = TestApp::new().await;
    let product = app.seed_product("Chair", dec!(120), 2).await;
    let customer = app.customer_token();

    let (_, body) = app
        .request(
            Method::POST,
            "/api/reviews",
            Some(&customer),
            Some(json!({ "product": product.id, "rating": 2, "comment": "Wobbly" })),
        )
        .await;
    let review_id = body["data"]["review"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/reviews/{}", review_id);

    let (status, body) = app
        .request(
            Method::PUT,
            &uri,
            Some(&app.other_customer_token()),
            Some(json!({ "rating": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access forbidden");

    let (status, _) = app
        .request(Method::DELETE, &uri, Some(&app.other_customer_token()), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(Method::PUT, &uri, Some(&customer), Some(json!({ "rating": 4 })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Review updated successfully");
    assert_eq!(body["data"]["review"]["rating"], 4);
    assert_eq!(body["data"]["review"]["comment"], "Wobbly");
    assert_eq!(product_summary(&app, &product.id).await, (4.0, 1));

    let (status, body) = app
        .request(Method::DELETE, &uri, Some(&app.admin_token()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Review deleted successfully");
    assert!(body["data"].is_null());
    assert_eq!(product_summary(&app, &product.id).await, (0.0, 0));

    let (status, body) = app
        .request(Method::PUT, &uri, Some(&customer), Some(json!({ "rating": 5 })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Review not found");
}

#[tokio::test]
async fn unknown_products_have_no_reviews_and_full_listing_is_admin_only() {
    let app = TestApp::new().await;
    let product = app.seed_product("Rug", dec!(60), 3).await;
    app.request(
        Method::POST,
        "/api/reviews",
        Some(&app.customer_token()),
        Some(json!({ "product": product.id, "rating": 5, "comment": "Soft" })),
    )
    .await;

    let (status, body) = app
        .request(Method::GET, "/api/reviews/product/no-such-product", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reviews"], json!([]));

    let (status, _) = app
        .request(Method::GET, "/api/reviews", Some(&app.customer_token()), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(Method::GET, "/api/reviews", Some(&app.admin_token()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reviews"].as_array().unwrap().len(), 1);
}

// ==================== Categories ====================

#[tokio::test]
async fn categories_are_listed_with_product_counts() {
    let app = TestApp::new().await;
    let admin = app.admin_token();
    for (name, category) in [("Boot", "Footwear"), ("Sandal", "Footwear"), ("Scarf", "Accessories")] {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/products",
                Some(&admin),
                Some(json!({ "name": name, "price": "20", "category": category })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .request(Method::GET, "/api/products/categories", None, None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body["data"]["categories"],
        json!([
            { "name": "Accessories", "productCount": 1 },
            { "name": "Footwear", "productCount": 2 }
        ])
    );
}
