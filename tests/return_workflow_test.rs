//! Return workflow tests: eligibility window, partial refund amounts, approval restock and
//! refund idempotency.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{decimal, ProviderCall, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use storefront_api::payments::ProviderError;

const INTENT_ID: &str = "pi_return_1";

async fn request_return(app: &TestApp, body: Value) -> (StatusCode, Value) {
    let token = app.customer_token();
    app.request(Method::POST, "/api/returns", Some(&token), Some(body))
        .await
}

async fn set_return_status(app: &TestApp, return_id: &str, body: Value) -> (StatusCode, Value) {
    let admin = app.admin_token();
    app.request(
        Method::PUT,
        &format!("/api/returns/{}/status", return_id),
        Some(&admin),
        Some(body),
    )
    .await
}

fn return_id(body: &Value) -> String {
    body["data"]["returnRequest"]["id"]
        .as_str()
        .expect("return id")
        .to_string()
}

#[tokio::test]
async fn return_window_is_enforced() {
    let app = TestApp::new().await;
    let product = app.seed_product("Jacket", dec!(120.00), 5).await;

    let inside = app.delivered_order(&[(&product, 1)]).await;
    app.set_delivered_at(&inside, Utc::now() - Duration::hours(47))
        .await;
    let (status, body) = request_return(
        &app,
        json!({ "orderId": inside, "reason": "Too small" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Return request submitted successfully");
    assert_eq!(body["data"]["returnRequest"]["status"], "Processing");

    let outside = app.delivered_order(&[(&product, 1)]).await;
    app.set_delivered_at(&outside, Utc::now() - Duration::hours(49))
        .await;
    let (status, body) = request_return(
        &app,
        json!({ "orderId": outside, "reason": "Too small" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Return period (48 hours) has expired");
}

#[tokio::test]
async fn only_delivered_orders_of_the_owner_are_returnable() {
    let app = TestApp::new().await;
    let product = app.seed_product("Boots", dec!(90.00), 5).await;

    let (_, body) = app.place_order(&[(&product, 1)]).await;
    let undelivered = body["data"]["order"]["id"].as_str().unwrap().to_string();
    let (status, body) = request_return(
        &app,
        json!({ "orderId": undelivered, "reason": "Changed my mind" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only delivered orders can be returned");

    let delivered = app.delivered_order(&[(&product, 1)]).await;
    let other = app.other_customer_token();
    let (status, body) = app
        .request(
            Method::POST,
            "/api/returns",
            Some(&other),
            Some(json!({ "orderId": delivered, "reason": "Not mine" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Unauthorized to return this order");

    let (status, _) = request_return(
        &app,
        json!({ "orderId": "ffffffffffffffffffffffff", "reason": "Missing" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn partial_return_refunds_snapshot_prices() {
    let app = TestApp::new().await;
    let shirt = app.seed_product("Shirt", dec!(25.00), 10).await;
    let hat = app.seed_product("Hat", dec!(15.50), 10).await;
    let order_id = app.delivered_order(&[(&shirt, 2), (&hat, 1)]).await;

    let (status, body) = request_return(
        &app,
        json!({
            "orderId": order_id,
            "reason": "Wrong colour",
            "items": [{ "product": shirt.id, "quantity": 1 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let created = &body["data"]["returnRequest"];
    assert_eq!(decimal(&created["totalRefundAmount"]), dec!(25.00));
    assert_eq!(created["items"].as_array().unwrap().len(), 1);
    assert_eq!(created["order"], order_id.as_str());

    let (status, body) = request_return(
        &app,
        json!({
            "orderId": order_id,
            "reason": "Too many",
            "items": [{ "product": shirt.id, "quantity": 3 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        format!("Quantity for {} exceeds order quantity", shirt.id)
    );

    let (status, body) = request_return(
        &app,
        json!({
            "orderId": order_id,
            "reason": "Unknown",
            "items": [{ "product": "ffffffffffffffffffffffff", "quantity": 1 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Item ffffffffffffffffffffffff not found in order"
    );

    let (status, body) = request_return(&app, json!({ "orderId": order_id, "reason": "All of it" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let full = &body["data"]["returnRequest"];
    assert_eq!(decimal(&full["totalRefundAmount"]), dec!(65.50));
    assert_eq!(full["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn repeated_lines_count_against_the_ordered_quantity() {
    let app = TestApp::new().await;
    let product = app.seed_product("Mug", dec!(40.00), 5).await;
    let order_id = app.delivered_order(&[(&product, 1)]).await;

    let (status, body) = request_return(
        &app,
        json!({
            "orderId": order_id,
            "reason": "Chipped",
            "items": [
                { "product": product.id, "quantity": 1 },
                { "product": product.id, "quantity": 1 }
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        format!("Quantity for {} exceeds order quantity", product.id)
    );

    let admin = app.admin_token();
    let (_, body) = app
        .request(Method::GET, "/api/returns", Some(&admin), None)
        .await;
    assert_eq!(body["data"]["returns"].as_array().unwrap().len(), 0);
    assert_eq!(app.stock_of(&product.id).await, 4);
}

#[tokio::test]
async fn approval_restocks_exactly_once() {
    let app = TestApp::new().await;
    let product = app.seed_product("Blender", dec!(60.00), 5).await;
    let order_id = app.delivered_order(&[(&product, 2)]).await;
    assert_eq!(app.stock_of(&product.id).await, 3);

    let (_, body) = request_return(&app, json!({ "orderId": order_id, "reason": "Broken" })).await;
    let id = return_id(&body);

    let (status, body) = set_return_status(&app, &id, json!({ "status": "Approved" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Return status updated successfully");
    assert_eq!(body["data"]["returnRequest"]["status"], "Approved");
    assert_eq!(app.stock_of(&product.id).await, 5);

    let (status, _) = set_return_status(&app, &id, json!({ "status": "Approved" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stock_of(&product.id).await, 5);

    let (status, _) = set_return_status(&app, &id, json!({ "status": "Returned" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stock_of(&product.id).await, 5);
}

#[tokio::test]
async fn refunding_a_return_issues_provider_refund_once() {
    let app = TestApp::new().await;
    app.activate_stripe().await;
    let shirt = app.seed_product("Polo", dec!(30.00), 10).await;
    let socks = app.seed_product("Socks", dec!(10.50), 10).await;
    let order_id = app.delivered_order(&[(&shirt, 1), (&socks, 2)]).await;
    app.set_payment_reference(&order_id, INTENT_ID).await;

    let (_, body) = request_return(
        &app,
        json!({
            "orderId": order_id,
            "reason": "Itchy",
            "items": [{ "product": socks.id, "quantity": 1 }]
        }),
    )
    .await;
    let id = return_id(&body);

    let (status, body) = set_return_status(
        &app,
        &id,
        json!({ "status": "Refunded", "adminNotes": "Approved by support" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let updated = &body["data"]["returnRequest"];
    assert_eq!(updated["status"], "Refunded");
    let notes = updated["adminNotes"].as_str().unwrap();
    assert!(notes.starts_with("Approved by support | Integrated Stripe Refund processed: re_test_"));

    assert_eq!(
        app.provider.refund_calls(),
        vec![ProviderCall::Refund {
            intent_id: INTENT_ID.to_string(),
            amount_minor: Some(1050),
        }]
    );

    let (status, _) = set_return_status(&app, &id, json!({ "status": "Refunded" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.provider.refund_calls().len(), 1);
}

#[tokio::test]
async fn provider_already_refunded_is_treated_as_success() {
    let app = TestApp::new().await;
    app.activate_stripe().await;
    let product = app.seed_product("Kettle", dec!(45.00), 5).await;
    let order_id = app.delivered_order(&[(&product, 1)]).await;
    app.set_payment_reference(&order_id, INTENT_ID).await;

    let (_, body) = request_return(&app, json!({ "orderId": order_id, "reason": "Leaks" })).await;
    let id = return_id(&body);

    app.provider.push_refund_result(Err(ProviderError::Api {
        status: 400,
        message: "Charge ch_1 has already been refunded.".to_string(),
    }));

    let (status, body) = set_return_status(&app, &id, json!({ "status": "Refunded" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["returnRequest"]["status"], "Refunded");
    assert_eq!(
        body["data"]["returnRequest"]["adminNotes"],
        "Refund verified in Stripe. | Refund verified/already partially processed in Stripe."
    );
}

#[tokio::test]
async fn other_provider_failures_abort_the_transition() {
    let app = TestApp::new().await;
    app.activate_stripe().await;
    let product = app.seed_product("Toaster", dec!(35.00), 5).await;
    let order_id = app.delivered_order(&[(&product, 1)]).await;
    app.set_payment_reference(&order_id, INTENT_ID).await;

    let (_, body) = request_return(&app, json!({ "orderId": order_id, "reason": "Burnt" })).await;
    let id = return_id(&body);

    app.provider.push_refund_result(Err(ProviderError::Api {
        status: 402,
        message: "Your card was declined.".to_string(),
    }));

    let (status, body) = set_return_status(&app, &id, json!({ "status": "Refunded" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["message"],
        "Automated refund failed: Your card was declined."
    );

    let admin = app.admin_token();
    let (_, body) = app
        .request(Method::GET, "/api/returns", Some(&admin), None)
        .await;
    assert_eq!(body["data"]["returns"][0]["status"], "Processing");
}

#[tokio::test]
async fn listings_are_scoped_by_role() {
    let app = TestApp::new().await;
    let product = app.seed_product("Scarf", dec!(20.00), 5).await;
    let order_id = app.delivered_order(&[(&product, 1)]).await;
    request_return(&app, json!({ "orderId": order_id, "reason": "Colour" })).await;

    let token = app.customer_token();
    let (status, body) = app
        .request(Method::GET, "/api/returns/my-returns", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["returns"].as_array().unwrap().len(), 1);

    let other = app.other_customer_token();
    let (_, body) = app
        .request(Method::GET, "/api/returns/my-returns", Some(&other), None)
        .await;
    assert_eq!(body["data"]["returns"].as_array().unwrap().len(), 0);

    let (status, _) = app
        .request(Method::GET, "/api/returns", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = set_return_status(
        &app,
        "0123456789abcdef01234567",
        json!({ "status": "Rejected" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Return request not found");
}
