mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, read_json, shipping_address_json, TestApp, OTHER_CUSTOMER_ID};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn health_and_status_are_public() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["status"], "healthy");

    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn unknown_route_is_not_found_rather_than_unauthorized() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/nowhere", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_lists_only_active_products() {
    let app = TestApp::new().await;
    let visible = app.seed_product("visible", dec!(10.00)).await;
    let hidden = app.seed_product("hidden", dec!(10.00)).await;
    app.state
        .services
        .catalog
        .deactivate_product(hidden.id)
        .await
        .unwrap();

    let response = app
        .request(Method::GET, "/api/v1/products?limit=10", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["products"][0]["id"], visible.id);

    let response = app
        .request(Method::GET, &format!("/api/v1/products/{}", hidden.id), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cart_requires_a_valid_token() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/cart", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn checkout_over_http_end_to_end() {
    let app = TestApp::new().await;
    let product = app.seed_product("http-shirt", dec!(100.00)).await;
    let variant = app.seed_variant(product.id, "HTTP-M", 10).await;
    let shipping = app.seed_shipping_option(dec!(29.99)).await;
    let payment = app.seed_payment_method().await;
    let customer = app.customer_token();

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({
                "product_id": product.id,
                "variant_id": variant.id,
                "quantity": 3
            })),
            Some(&customer),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["quantity"], 3);

    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&customer))
        .await;
    let body = read_json(response).await;
    assert_eq!(decimal(&body["data"]["subtotal"]), dec!(300.00));

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({
                "shipping_option_id": shipping.id,
                "payment_method_id": payment.id,
                "shipping_address": shipping_address_json()
            })),
            Some(&customer),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    let order = &body["data"];
    assert_eq!(order["status"], "preparing");
    assert_eq!(order["payment_status"], "pending");
    assert_eq!(decimal(&order["total_amount"]), dec!(329.99));
    assert_eq!(order["shipping_address"]["postalCode"], "34710");
    assert_eq!(order["items"].as_array().map(Vec::len), Some(1));
    let order_id = order["id"].as_i64().expect("order id");

    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&customer))
        .await;
    let body = read_json(response).await;
    assert_eq!(body["data"]["item_count"], 0);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            None,
            Some(&customer),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stranger = app.token_for(OTHER_CUSTOMER_ID, &["customer"]);
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            None,
            Some(&stranger),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn checkout_of_empty_cart_is_bad_request() {
    let app = TestApp::new().await;
    let shipping = app.seed_shipping_option(dec!(5.00)).await;
    let payment = app.seed_payment_method().await;
    let customer = app.customer_token();

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({
                "shipping_option_id": shipping.id,
                "payment_method_id": payment.id,
                "shipping_address": shipping_address_json()
            })),
            Some(&customer),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["message"], "Validation error: Cart is empty");
}

#[tokio::test]
async fn adding_beyond_stock_is_unprocessable() {
    let app = TestApp::new().await;
    let product = app.seed_product("limited", dec!(9.00)).await;
    let variant = app.seed_variant(product.id, "LIMITED-1", 1).await;
    let customer = app.customer_token();

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({
                "product_id": product.id,
                "variant_id": variant.id,
                "quantity": 2
            })),
            Some(&customer),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn admin_routes_require_the_admin_role() {
    let app = TestApp::new().await;
    let product = app.seed_product("admin-item", dec!(20.00)).await;
    let shipping = app.seed_shipping_option(dec!(0.00)).await;
    let payment = app.seed_payment_method().await;
    let customer = app.customer_token();
    let admin = app.admin_token();

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "lines": [{ "product_id": product.id, "quantity": 1 }],
                "shipping_option_id": shipping.id,
                "payment_method_id": payment.id,
                "shipping_address": shipping_address_json()
            })),
            Some(&customer),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order_id = read_json(response).await["data"]["id"]
        .as_i64()
        .expect("order id");
    let status_uri = format!("/api/v1/admin/orders/{}/status", order_id);

    let response = app
        .request(Method::PUT, &status_uri, Some(json!({ "status": "shipped" })), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::PUT,
            &status_uri,
            Some(json!({ "status": "shipped" })),
            Some(&customer),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::PUT,
            &status_uri,
            Some(json!({ "status": "shipped" })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["status"], "shipped");

    let response = app
        .request(
            Method::PUT,
            &status_uri,
            Some(json!({ "status": "preparing" })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(Method::GET, "/api/v1/notifications", None, Some(&customer))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["type"], "order");

    let response = app
        .request(
            Method::GET,
            "/api/v1/notifications/unread-count",
            None,
            Some(&customer),
        )
        .await;
    assert_eq!(read_json(response).await["data"]["count"], 1);
}

#[tokio::test]
async fn duplicate_product_slug_conflicts() {
    let app = TestApp::new().await;
    let admin = app.admin_token();
    let product = json!({
        "name": "Canvas Tote",
        "slug": "canvas-tote",
        "brand_id": 1,
        "category_id": 1,
        "price": "24.00"
    });

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/products",
            Some(product.clone()),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request(Method::POST, "/api/v1/admin/products", Some(product), Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert!(body["paths"]["/api/v1/checkout"].is_object());
}
