mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use common::{read_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::{
    errors::ServiceError,
    services::commerce::{
        CreateColorInput, CreateProductInput, CreateSizeInput, CreateVariantInput,
        UpdateProductInput,
    },
};

#[tokio::test]
async fn reference_lookups_are_public() {
    let app = TestApp::new().await;

    for (uri, field, expected) in [
        ("/api/v1/brands", "slug", "atelier"),
        ("/api/v1/categories", "slug", "outerwear"),
        ("/api/v1/colors", "code", "#000000"),
        ("/api/v1/sizes", "size", "M"),
    ] {
        let response = app.request(Method::GET, uri, None, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        let body = read_json(response).await;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1), "{}", uri);
        assert_eq!(body["data"][0][field], expected, "{}", uri);
    }
}

#[tokio::test]
async fn admin_creates_and_renames_brands() {
    let app = TestApp::new().await;
    let admin = app.admin_token();
    let customer = app.customer_token();
    let brand = json!({ "name": "Zephyr", "slug": "zephyr", "logo": "/logos/zephyr.png" });

    let response = app
        .request(Method::POST, "/api/v1/admin/brands", Some(brand.clone()), Some(&customer))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(Method::POST, "/api/v1/admin/brands", Some(brand.clone()), Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await["data"].clone();
    let brand_id = created["id"].as_i64().expect("brand id");

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/brands",
            Some(json!({ "name": "Zephyr Studio", "slug": "zephyr" })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/admin/brands/{}", brand_id),
            Some(json!({ "name": "Zephyr Studio" })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await["data"].clone();
    assert_eq!(updated["name"], "Zephyr Studio");
    assert_eq!(updated["slug"], "zephyr");
    assert_eq!(updated["logo"], "/logos/zephyr.png");

    let response = app
        .request(
            Method::PUT,
            "/api/v1/admin/brands/9999",
            Some(json!({ "name": "Nobody" })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.request(Method::GET, "/api/v1/brands", None, None).await;
    let body = read_json(response).await;
    let names: Vec<_> = body["data"]
        .as_array()
        .expect("brand list")
        .iter()
        .map(|b| b["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["Atelier", "Zephyr Studio"]);
}

#[tokio::test]
async fn admin_creates_and_updates_categories() {
    let app = TestApp::new().await;
    let admin = app.admin_token();

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/categories",
            Some(json!({ "name": "Knitwear", "slug": "knitwear" })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let category_id = read_json(response).await["data"]["id"]
        .as_i64()
        .expect("category id");

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/categories",
            Some(json!({ "name": "Knits", "slug": "knitwear" })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/admin/categories/{}", category_id),
            Some(json!({ "description": "Sweaters and cardigans", "icon": "yarn" })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await["data"].clone();
    assert_eq!(updated["name"], "Knitwear");
    assert_eq!(updated["description"], "Sweaters and cardigans");
    assert_eq!(updated["icon"], "yarn");
}

#[tokio::test]
async fn product_detail_lists_images_in_display_order() {
    let app = TestApp::new().await;
    let admin = app.admin_token();
    let product = app.seed_product("gallery-coat", dec!(180.00)).await;
    app.seed_variant(product.id, "GALLERY-M", 3).await;
    let images_uri = format!("/api/v1/admin/products/{}/images", product.id);

    for (url, order) in [("/img/coat-back.jpg", 2), ("/img/coat-front.jpg", 1)] {
        let response = app
            .request(
                Method::POST,
                &images_uri,
                Some(json!({ "image_url": url, "display_order": order })),
                Some(&admin),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .request(Method::GET, &format!("/api/v1/products/{}", product.id), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["slug"], "gallery-coat");
    assert_eq!(body["data"]["variants"].as_array().map(Vec::len), Some(1));
    let images = body["data"]["images"].as_array().expect("images");
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["image_url"], "/img/coat-front.jpg");
    assert_eq!(images[1]["image_url"], "/img/coat-back.jpg");

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/products/9999/images",
            Some(json!({ "image_url": "/img/none.jpg" })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn products_must_point_at_existing_reference_rows() {
    let app = TestApp::new().await;
    let catalog = &app.state.services.catalog;

    let result = catalog
        .create_product(CreateProductInput {
            name: "Orphan".to_string(),
            slug: "orphan".to_string(),
            description: None,
            brand_id: 99,
            category_id: 1,
            price: dec!(10.00),
            discount_price: None,
            is_active: None,
        })
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(msg)) if msg.contains("Brand 99"));

    let product = app.seed_product("referenced", dec!(10.00)).await;
    let result = catalog
        .update_product(
            product.id,
            UpdateProductInput {
                category_id: Some(42),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(msg)) if msg.contains("Category 42"));

    let result = catalog
        .add_variant(
            product.id,
            CreateVariantInput {
                color_id: 7,
                size_id: 1,
                sku: "REF-X".to_string(),
                stock: 1,
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(msg)) if msg.contains("Color 7"));
}

#[tokio::test]
async fn colors_and_sizes_are_validated() {
    let app = TestApp::new().await;
    let taxonomy = &app.state.services.taxonomy;

    let result = taxonomy
        .create_color(CreateColorInput {
            name: "Teal".to_string(),
            code: "teal".to_string(),
        })
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));

    let teal = taxonomy
        .create_color(CreateColorInput {
            name: "Teal".to_string(),
            code: "#008080".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(teal.code, "#008080");

    let navy = taxonomy
        .create_color(CreateColorInput {
            name: "Navy".to_string(),
            code: "#00008b".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(navy.code, "#00008B");

    let result = taxonomy
        .create_size(CreateSizeInput {
            size: "M".to_string(),
        })
        .await;
    assert_matches!(result, Err(ServiceError::Conflict(_)));

    let xl = taxonomy
        .create_size(CreateSizeInput {
            size: " XL ".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(xl.size, "XL");
}
