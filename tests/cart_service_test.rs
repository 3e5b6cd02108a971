mod common;

use assert_matches::assert_matches;
use common::{TestApp, CUSTOMER_ID, OTHER_CUSTOMER_ID};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use storefront_api::{
    entities::commerce::ProductVariant, errors::ServiceError, events::Event,
    services::commerce::AddToCartInput,
};
use tempfile::TempDir;
use tokio::task::JoinSet;

fn add(product_id: i32, variant_id: Option<i32>, quantity: i32) -> AddToCartInput {
    AddToCartInput {
        product_id,
        variant_id,
        quantity,
    }
}

#[tokio::test]
async fn adding_the_same_product_and_variant_merges_quantities() {
    let app = TestApp::new().await;
    let product = app.seed_product("merge-shirt", dec!(100.00)).await;
    let variant = app.seed_variant(product.id, "MERGE-M", 10).await;
    let cart = &app.state.services.cart;

    let first = cart
        .add_item(CUSTOMER_ID, add(product.id, Some(variant.id), 2))
        .await
        .unwrap();
    let second = cart
        .add_item(CUSTOMER_ID, add(product.id, Some(variant.id), 1))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.quantity, 3);

    let items = cart.get_items(CUSTOMER_ID).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 3);
}

#[tokio::test]
async fn lines_without_variant_merge_separately_from_variant_lines() {
    let app = TestApp::new().await;
    let product = app.seed_product("plain-mug", dec!(12.50)).await;
    let variant = app.seed_variant(product.id, "MUG-RED", 5).await;
    let cart = &app.state.services.cart;

    cart.add_item(CUSTOMER_ID, add(product.id, None, 1)).await.unwrap();
    cart.add_item(CUSTOMER_ID, add(product.id, None, 2)).await.unwrap();
    cart.add_item(CUSTOMER_ID, add(product.id, Some(variant.id), 1))
        .await
        .unwrap();

    let items = cart.get_items(CUSTOMER_ID).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].variant_id, None);
    assert_eq!(items[0].quantity, 3);
    assert_eq!(items[1].variant_id, Some(variant.id));
}

#[tokio::test]
async fn merge_beyond_stock_is_rejected_and_line_is_unchanged() {
    let app = TestApp::new().await;
    let product = app.seed_product("scarce", dec!(40.00)).await;
    let variant = app.seed_variant(product.id, "SCARCE-1", 3).await;
    let cart = &app.state.services.cart;

    cart.add_item(CUSTOMER_ID, add(product.id, Some(variant.id), 2))
        .await
        .unwrap();
    let err = cart
        .add_item(CUSTOMER_ID, add(product.id, Some(variant.id), 2))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::OutOfStock(_));

    let items = cart.get_items(CUSTOMER_ID).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 2);
}

#[tokio::test]
async fn first_add_beyond_stock_creates_no_line() {
    let app = TestApp::new().await;
    let product = app.seed_product("sold-out", dec!(15.00)).await;
    let variant = app.seed_variant(product.id, "SOLD-OUT", 0).await;

    let err = app
        .state
        .services
        .cart
        .add_item(CUSTOMER_ID, add(product.id, Some(variant.id), 1))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::OutOfStock(_));
    assert!(app.state.services.cart.get_items(CUSTOMER_ID).await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_quantity_and_unknown_product_are_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("valid", dec!(10.00)).await;
    let cart = &app.state.services.cart;

    assert_matches!(
        cart.add_item(CUSTOMER_ID, add(product.id, None, 0)).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        cart.add_item(CUSTOMER_ID, add(9_999, None, 1)).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn variant_of_another_product_is_rejected() {
    let app = TestApp::new().await;
    let shirt = app.seed_product("shirt", dec!(20.00)).await;
    let hat = app.seed_product("hat", dec!(8.00)).await;
    let hat_variant = app.seed_variant(hat.id, "HAT-L", 4).await;

    let err = app
        .state
        .services
        .cart
        .add_item(CUSTOMER_ID, add(shirt.id, Some(hat_variant.id), 1))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn other_users_lines_are_forbidden() {
    let app = TestApp::new().await;
    let product = app.seed_product("private", dec!(5.00)).await;
    let cart = &app.state.services.cart;

    let line = cart
        .add_item(CUSTOMER_ID, add(product.id, None, 1))
        .await
        .unwrap();

    assert_matches!(
        cart.update_item(OTHER_CUSTOMER_ID, line.id, 4).await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        cart.remove_item(OTHER_CUSTOMER_ID, line.id).await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        cart.remove_item(CUSTOMER_ID, line.id + 100).await,
        Err(ServiceError::Forbidden(_))
    );

    let items = cart.get_items(CUSTOMER_ID).await.unwrap();
    assert_eq!(items[0].quantity, 1);
}

#[tokio::test]
async fn update_to_zero_removes_the_line() {
    let app = TestApp::new().await;
    let product = app.seed_product("ephemeral", dec!(5.00)).await;
    let cart = &app.state.services.cart;

    let line = cart
        .add_item(CUSTOMER_ID, add(product.id, None, 2))
        .await
        .unwrap();

    let updated = cart.update_item(CUSTOMER_ID, line.id, 5).await.unwrap();
    assert_eq!(updated.map(|l| l.quantity), Some(5));

    assert!(cart.update_item(CUSTOMER_ID, line.id, 0).await.unwrap().is_none());
    assert!(cart.get_items(CUSTOMER_ID).await.unwrap().is_empty());

    assert_matches!(
        cart.update_item(CUSTOMER_ID, line.id, -1).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn cart_view_prices_lines_with_discounts() {
    let app = TestApp::new().await;
    let full = app.seed_product("full-price", dec!(100.00)).await;
    let discounted = app
        .seed_product_with_discount("on-sale", dec!(50.00), Some(dec!(39.90)))
        .await;
    let cart = &app.state.services.cart;

    cart.add_item(CUSTOMER_ID, add(full.id, None, 2)).await.unwrap();
    cart.add_item(CUSTOMER_ID, add(discounted.id, None, 1))
        .await
        .unwrap();

    let view = cart.get_cart(CUSTOMER_ID).await.unwrap();
    assert_eq!(view.items.len(), 2);
    assert_eq!(view.item_count, 3);
    assert_eq!(view.items[1].unit_price, dec!(39.90));
    assert_eq!(view.subtotal, dec!(239.90));
}

#[tokio::test]
async fn clear_removes_only_the_callers_lines() {
    let app = TestApp::new().await;
    let product = app.seed_product("shared", dec!(3.00)).await;
    let cart = &app.state.services.cart;

    cart.add_item(CUSTOMER_ID, add(product.id, None, 1)).await.unwrap();
    cart.add_item(OTHER_CUSTOMER_ID, add(product.id, None, 1))
        .await
        .unwrap();
    app.take_events().await;

    assert_eq!(cart.clear(CUSTOMER_ID).await.unwrap(), 1);
    assert!(cart.get_items(CUSTOMER_ID).await.unwrap().is_empty());
    assert_eq!(cart.get_items(OTHER_CUSTOMER_ID).await.unwrap().len(), 1);

    let events = app.take_events().await;
    assert_eq!(
        events,
        vec![Event::CartCleared {
            user_id: CUSTOMER_ID,
            removed: 1
        }]
    );
}

#[tokio::test]
async fn update_of_line_whose_variant_is_gone_is_not_found() {
    let app = TestApp::new().await;
    let product = app.seed_product("retired", dec!(30.00)).await;
    let variant = app.seed_variant(product.id, "RETIRED-1", 10).await;
    let cart = &app.state.services.cart;

    let line = cart
        .add_item(CUSTOMER_ID, add(product.id, Some(variant.id), 1))
        .await
        .unwrap();
    ProductVariant::delete_by_id(variant.id)
        .exec(&*app.state.db)
        .await
        .unwrap();

    assert_matches!(
        cart.update_item(CUSTOMER_ID, line.id, 3).await,
        Err(ServiceError::NotFound(_))
    );
    assert_eq!(cart.get_items(CUSTOMER_ID).await.unwrap()[0].quantity, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_to_one_line_keep_every_acknowledged_increment() {
    let dir = TempDir::new().expect("temp dir");
    let app = TestApp::file_backed(&dir).await;
    let product = app.seed_product("busy-line", dec!(10.00)).await;
    let variant = app.seed_variant(product.id, "BUSY-1", 1_000).await;

    let mut tasks = JoinSet::new();
    for quantity in 1..=6 {
        let cart = app.state.services.cart.clone();
        let input = add(product.id, Some(variant.id), quantity);
        tasks.spawn(async move { (quantity, cart.add_item(CUSTOMER_ID, input).await) });
    }

    // An add may fail on a locked database, but one that succeeded must show up.
    let mut acknowledged = 0;
    while let Some(joined) = tasks.join_next().await {
        let (quantity, result) = joined.expect("add task panicked");
        if result.is_ok() {
            acknowledged += quantity;
        }
    }
    assert!(acknowledged > 0);

    let items = app.state.services.cart.get_items(CUSTOMER_ID).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, acknowledged);
}
