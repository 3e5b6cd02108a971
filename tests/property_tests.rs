mod common;

use common::{TestApp, CUSTOMER_ID};
use proptest::prelude::*;
use rust_decimal_macros::dec;
use storefront_api::{
    entities::order::OrderStatus,
    services::{commerce::AddToCartInput, order_status::is_valid_transition},
};

fn any_status() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Preparing),
        Just(OrderStatus::Shipped),
        Just(OrderStatus::Delivered),
        Just(OrderStatus::Cancelled),
    ]
}

proptest! {
    #[test]
    fn terminal_statuses_have_no_exits(from in any_status(), to in any_status()) {
        if from.is_terminal() {
            prop_assert!(!is_valid_transition(from, to));
        }
    }

    #[test]
    fn no_status_transitions_to_itself(status in any_status()) {
        prop_assert!(!is_valid_transition(status, status));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Repeated adds of one product/variant always collapse into a single
    /// line holding the sum of the quantities.
    #[test]
    fn repeated_adds_collapse_into_one_line(quantities in prop::collection::vec(1i32..5, 1..6)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");

        let (lines, quantity) = rt.block_on(async {
            let app = TestApp::new().await;
            let product = app.seed_product("prop-item", dec!(1.00)).await;
            let variant = app.seed_variant(product.id, "PROP-1", 100).await;

            for quantity in &quantities {
                app.state
                    .services
                    .cart
                    .add_item(
                        CUSTOMER_ID,
                        AddToCartInput {
                            product_id: product.id,
                            variant_id: Some(variant.id),
                            quantity: *quantity,
                        },
                    )
                    .await
                    .expect("add to cart");
            }

            let items = app
                .state
                .services
                .cart
                .get_items(CUSTOMER_ID)
                .await
                .expect("cart items");
            (items.len(), items.first().map(|i| i.quantity))
        });

        prop_assert_eq!(lines, 1);
        prop_assert_eq!(quantity, Some(quantities.iter().sum::<i32>()));
    }
}
