use crate::entities::commerce::ProductModel;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// A line priced at the moment an order is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    pub product_id: i32,
    pub variant_id: Option<i32>,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl PricedLine {
    pub fn for_product(product: &ProductModel, variant_id: Option<i32>, quantity: i32) -> Self {
        Self {
            product_id: product.id,
            variant_id,
            quantity,
            unit_price: unit_price(product),
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Price charged per unit: the discount price when one is set.
pub fn unit_price(product: &ProductModel) -> Decimal {
    product.effective_price()
}

/// Money is kept to cents, halves rounded away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn subtotal(lines: &[PricedLine]) -> Decimal {
    lines.iter().map(PricedLine::line_total).sum()
}

/// Σ(unit price × quantity) + shipping, rounded to cents.
pub fn order_total(lines: &[PricedLine], shipping_cost: Decimal) -> Decimal {
    round_money(subtotal(lines) + shipping_cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn product(price: Decimal, discount_price: Option<Decimal>) -> ProductModel {
        ProductModel {
            id: 1,
            name: "Linen Shirt".into(),
            slug: "linen-shirt".into(),
            description: None,
            brand_id: 1,
            category_id: 1,
            price,
            discount_price,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn discount_price_wins_when_present() {
        assert_eq!(unit_price(&product(dec!(100.00), None)), dec!(100.00));
        assert_eq!(unit_price(&product(dec!(100.00), Some(dec!(79.90)))), dec!(79.90));
    }

    #[test]
    fn total_adds_shipping_to_line_totals() {
        let lines = vec![PricedLine::for_product(&product(dec!(100.00), None), Some(5), 3)];
        assert_eq!(order_total(&lines, dec!(29.99)), dec!(329.99));
    }

    #[test]
    fn total_is_rounded_to_cents() {
        let lines = vec![PricedLine {
            product_id: 1,
            variant_id: None,
            quantity: 3,
            unit_price: dec!(0.335),
        }];
        // 1.005 rounds half away from zero
        assert_eq!(order_total(&lines, Decimal::ZERO), dec!(1.01));
    }

    #[test]
    fn empty_lines_cost_only_shipping() {
        assert_eq!(order_total(&[], dec!(12.50)), dec!(12.50));
    }

    proptest! {
        #[test]
        fn total_matches_sum_of_parts(
            cents in proptest::collection::vec((1i64..100_000, 1i32..50), 1..8),
            shipping_cents in 0i64..10_000,
        ) {
            let lines: Vec<PricedLine> = cents
                .iter()
                .enumerate()
                .map(|(i, (price, qty))| PricedLine {
                    product_id: i as i32 + 1,
                    variant_id: None,
                    quantity: *qty,
                    unit_price: Decimal::new(*price, 2),
                })
                .collect();
            let shipping = Decimal::new(shipping_cents, 2);

            let expected_cents: i64 = cents.iter().map(|(p, q)| p * i64::from(*q)).sum::<i64>()
                + shipping_cents;
            prop_assert_eq!(order_total(&lines, shipping), Decimal::new(expected_cents, 2));
        }
    }
}
