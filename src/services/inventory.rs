//! Variant stock: levels, admin adjustments, and the reserve/release pair
//! used by order placement and cancellation.

use crate::{
    config::AppConfig,
    entities::commerce::{product_variant, ProductVariant, ProductVariantModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

/// Coarse stock level shown to admins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    OutOfStock,
    Low,
    InStock,
}

impl StockLevel {
    pub fn classify(stock: i32, low_stock_threshold: i32) -> Self {
        if stock <= 0 {
            StockLevel::OutOfStock
        } else if stock < low_stock_threshold {
            StockLevel::Low
        } else {
            StockLevel::InStock
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VariantStock {
    pub variant_id: i32,
    pub product_id: i32,
    pub sku: String,
    pub stock: i32,
    pub level: StockLevel,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct StockOverview {
    pub variants: Vec<VariantStock>,
    pub in_stock: usize,
    pub low: usize,
    pub out_of_stock: usize,
}

#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    low_stock_threshold: i32,
}

impl InventoryService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            low_stock_threshold: config.low_stock_threshold,
        }
    }

    /// Sets a variant's stock to an absolute value.
    #[instrument(skip(self))]
    pub async fn update_variant_stock(
        &self,
        variant_id: i32,
        stock: i32,
    ) -> Result<VariantStock, ServiceError> {
        if stock < 0 {
            return Err(ServiceError::ValidationError(
                "Stock cannot be negative".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let variant = ProductVariant::find_by_id(variant_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))?;
        let old_stock = variant.stock;

        let mut active: product_variant::ActiveModel = variant.into();
        active.stock = Set(stock);
        active.updated_at = Set(Utc::now());
        let variant = active.update(&txn).await?;
        txn.commit().await?;

        let view = self.view(variant);

        self.event_sender
            .send_or_log(Event::StockUpdated {
                variant_id,
                old_stock,
                new_stock: stock,
            })
            .await;
        if view.level != StockLevel::InStock {
            warn!(variant_id, stock, "variant stock below threshold");
            self.event_sender
                .send_or_log(Event::LowStock { variant_id, stock })
                .await;
        }

        info!("Variant {} stock set from {} to {}", variant_id, old_stock, stock);
        Ok(view)
    }

    /// Every variant with its level, plus counts per level.
    #[instrument(skip(self))]
    pub async fn stock_overview(&self) -> Result<StockOverview, ServiceError> {
        let variants = ProductVariant::find()
            .order_by_asc(product_variant::Column::Stock)
            .order_by_asc(product_variant::Column::Id)
            .all(&*self.db)
            .await?;

        let mut overview = StockOverview::default();
        for variant in variants {
            let view = self.view(variant);
            match view.level {
                StockLevel::InStock => overview.in_stock += 1,
                StockLevel::Low => overview.low += 1,
                StockLevel::OutOfStock => overview.out_of_stock += 1,
            }
            overview.variants.push(view);
        }

        metrics::gauge!("storefront_variants_low_stock", overview.low as f64);
        metrics::gauge!("storefront_variants_out_of_stock", overview.out_of_stock as f64);
        Ok(overview)
    }

    fn view(&self, variant: ProductVariantModel) -> VariantStock {
        VariantStock {
            variant_id: variant.id,
            product_id: variant.product_id,
            level: StockLevel::classify(variant.stock, self.low_stock_threshold),
            sku: variant.sku,
            stock: variant.stock,
        }
    }
}

/// Takes `quantity` units from a variant if at least that many are left.
///
/// The decrement is conditional on `stock >= quantity` in a single UPDATE, so
/// two orders racing for the last unit cannot both succeed.
pub async fn reserve_stock<C: ConnectionTrait>(
    conn: &C,
    variant_id: i32,
    quantity: i32,
) -> Result<(), ServiceError> {
    let result = ProductVariant::update_many()
        .col_expr(
            product_variant::Column::Stock,
            Expr::col(product_variant::Column::Stock).sub(quantity),
        )
        .col_expr(product_variant::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product_variant::Column::Id.eq(variant_id))
        .filter(product_variant::Column::Stock.gte(quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::OutOfStock(format!(
            "Variant {} does not have {} units in stock",
            variant_id, quantity
        )));
    }
    Ok(())
}

/// Returns previously reserved units to a variant.
pub async fn release_stock<C: ConnectionTrait>(
    conn: &C,
    variant_id: i32,
    quantity: i32,
) -> Result<(), ServiceError> {
    ProductVariant::update_many()
        .col_expr(
            product_variant::Column::Stock,
            Expr::col(product_variant::Column::Stock).add(quantity),
        )
        .col_expr(product_variant::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product_variant::Column::Id.eq(variant_id))
        .exec(conn)
        .await?;
    Ok(())
}
