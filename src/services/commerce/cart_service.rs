use crate::{
    entities::commerce::{
        cart_item, CartItem, CartItemModel, Product, ProductVariant, ProductVariantModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::commerce::pricing_service,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Per-user shopping cart.
///
/// A cart is the set of the user's `cart_items` rows; there is no separate
/// cart header. Each (product, variant) pair appears at most once and
/// re-adding it merges quantities.
///
/// # Examples
///
/// ```ignore
/// use storefront_api::services::commerce::{AddToCartInput, CartService};
///
/// let cart_service = CartService::new(db, event_sender);
///
/// cart_service
///     .add_item(user_id, AddToCartInput { product_id: 1, variant_id: Some(5), quantity: 2 })
///     .await?;
/// let line = cart_service
///     .add_item(user_id, AddToCartInput { product_id: 1, variant_id: Some(5), quantity: 1 })
///     .await?;
/// assert_eq!(line.quantity, 3);
/// ```
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// Input for adding a product (and optional variant) to the cart
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct AddToCartInput {
    pub product_id: i32,
    pub variant_id: Option<i32>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// One cart line priced with the product's current price
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartLineView {
    pub id: i32,
    pub product_id: i32,
    pub product_name: Option<String>,
    pub variant_id: Option<i32>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// The user's cart with display totals
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: i32,
    pub subtotal: Decimal,
}

impl CartService {
    /// Creates a new `CartService` instance.
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Adds a product to the user's cart, merging with an existing line.
    ///
    /// The merge is a single `INSERT .. ON CONFLICT DO UPDATE SET quantity =
    /// quantity + n` against the (user, product, variant) unique index, so
    /// concurrent adds of the same line never lose an increment.
    ///
    /// # Returns
    ///
    /// * `Ok(CartItemModel)` - The line after the merge
    /// * `Err(ServiceError::ValidationError)` - Quantity below 1, or the variant belongs to another product
    /// * `Err(ServiceError::NotFound)` - Product or variant missing or inactive
    /// * `Err(ServiceError::OutOfStock)` - Resulting quantity exceeds variant stock; nothing is persisted
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: i32,
        input: AddToCartInput,
    ) -> Result<CartItemModel, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        Product::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        let variant = match input.variant_id {
            Some(variant_id) => Some(load_variant_of(&txn, input.product_id, variant_id).await?),
            None => None,
        };

        let now = Utc::now();
        let key = cart_item::variant_key(input.variant_id);
        let line = cart_item::ActiveModel {
            user_id: Set(user_id),
            product_id: Set(input.product_id),
            variant_id: Set(input.variant_id),
            variant_key: Set(key),
            quantity: Set(input.quantity),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        CartItem::insert(line)
            .on_conflict(
                OnConflict::columns([
                    cart_item::Column::UserId,
                    cart_item::Column::ProductId,
                    cart_item::Column::VariantKey,
                ])
                .value(
                    cart_item::Column::Quantity,
                    Expr::col((cart_item::Entity, cart_item::Column::Quantity)).add(input.quantity),
                )
                .update_column(cart_item::Column::UpdatedAt)
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        let line = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .filter(cart_item::Column::VariantKey.eq(key))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::InternalError("Cart line vanished after upsert".into()))?;

        if let Some(variant) = &variant {
            if line.quantity > variant.stock {
                txn.rollback().await?;
                warn!(
                    user_id,
                    variant_id = variant.id,
                    requested = line.quantity,
                    stock = variant.stock,
                    "add to cart rejected: insufficient stock"
                );
                return Err(out_of_stock(variant, line.quantity));
            }
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                user_id,
                cart_item_id: line.id,
                product_id: line.product_id,
                variant_id: line.variant_id,
                quantity: input.quantity,
            })
            .await;
        metrics::counter!("storefront_cart_items_added_total", 1);

        info!(
            "Added product {} (variant {:?}) x{} to cart of user {}; line quantity now {}",
            line.product_id, line.variant_id, input.quantity, user_id, line.quantity
        );
        Ok(line)
    }

    /// Sets the quantity of one of the user's cart lines.
    ///
    /// A quantity of 0 deletes the line and returns `Ok(None)`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(CartItemModel))` - Updated line
    /// * `Ok(None)` - Line removed
    /// * `Err(ServiceError::Forbidden)` - Line missing or owned by another user
    /// * `Err(ServiceError::NotFound)` - The line's variant no longer exists
    /// * `Err(ServiceError::ValidationError)` - Negative quantity
    /// * `Err(ServiceError::OutOfStock)` - Quantity exceeds variant stock
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: i32,
        cart_item_id: i32,
        quantity: i32,
    ) -> Result<Option<CartItemModel>, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Quantity cannot be negative".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let line = find_owned_line(&txn, user_id, cart_item_id).await?;

        if quantity == 0 {
            line.delete(&txn).await?;
            txn.commit().await?;

            self.event_sender
                .send_or_log(Event::CartItemRemoved {
                    user_id,
                    cart_item_id,
                })
                .await;
            info!("Removed cart line {} of user {} (quantity 0)", cart_item_id, user_id);
            return Ok(None);
        }

        if let Some(variant_id) = line.variant_id {
            let variant = load_variant_of(&txn, line.product_id, variant_id).await?;
            if quantity > variant.stock {
                txn.rollback().await?;
                return Err(out_of_stock(&variant, quantity));
            }
        }

        let mut item: cart_item::ActiveModel = line.into();
        item.quantity = Set(quantity);
        item.updated_at = Set(Utc::now());
        let updated = item.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                user_id,
                cart_item_id,
                quantity,
            })
            .await;

        Ok(Some(updated))
    }

    /// Deletes one of the user's cart lines.
    ///
    /// Fails with `Forbidden` when the line is missing or owned by someone else.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: i32, cart_item_id: i32) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let line = find_owned_line(&txn, user_id, cart_item_id).await?;
        line.delete(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                user_id,
                cart_item_id,
            })
            .await;

        info!("Removed cart line {} of user {}", cart_item_id, user_id);
        Ok(())
    }

    /// Deletes every line of the user's cart; returns how many were removed.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: i32) -> Result<u64, ServiceError> {
        let removed = clear_lines(&*self.db, user_id).await?;

        if removed > 0 {
            self.event_sender
                .send_or_log(Event::CartCleared { user_id, removed })
                .await;
        }

        info!("Cleared {} cart lines of user {}", removed, user_id);
        Ok(removed)
    }

    /// Returns the user's cart lines ordered by id.
    #[instrument(skip(self))]
    pub async fn get_items(&self, user_id: i32) -> Result<Vec<CartItemModel>, ServiceError> {
        let items = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(items)
    }

    /// Returns the cart priced with current product prices.
    ///
    /// Lines whose product has been removed are listed at zero so the
    /// customer can still see and delete them.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: i32) -> Result<CartView, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::Id)
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        let items: Vec<CartLineView> = rows
            .into_iter()
            .map(|(line, product)| {
                let unit_price = product
                    .as_ref()
                    .map(pricing_service::unit_price)
                    .unwrap_or(Decimal::ZERO);
                CartLineView {
                    id: line.id,
                    product_id: line.product_id,
                    product_name: product.map(|p| p.name),
                    variant_id: line.variant_id,
                    quantity: line.quantity,
                    unit_price,
                    line_total: unit_price * Decimal::from(line.quantity),
                }
            })
            .collect();

        let subtotal = pricing_service::round_money(items.iter().map(|i| i.line_total).sum());
        let item_count = items.iter().map(|i| i.quantity).sum();

        Ok(CartView {
            items,
            item_count,
            subtotal,
        })
    }
}

/// Loads a line for mutation by its owner.
///
/// Missing lines are reported as `Forbidden` too so ids of other users'
/// lines cannot be discovered.
async fn find_owned_line<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    cart_item_id: i32,
) -> Result<CartItemModel, ServiceError> {
    CartItem::find_by_id(cart_item_id)
        .one(conn)
        .await?
        .filter(|line| line.user_id == user_id)
        .ok_or_else(|| {
            ServiceError::Forbidden(format!(
                "Cart line {} does not belong to the current user",
                cart_item_id
            ))
        })
}

/// Loads a variant and checks it belongs to `product_id`.
pub(crate) async fn load_variant_of<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    variant_id: i32,
) -> Result<ProductVariantModel, ServiceError> {
    let variant = ProductVariant::find_by_id(variant_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))?;

    if variant.product_id != product_id {
        return Err(ServiceError::ValidationError(format!(
            "Variant {} does not belong to product {}",
            variant_id, product_id
        )));
    }
    Ok(variant)
}

/// Deletes all of a user's cart lines on the given connection.
pub(crate) async fn clear_lines<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<u64, ServiceError> {
    let result = CartItem::delete_many()
        .filter(cart_item::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

fn out_of_stock(variant: &ProductVariantModel, requested: i32) -> ServiceError {
    ServiceError::OutOfStock(format!(
        "Variant {} has {} in stock, {} requested",
        variant.sku, variant.stock, requested
    ))
}
