use crate::{
    config::AppConfig,
    entities::{
        commerce::{
            cart_item, payment_method, product_variant, shipping_option, CartItem, PaymentMethod,
            Product, ProductVariant, ShippingOption,
        },
        order::{self, Entity as Order, Model as OrderModel, OrderStatus, PaymentStatus, ShippingAddress},
        order_item::{self, Entity as OrderItem, Model as OrderItemModel},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        commerce::{pricing_service, PricedLine},
        inventory,
    },
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PER_PAGE: u64 = 20;
const MAX_PER_PAGE: u64 = 100;

/// One requested order line
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderLineInput {
    pub product_id: i32,
    pub variant_id: Option<i32>,
    pub quantity: i32,
}

/// Order placed from explicit lines; the cart is left untouched
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderInput {
    pub lines: Vec<OrderLineInput>,
    pub shipping_option_id: i32,
    pub payment_method_id: i32,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
}

/// Order placed from the user's current cart
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutInput {
    pub shipping_option_id: i32,
    pub payment_method_id: i32,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderWithItems {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub order: OrderModel,
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<OrderItemModel>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderPage {
    #[schema(value_type = Vec<Object>)]
    pub orders: Vec<OrderModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Builds orders: validates the request, snapshots prices, reserves stock
/// and persists the order with its items in one transaction.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl OrderService {
    /// Creates a new order service instance
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Creates an order from explicit lines.
    #[instrument(skip(self, input), fields(lines = input.lines.len()))]
    pub async fn create_order(
        &self,
        user_id: i32,
        input: CreateOrderInput,
    ) -> Result<OrderWithItems, ServiceError> {
        if input.lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "Order must contain at least one item".to_string(),
            ));
        }
        let address = self.checked_address(input.shipping_address)?;

        let txn = self.db.begin().await?;
        let placed = self
            .place_order(
                &txn,
                user_id,
                &input.lines,
                input.shipping_option_id,
                input.payment_method_id,
                address,
                input.notes,
            )
            .await?;
        txn.commit().await?;

        self.after_placed(&placed).await;
        Ok(placed)
    }

    /// Turns the user's cart into an order and empties the cart.
    ///
    /// Cart read, order insert, stock reservation and cart clear share one
    /// transaction: either the order exists and the consumed lines are gone,
    /// or nothing changed.
    #[instrument(skip(self, input))]
    pub async fn checkout(
        &self,
        user_id: i32,
        input: CheckoutInput,
    ) -> Result<OrderWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::Id)
            .all(&txn)
            .await?;
        if cart.is_empty() {
            return Err(ServiceError::ValidationError("Cart is empty".to_string()));
        }
        let address = self.checked_address(input.shipping_address)?;

        let lines: Vec<OrderLineInput> = cart
            .iter()
            .map(|line| OrderLineInput {
                product_id: line.product_id,
                variant_id: line.variant_id,
                quantity: line.quantity,
            })
            .collect();

        let placed = self
            .place_order(
                &txn,
                user_id,
                &lines,
                input.shipping_option_id,
                input.payment_method_id,
                address,
                input.notes,
            )
            .await?;

        let consumed: Vec<i32> = cart.iter().map(|line| line.id).collect();
        let removed = CartItem::delete_many()
            .filter(cart_item::Column::Id.is_in(consumed))
            .exec(&txn)
            .await?
            .rows_affected;

        txn.commit().await?;

        self.after_placed(&placed).await;
        self.event_sender
            .send_or_log(Event::CartCleared { user_id, removed })
            .await;
        Ok(placed)
    }

    /// Order of the given user; someone else's order is `Forbidden`.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        user_id: i32,
        order_id: i32,
    ) -> Result<OrderWithItems, ServiceError> {
        let order = self.find_order(order_id).await?;
        if order.user_id != user_id {
            warn!(order_id, user_id, "order access denied");
            return Err(ServiceError::Forbidden(
                "You do not have access to this order".to_string(),
            ));
        }
        self.with_items(order).await
    }

    /// Any order, for admins.
    #[instrument(skip(self))]
    pub async fn get_order_admin(&self, order_id: i32) -> Result<OrderWithItems, ServiceError> {
        let order = self.find_order(order_id).await?;
        self.with_items(order).await
    }

    /// The user's orders, newest first
    #[instrument(skip(self))]
    pub async fn list_user_orders(
        &self,
        user_id: i32,
        page: u64,
        per_page: u64,
    ) -> Result<OrderPage, ServiceError> {
        self.list(Some(user_id), page, per_page).await
    }

    /// All orders, newest first
    #[instrument(skip(self))]
    pub async fn list_all_orders(&self, page: u64, per_page: u64) -> Result<OrderPage, ServiceError> {
        self.list(None, page, per_page).await
    }

    async fn list(
        &self,
        user_id: Option<i32>,
        page: u64,
        per_page: u64,
    ) -> Result<OrderPage, ServiceError> {
        let page = page.max(1);
        let per_page = match per_page {
            0 => DEFAULT_PER_PAGE,
            n => n.min(MAX_PER_PAGE),
        };

        let mut query = Order::find();
        if let Some(user_id) = user_id {
            query = query.filter(order::Column::UserId.eq(user_id));
        }
        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        Ok(OrderPage {
            orders,
            total,
            page,
            per_page,
        })
    }

    async fn find_order(&self, order_id: i32) -> Result<OrderModel, ServiceError> {
        Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    async fn with_items(&self, order: OrderModel) -> Result<OrderWithItems, ServiceError> {
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(OrderWithItems { order, items })
    }

    fn checked_address(&self, mut address: ShippingAddress) -> Result<ShippingAddress, ServiceError> {
        let missing = address.missing_fields();
        if !missing.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "Shipping address is missing: {}",
                missing.join(", ")
            )));
        }
        address.validate()?;
        if address.country.trim().is_empty() {
            address.country = self.config.default_country.clone();
        }
        Ok(address)
    }

    #[allow(clippy::too_many_arguments)]
    async fn place_order<C: ConnectionTrait>(
        &self,
        txn: &C,
        user_id: i32,
        lines: &[OrderLineInput],
        shipping_option_id: i32,
        payment_method_id: i32,
        address: ShippingAddress,
        notes: Option<String>,
    ) -> Result<OrderWithItems, ServiceError> {
        let shipping = ShippingOption::find_by_id(shipping_option_id)
            .filter(shipping_option::Column::IsActive.eq(true))
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Shipping option {} is not available",
                    shipping_option_id
                ))
            })?;
        PaymentMethod::find_by_id(payment_method_id)
            .filter(payment_method::Column::IsActive.eq(true))
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Payment method {} is not available",
                    payment_method_id
                ))
            })?;

        let mut priced = Vec::with_capacity(lines.len());
        for line in lines {
            priced.push(price_line(txn, line).await?);
        }
        let total_amount = pricing_service::order_total(&priced, shipping.base_price);

        let now = Utc::now();
        let order = order::ActiveModel {
            order_number: Set(generate_order_number(&self.config.order_number_prefix)),
            user_id: Set(user_id),
            status: Set(OrderStatus::Preparing),
            total_amount: Set(total_amount),
            shipping_cost: Set(shipping.base_price),
            shipping_option_id: Set(shipping.id),
            payment_method_id: Set(payment_method_id),
            payment_status: Set(PaymentStatus::Pending),
            shipping_address: Set(address),
            notes: Set(notes),
            created_at: Set(now),
            updated_at: Set(now),
            shipped_at: Set(None),
            delivered_at: Set(None),
            ..Default::default()
        }
        .insert(txn)
        .await
        .map_err(|e| ServiceError::from_write_error(e, "Order number"))?;

        let mut items = Vec::with_capacity(priced.len());
        for line in &priced {
            if let Some(variant_id) = line.variant_id {
                inventory::reserve_stock(txn, variant_id, line.quantity).await?;
            }
            let item = order_item::ActiveModel {
                order_id: Set(order.id),
                product_id: Set(line.product_id),
                variant_id: Set(line.variant_id),
                quantity: Set(line.quantity),
                price: Set(line.unit_price),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(txn)
            .await?;
            items.push(item);
        }

        Ok(OrderWithItems { order, items })
    }

    async fn after_placed(&self, placed: &OrderWithItems) {
        let order = &placed.order;
        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id: order.id,
                user_id: order.user_id,
                order_number: order.order_number.clone(),
                total_amount: order.total_amount,
            })
            .await;
        metrics::counter!("storefront_orders_created_total", 1);

        info!(
            order_id = order.id,
            order_number = %order.order_number,
            user_id = order.user_id,
            total = %order.total_amount,
            items = placed.items.len(),
            "Order created"
        );
    }
}

async fn price_line<C: ConnectionTrait>(
    conn: &C,
    line: &OrderLineInput,
) -> Result<PricedLine, ServiceError> {
    if line.quantity < 1 {
        return Err(ServiceError::ValidationError(format!(
            "Quantity for product {} must be at least 1",
            line.product_id
        )));
    }

    let product = Product::find_by_id(line.product_id)
        .one(conn)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| {
            ServiceError::ValidationError(format!("Product {} is not available", line.product_id))
        })?;

    if let Some(variant_id) = line.variant_id {
        let belongs = ProductVariant::find_by_id(variant_id)
            .filter(product_variant::Column::ProductId.eq(line.product_id))
            .one(conn)
            .await?
            .is_some();
        if !belongs {
            return Err(ServiceError::ValidationError(format!(
                "Variant {} does not belong to product {}",
                variant_id, line.product_id
            )));
        }
    }

    Ok(PricedLine::for_product(&product, line.variant_id, line.quantity))
}

/// `{prefix}-{YYYYMMDD}-{12 hex}`; uniqueness is enforced by the index.
pub fn generate_order_number(prefix: &str) -> String {
    let random = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}-{}-{}", prefix, Utc::now().format("%Y%m%d"), &random[..12])
}
