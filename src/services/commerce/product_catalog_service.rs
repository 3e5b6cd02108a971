use crate::{
    entities::commerce::{
        payment_method, product, product_image, product_variant, shipping_option, Brand,
        Category, Color, PaymentMethod, PaymentMethodModel, Product, ProductImage,
        ProductImageModel, ProductModel, ProductVariant, ProductVariantModel, ShippingOption,
        ShippingOptionModel, Size,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::commerce::taxonomy_service::ensure_exists,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

/// Product catalog service for browsing and administering products and variants
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// List active products matching the filter, newest first
    #[instrument(skip(self))]
    pub async fn list_products(&self, filter: ProductFilter) -> Result<ProductPage, ServiceError> {
        let mut query = Product::find().filter(product::Column::IsActive.eq(true));

        if let Some(brand_id) = filter.brand_id {
            query = query.filter(product::Column::BrandId.eq(brand_id));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(min_price) = filter.min_price {
            query = query.filter(product::Column::Price.gte(min_price));
        }
        if let Some(max_price) = filter.max_price {
            query = query.filter(product::Column::Price.lte(max_price));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(product::Column::Name.contains(search));
        }

        let total = query.clone().count(&*self.db).await?;

        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = filter.offset.unwrap_or(0);

        let products = query
            .order_by_desc(product::Column::CreatedAt)
            .order_by_desc(product::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?;

        Ok(ProductPage {
            products,
            total,
            limit,
            offset,
        })
    }

    /// Get an active product with its variants and gallery images
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: i32) -> Result<ProductDetail, ServiceError> {
        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let variants = ProductVariant::find()
            .filter(product_variant::Column::ProductId.eq(product_id))
            .order_by_asc(product_variant::Column::Id)
            .all(&*self.db)
            .await?;

        let images = ProductImage::find()
            .filter(product_image::Column::ProductId.eq(product_id))
            .order_by_asc(product_image::Column::DisplayOrder)
            .order_by_asc(product_image::Column::Id)
            .all(&*self.db)
            .await?;

        Ok(ProductDetail {
            product,
            variants,
            images,
        })
    }

    /// Active shipping options, cheapest first
    #[instrument(skip(self))]
    pub async fn list_shipping_options(&self) -> Result<Vec<ShippingOptionModel>, ServiceError> {
        ShippingOption::find()
            .filter(shipping_option::Column::IsActive.eq(true))
            .order_by_asc(shipping_option::Column::BasePrice)
            .order_by_asc(shipping_option::Column::Id)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Active payment methods
    #[instrument(skip(self))]
    pub async fn list_payment_methods(&self) -> Result<Vec<PaymentMethodModel>, ServiceError> {
        PaymentMethod::find()
            .filter(payment_method::Column::IsActive.eq(true))
            .order_by_asc(payment_method::Column::Id)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Create a new product
    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        check_prices(input.price, input.discount_price)?;
        ensure_exists::<Brand, _>(&*self.db, input.brand_id, "Brand").await?;
        ensure_exists::<Category, _>(&*self.db, input.category_id, "Category").await?;

        let now = Utc::now();
        let product = product::ActiveModel {
            name: Set(input.name),
            slug: Set(input.slug),
            description: Set(input.description),
            brand_id: Set(input.brand_id),
            category_id: Set(input.category_id),
            price: Set(input.price),
            discount_price: Set(input.discount_price),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_write_error(e, "Product slug"))?;

        info!("Created product {} ({})", product.id, product.slug);
        Ok(product)
    }

    /// Partially update a product; inactive products can be updated and reactivated
    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        product_id: i32,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;

        let existing = self.find_any_product(product_id).await?;
        let price = input.price.unwrap_or(existing.price);
        let discount_price = match input.discount_price {
            Some(discount) => discount,
            None => existing.discount_price,
        };
        check_prices(price, discount_price)?;
        if let Some(brand_id) = input.brand_id {
            ensure_exists::<Brand, _>(&*self.db, brand_id, "Brand").await?;
        }
        if let Some(category_id) = input.category_id {
            ensure_exists::<Category, _>(&*self.db, category_id, "Category").await?;
        }

        let mut active: product::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(slug) = input.slug {
            active.slug = Set(slug);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(brand_id) = input.brand_id {
            active.brand_id = Set(brand_id);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.price = Set(price);
        active.discount_price = Set(discount_price);
        active.updated_at = Set(Utc::now());

        let product = active
            .update(&*self.db)
            .await
            .map_err(|e| ServiceError::from_write_error(e, "Product slug"))?;

        info!("Updated product {}", product_id);
        Ok(product)
    }

    /// Soft-delete: the product disappears from the storefront but placed
    /// orders keep referencing it.
    #[instrument(skip(self))]
    pub async fn deactivate_product(&self, product_id: i32) -> Result<ProductModel, ServiceError> {
        let existing = self.find_any_product(product_id).await?;

        let mut active: product::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let product = active.update(&*self.db).await?;

        info!("Deactivated product {}", product_id);
        Ok(product)
    }

    /// Add a color/size variant to a product
    #[instrument(skip(self))]
    pub async fn add_variant(
        &self,
        product_id: i32,
        input: CreateVariantInput,
    ) -> Result<ProductVariantModel, ServiceError> {
        input.validate()?;
        self.find_any_product(product_id).await?;
        ensure_exists::<Color, _>(&*self.db, input.color_id, "Color").await?;
        ensure_exists::<Size, _>(&*self.db, input.size_id, "Size").await?;

        let now = Utc::now();
        let variant = product_variant::ActiveModel {
            product_id: Set(product_id),
            color_id: Set(input.color_id),
            size_id: Set(input.size_id),
            sku: Set(input.sku),
            stock: Set(input.stock),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_write_error(e, "Variant SKU"))?;

        self.event_sender
            .send_or_log(Event::StockUpdated {
                variant_id: variant.id,
                old_stock: 0,
                new_stock: variant.stock,
            })
            .await;

        info!("Created variant {} for product {}", variant.id, product_id);
        Ok(variant)
    }

    /// Attach a gallery image to a product
    #[instrument(skip(self))]
    pub async fn add_image(
        &self,
        product_id: i32,
        input: CreateImageInput,
    ) -> Result<ProductImageModel, ServiceError> {
        input.validate()?;
        self.find_any_product(product_id).await?;

        let image = product_image::ActiveModel {
            product_id: Set(product_id),
            image_url: Set(input.image_url),
            alt_text: Set(input.alt_text),
            display_order: Set(input.display_order.unwrap_or(0)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!("Added image {} to product {}", image.id, product_id);
        Ok(image)
    }

    async fn find_any_product(&self, product_id: i32) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }
}

fn check_prices(price: Decimal, discount_price: Option<Decimal>) -> Result<(), ServiceError> {
    if price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Price cannot be negative".to_string(),
        ));
    }
    if let Some(discount) = discount_price {
        if discount < Decimal::ZERO || discount > price {
            return Err(ServiceError::ValidationError(
                "Discount price must be between 0 and the regular price".to_string(),
            ));
        }
    }
    Ok(())
}

/// Storefront product listing filter
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ProductFilter {
    pub brand_id: Option<i32>,
    pub category_id: Option<i32>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductPage {
    #[schema(value_type = Vec<Object>)]
    pub products: Vec<ProductModel>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub product: ProductModel,
    #[schema(value_type = Vec<Object>)]
    pub variants: Vec<ProductVariantModel>,
    #[schema(value_type = Vec<Object>)]
    pub images: Vec<ProductImageModel>,
}

/// Input for creating a product
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub slug: String,
    pub description: Option<String>,
    pub brand_id: i32,
    pub category_id: i32,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub is_active: Option<bool>,
}

/// Input for updating a product.
///
/// `discount_price: Some(None)` clears the discount; an absent field keeps it.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub brand_id: Option<i32>,
    pub category_id: Option<i32>,
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub discount_price: Option<Option<Decimal>>,
    pub is_active: Option<bool>,
}

fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Input for adding a variant
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateVariantInput {
    pub color_id: i32,
    pub size_id: i32,
    #[validate(length(min = 1, max = 100))]
    pub sku: String,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,
}

/// Input for attaching a product image
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateImageInput {
    #[validate(length(min = 1, max = 500))]
    pub image_url: String,
    #[validate(length(max = 200))]
    pub alt_text: Option<String>,
    #[validate(range(min = 0))]
    pub display_order: Option<i32>,
}
