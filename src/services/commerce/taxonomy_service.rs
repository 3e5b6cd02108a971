use crate::{
    entities::commerce::{
        brand, category, color, size, Brand, BrandModel, Category, CategoryModel, Color,
        ColorModel, Size, SizeModel,
    },
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PrimaryKeyTrait,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

/// Brands, categories, colors and sizes the catalog refers to
#[derive(Clone)]
pub struct TaxonomyService {
    db: Arc<DatabaseConnection>,
}

impl TaxonomyService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_brands(&self) -> Result<Vec<BrandModel>, ServiceError> {
        Ok(Brand::find()
            .order_by_asc(brand::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        Ok(Category::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list_colors(&self) -> Result<Vec<ColorModel>, ServiceError> {
        Ok(Color::find()
            .order_by_asc(color::Column::Id)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list_sizes(&self) -> Result<Vec<SizeModel>, ServiceError> {
        Ok(Size::find()
            .order_by_asc(size::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Create a brand; name and slug are both unique
    #[instrument(skip(self))]
    pub async fn create_brand(&self, input: CreateBrandInput) -> Result<BrandModel, ServiceError> {
        input.validate()?;

        let now = Utc::now();
        let brand = brand::ActiveModel {
            name: Set(input.name),
            slug: Set(input.slug),
            description: Set(input.description),
            logo: Set(input.logo),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_write_error(e, "Brand name or slug"))?;

        info!("Created brand {} ({})", brand.id, brand.slug);
        Ok(brand)
    }

    /// Partially update a brand. The slug is fixed once created.
    #[instrument(skip(self))]
    pub async fn update_brand(
        &self,
        brand_id: i32,
        input: UpdateBrandInput,
    ) -> Result<BrandModel, ServiceError> {
        input.validate()?;

        let existing = Brand::find_by_id(brand_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Brand {} not found", brand_id)))?;

        let mut active: brand::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(logo) = input.logo {
            active.logo = Set(Some(logo));
        }
        active.updated_at = Set(Utc::now());

        let brand = active
            .update(&*self.db)
            .await
            .map_err(|e| ServiceError::from_write_error(e, "Brand name"))?;

        info!("Updated brand {}", brand_id);
        Ok(brand)
    }

    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        input.validate()?;

        let now = Utc::now();
        let category = category::ActiveModel {
            name: Set(input.name),
            slug: Set(input.slug),
            description: Set(input.description),
            icon: Set(input.icon),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_write_error(e, "Category slug"))?;

        info!("Created category {} ({})", category.id, category.slug);
        Ok(category)
    }

    /// Partially update a category. The slug is fixed once created.
    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        category_id: i32,
        input: UpdateCategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        input.validate()?;

        let existing = Category::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Category {} not found", category_id))
            })?;

        let mut active: category::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(icon) = input.icon {
            active.icon = Set(Some(icon));
        }
        active.updated_at = Set(Utc::now());
        let category = active.update(&*self.db).await?;

        info!("Updated category {}", category_id);
        Ok(category)
    }

    #[instrument(skip(self))]
    pub async fn create_color(&self, input: CreateColorInput) -> Result<ColorModel, ServiceError> {
        input.validate()?;
        if !is_hex_color(&input.code) {
            return Err(ServiceError::ValidationError(format!(
                "Color code {} must look like #1A2B3C",
                input.code
            )));
        }

        let color = color::ActiveModel {
            name: Set(input.name),
            code: Set(input.code.to_ascii_uppercase()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!("Created color {} ({})", color.id, color.code);
        Ok(color)
    }

    #[instrument(skip(self))]
    pub async fn create_size(&self, input: CreateSizeInput) -> Result<SizeModel, ServiceError> {
        input.validate()?;

        let size = size::ActiveModel {
            size: Set(input.size.trim().to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_write_error(e, "Size"))?;

        info!("Created size {} ({})", size.id, size.size);
        Ok(size)
    }
}

/// Fails with `ValidationError` unless a row of `E` with `id` exists.
pub(crate) async fn ensure_exists<E, C>(
    conn: &C,
    id: i32,
    label: &str,
) -> Result<(), ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
    i32: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
{
    if E::find_by_id(id).one(conn).await?.is_none() {
        return Err(ServiceError::ValidationError(format!(
            "{} {} does not exist",
            label, id
        )));
    }
    Ok(())
}

fn is_hex_color(code: &str) -> bool {
    code.len() == 7
        && code.starts_with('#')
        && code[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateBrandInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub slug: String,
    pub description: Option<String>,
    #[validate(length(max = 500))]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateBrandInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 500))]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub slug: String,
    pub description: Option<String>,
    #[validate(length(max = 500))]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 500))]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateColorInput {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateSizeInput {
    #[validate(length(min = 1, max = 10))]
    pub size: String,
}
