use crate::handlers::common::{created_response, success_response};
use crate::{
    entities::commerce::{BrandModel, CategoryModel, ColorModel, SizeModel},
    errors::ServiceError,
    services::commerce::{
        CreateBrandInput, CreateCategoryInput, CreateColorInput, CreateSizeInput,
        UpdateBrandInput, UpdateCategoryInput,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};

type Created<T> = Result<(StatusCode, axum::Json<ApiResponse<T>>), ServiceError>;

/// Brands available for filtering the catalog
pub async fn list_brands(State(state): State<AppState>) -> ApiResult<Vec<BrandModel>> {
    let brands = state.services.taxonomy.list_brands().await?;
    Ok(success_response(brands))
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<CategoryModel>> {
    let categories = state.services.taxonomy.list_categories().await?;
    Ok(success_response(categories))
}

pub async fn list_colors(State(state): State<AppState>) -> ApiResult<Vec<ColorModel>> {
    let colors = state.services.taxonomy.list_colors().await?;
    Ok(success_response(colors))
}

pub async fn list_sizes(State(state): State<AppState>) -> ApiResult<Vec<SizeModel>> {
    let sizes = state.services.taxonomy.list_sizes().await?;
    Ok(success_response(sizes))
}

pub async fn create_brand(
    State(state): State<AppState>,
    Json(payload): Json<CreateBrandInput>,
) -> Created<BrandModel> {
    let brand = state.services.taxonomy.create_brand(payload).await?;
    Ok(created_response(brand))
}

pub async fn update_brand(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateBrandInput>,
) -> ApiResult<BrandModel> {
    let brand = state.services.taxonomy.update_brand(id, payload).await?;
    Ok(success_response(brand))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryInput>,
) -> Created<CategoryModel> {
    let category = state.services.taxonomy.create_category(payload).await?;
    Ok(created_response(category))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCategoryInput>,
) -> ApiResult<CategoryModel> {
    let category = state.services.taxonomy.update_category(id, payload).await?;
    Ok(success_response(category))
}

pub async fn create_color(
    State(state): State<AppState>,
    Json(payload): Json<CreateColorInput>,
) -> Created<ColorModel> {
    let color = state.services.taxonomy.create_color(payload).await?;
    Ok(created_response(color))
}

pub async fn create_size(
    State(state): State<AppState>,
    Json(payload): Json<CreateSizeInput>,
) -> Created<SizeModel> {
    let size = state.services.taxonomy.create_size(payload).await?;
    Ok(created_response(size))
}
