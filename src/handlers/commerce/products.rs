use crate::handlers::common::{created_response, success_response};
use crate::{
    entities::commerce::{
        PaymentMethodModel, ProductImageModel, ProductModel, ProductVariantModel,
        ShippingOptionModel,
    },
    errors::ServiceError,
    services::commerce::{
        CreateImageInput, CreateProductInput, CreateVariantInput, ProductDetail, ProductFilter,
        ProductPage, UpdateProductInput,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};

/// Browse active products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductFilter),
    responses((status = 200, description = "Products", body = ApiResponse<ProductPage>)),
    tag = "catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<ProductPage> {
    let page = state.services.catalog.list_products(filter).await?;
    Ok(success_response(page))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<ProductDetail> {
    let product = state.services.catalog.get_product(id).await?;
    Ok(success_response(product))
}

pub async fn list_shipping_options(
    State(state): State<AppState>,
) -> ApiResult<Vec<ShippingOptionModel>> {
    let options = state.services.catalog.list_shipping_options().await?;
    Ok(success_response(options))
}

pub async fn list_payment_methods(
    State(state): State<AppState>,
) -> ApiResult<Vec<PaymentMethodModel>> {
    let methods = state.services.catalog.list_payment_methods().await?;
    Ok(success_response(methods))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductInput>,
) -> Result<(StatusCode, axum::Json<ApiResponse<ProductModel>>), ServiceError> {
    let product = state.services.catalog.create_product(payload).await?;
    Ok(created_response(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProductInput>,
) -> ApiResult<ProductModel> {
    let product = state.services.catalog.update_product(id, payload).await?;
    Ok(success_response(product))
}

/// Soft-delete a product
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<ProductModel> {
    let product = state.services.catalog.deactivate_product(id).await?;
    Ok(success_response(product))
}

pub async fn add_variant(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<CreateVariantInput>,
) -> Result<(StatusCode, axum::Json<ApiResponse<ProductVariantModel>>), ServiceError> {
    let variant = state.services.catalog.add_variant(id, payload).await?;
    Ok(created_response(variant))
}

pub async fn add_image(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<CreateImageInput>,
) -> Result<(StatusCode, axum::Json<ApiResponse<ProductImageModel>>), ServiceError> {
    let image = state.services.catalog.add_image(id, payload).await?;
    Ok(created_response(image))
}
