use crate::handlers::common::{created_response, message_response, success_response};
use crate::{
    auth::AuthUser,
    entities::commerce::CartItemModel,
    errors::ServiceError,
    services::commerce::{AddToCartInput, CartView},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

/// Get the caller's cart with current prices
#[utoipa::path(
    get,
    path = "/api/v1/cart",
    responses(
        (status = 200, description = "Cart retrieved", body = ApiResponse<CartView>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "cart"
)]
pub async fn get_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<CartView> {
    let cart = state.services.cart.get_cart(user.user_id).await?;
    Ok(success_response(cart))
}

/// Add a product to the cart, merging with an existing line
#[utoipa::path(
    post,
    path = "/api/v1/cart/items",
    request_body = AddToCartInput,
    responses(
        (status = 201, description = "Line added or merged"),
        (status = 400, description = "Invalid quantity or variant", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse)
    ),
    tag = "cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToCartInput>,
) -> Result<(StatusCode, axum::Json<ApiResponse<CartItemModel>>), ServiceError> {
    let line = state.services.cart.add_item(user.user_id, payload).await?;
    Ok(created_response(line))
}

/// Set a cart line's quantity; 0 removes the line
#[utoipa::path(
    put,
    path = "/api/v1/cart/items/{id}",
    params(("id" = i32, Path, description = "Cart line id")),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Line updated or removed"),
        (status = 403, description = "Line belongs to another user", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse)
    ),
    tag = "cart"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> ApiResult<Option<CartItemModel>> {
    let line = state
        .services
        .cart
        .update_item(user.user_id, id, payload.quantity)
        .await?;

    Ok(match line {
        Some(line) => success_response(Some(line)),
        None => message_response(None, "Item removed from cart"),
    })
}

/// Remove a cart line
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Value> {
    state.services.cart.remove_item(user.user_id, id).await?;
    Ok(message_response(json!({ "id": id }), "Item removed from cart"))
}

/// Empty the cart
pub async fn clear_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<Value> {
    let removed = state.services.cart.clear(user.user_id).await?;
    Ok(message_response(json!({ "removed": removed }), "Cart cleared"))
}
