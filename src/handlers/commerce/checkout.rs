use crate::handlers::common::created_response;
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::orders::{CheckoutInput, OrderWithItems},
    ApiResponse, AppState,
};
use axum::{
    extract::{Json, State},
    http::StatusCode,
};

/// Place an order from the caller's cart and empty the cart
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = CheckoutInput,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Empty cart or invalid order data", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutInput>,
) -> Result<(StatusCode, axum::Json<ApiResponse<OrderWithItems>>), ServiceError> {
    let order = state.services.orders.checkout(user.user_id, payload).await?;
    Ok(created_response(order))
}
