use crate::handlers::common::{created_response, success_response, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::order::Model as OrderModel,
    errors::ServiceError,
    services::{
        order_status::{UpdatePaymentStatusInput, UpdateStatusInput},
        orders::{CreateOrderInput, OrderPage, OrderWithItems},
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};

/// Create an order from explicit lines
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderInput,
    responses(
        (status = 201, description = "Order created successfully", body = ApiResponse<OrderWithItems>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderInput>,
) -> Result<(StatusCode, axum::Json<ApiResponse<OrderWithItems>>), ServiceError> {
    let order = state.services.orders.create_order(user.user_id, payload).await?;
    Ok(created_response(order))
}

/// The caller's orders, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(PaginationParams),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<OrderPage>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<OrderPage> {
    let page = state
        .services
        .orders
        .list_user_orders(user.user_id, params.page, params.per_page)
        .await?;
    Ok(success_response(page))
}

/// One of the caller's orders with its items
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved successfully", body = ApiResponse<OrderWithItems>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Order belongs to another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<OrderWithItems> {
    let order = state.services.orders.get_order(user.user_id, id).await?;
    Ok(success_response(order))
}

pub async fn list_all_orders(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<OrderPage> {
    let page = state
        .services
        .orders
        .list_all_orders(params.page, params.per_page)
        .await?;
    Ok(success_response(page))
}

pub async fn get_order_admin(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<OrderWithItems> {
    let order = state.services.orders.get_order_admin(id).await?;
    Ok(success_response(order))
}

/// Move an order through its status machine
#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{id}/status",
    params(("id" = i32, Path, description = "Order id")),
    request_body = UpdateStatusInput,
    responses(
        (status = 200, description = "Status updated"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateStatusInput>,
) -> ApiResult<OrderModel> {
    let order = state
        .services
        .order_status
        .update_status(id, payload.status)
        .await?;
    Ok(success_response(order))
}

pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePaymentStatusInput>,
) -> ApiResult<OrderModel> {
    let order = state
        .services
        .order_status
        .update_payment_status(id, payload.payment_status)
        .await?;
    Ok(success_response(order))
}
