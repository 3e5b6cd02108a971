use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = r#"
# Storefront API

Cart, checkout and order lifecycle for the storefront.

## Authentication

Customer and admin endpoints require a JWT bearer token:

```
Authorization: Bearer <your-jwt-token>
```

Admin endpoints additionally require the `admin` role.

## Error Handling

Errors share one body shape:

```json
{
  "error": "Conflict",
  "message": "Cannot change order status from delivered to shipped",
  "request_id": "2f4c...",
  "timestamp": "2025-01-01T00:00:00Z"
}
```
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "cart", description = "Shopping cart endpoints"),
        (name = "orders", description = "Order placement and history"),
        (name = "catalog", description = "Product browsing"),
        (name = "admin", description = "Administrative endpoints")
    ),
    paths(
        // Cart
        crate::handlers::commerce::carts::get_cart,
        crate::handlers::commerce::carts::add_item,
        crate::handlers::commerce::carts::update_item,

        // Orders
        crate::handlers::commerce::checkout::checkout,
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_status,

        // Catalog
        crate::handlers::commerce::products::list_products,
    ),
    components(
        schemas(
            crate::entities::order::ShippingAddress,
            crate::entities::order::OrderStatus,
            crate::entities::order::PaymentStatus,
            crate::services::inventory::StockLevel,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document at `/api-docs/openapi.json`.
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_cart_and_order_paths() {
        let doc = ApiDocV1::openapi();
        let paths = &doc.paths.paths;

        assert!(paths.contains_key("/api/v1/cart"));
        assert!(paths.contains_key("/api/v1/checkout"));
        assert!(paths.contains_key("/api/v1/orders/{id}"));
        assert!(paths.contains_key("/api/v1/admin/orders/{id}/status"));
    }
}
