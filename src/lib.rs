//! Storefront API Library
//!
//! Cart, order and order-status services for an online store, exposed as a
//! JSON HTTP API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod notifications;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    http::HeaderValue,
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::ToSchema;

use crate::auth::{AuthRouterExt, AuthService, ADMIN_ROLE};
use crate::handlers::{commerce, inventory, notifications as inbox, orders};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub event_sender: Arc<events::EventSender>,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<config::AppConfig>,
        event_sender: Arc<events::EventSender>,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), event_sender.clone(), config.clone());
        let auth = Arc::new(AuthService::from_config(&config));
        Self {
            db,
            config,
            event_sender,
            services,
            auth,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        assert!(!response.success);
        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes mounted under `/api/v1`
pub fn api_v1_routes() -> Router<AppState> {
    let storefront = Router::new()
        .route("/products", get(commerce::products::list_products))
        .route("/products/:id", get(commerce::products::get_product))
        .route(
            "/shipping-options",
            get(commerce::products::list_shipping_options),
        )
        .route(
            "/payment-methods",
            get(commerce::products::list_payment_methods),
        )
        .route("/brands", get(commerce::taxonomy::list_brands))
        .route("/categories", get(commerce::taxonomy::list_categories))
        .route("/colors", get(commerce::taxonomy::list_colors))
        .route("/sizes", get(commerce::taxonomy::list_sizes));

    let customer = Router::new()
        .route(
            "/cart",
            get(commerce::carts::get_cart).delete(commerce::carts::clear_cart),
        )
        .route("/cart/items", post(commerce::carts::add_item))
        .route(
            "/cart/items/:id",
            put(commerce::carts::update_item).delete(commerce::carts::remove_item),
        )
        .route("/checkout", post(commerce::checkout::checkout))
        .route(
            "/orders",
            post(orders::create_order).get(orders::list_orders),
        )
        .route("/orders/:id", get(orders::get_order))
        .route("/notifications", get(inbox::list_notifications))
        .route("/notifications/unread-count", get(inbox::unread_count))
        .route("/notifications/read-all", post(inbox::mark_all_as_read))
        .route("/notifications/:id/read", post(inbox::mark_as_read))
        .with_auth();

    let admin = Router::new()
        .route("/admin/orders", get(orders::list_all_orders))
        .route("/admin/orders/:id", get(orders::get_order_admin))
        .route("/admin/orders/:id/status", put(orders::update_status))
        .route(
            "/admin/orders/:id/payment-status",
            put(orders::update_payment_status),
        )
        .route("/admin/products", post(commerce::products::create_product))
        .route(
            "/admin/products/:id",
            put(commerce::products::update_product).delete(commerce::products::delete_product),
        )
        .route(
            "/admin/products/:id/variants",
            post(commerce::products::add_variant),
        )
        .route(
            "/admin/products/:id/images",
            post(commerce::products::add_image),
        )
        .route("/admin/brands", post(commerce::taxonomy::create_brand))
        .route("/admin/brands/:id", put(commerce::taxonomy::update_brand))
        .route("/admin/categories", post(commerce::taxonomy::create_category))
        .route(
            "/admin/categories/:id",
            put(commerce::taxonomy::update_category),
        )
        .route("/admin/colors", post(commerce::taxonomy::create_color))
        .route("/admin/sizes", post(commerce::taxonomy::create_size))
        .route("/admin/stock", get(inventory::stock_overview))
        .route(
            "/admin/stock/variants/:id",
            put(inventory::update_variant_stock),
        )
        .with_role(ADMIN_ROLE);

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(storefront)
        .merge(customer)
        .merge(admin)
}

/// CORS from configuration: explicit origins, or permissive where allowed.
pub fn cors_layer(cfg: &config::AppConfig) -> Result<CorsLayer, errors::ServiceError> {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any))
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Ok(CorsLayer::permissive())
    } else {
        Err(errors::ServiceError::InternalError(
            "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
                .to_string(),
        ))
    }
}

/// The full HTTP application: API routes, OpenAPI document and the
/// request-id, tracing, CORS and auth layers.
pub fn build_router(state: AppState) -> Result<Router, errors::ServiceError> {
    let cors = cors_layer(&state.config)?;

    Ok(Router::<AppState>::new()
        .route("/", get(|| async { "storefront-api up" }))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::openapi_routes())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(cors)
        // AuthService for the auth middleware
        .layer(Extension(state.auth.clone()))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state))
}

async fn api_status(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    Json(ApiResponse::success(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "storefront-api",
        "environment": state.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    })))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    db::check_connection(&state.db).await.map_err(|e| {
        ::tracing::error!("health check failed: {}", e);
        errors::ServiceError::ServiceUnavailable("Database unreachable".to_string())
    })?;

    Ok(Json(ApiResponse::success(json!({
        "status": "healthy",
        "checks": { "database": "healthy" },
        "timestamp": Utc::now().to_rfc3339(),
    }))))
}
