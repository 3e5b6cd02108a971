#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use storefront_api::{
    config::AppConfig,
    db,
    entities::{
        commerce::{
            brand, category, color,
            payment_method::{self, PaymentMethodType},
            shipping_option, size, PaymentMethodModel, ProductModel, ProductVariantModel,
            ShippingOptionModel,
        },
        order::ShippingAddress,
    },
    events::{outbox::OutboxWorker, Event, EventSender},
    notifications::NotificationSink,
    services::commerce::{CreateProductInput, CreateVariantInput},
    AppState,
};
use tempfile::TempDir;
use tokio::sync::{mpsc, Mutex};
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str =
    "storefront-integration-signing-key-7f3a9c1e5b2d8f4a6c0e9b7d3f1a5c8e2b4d6f8a0c";

pub const CUSTOMER_ID: i32 = 1001;
pub const OTHER_CUSTOMER_ID: i32 = 1002;
pub const ADMIN_ID: i32 = 1;

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        TEST_JWT_SECRET.to_string(),
        3600,
        "127.0.0.1".to_string(),
        0,
        "test".to_string(),
    );
    cfg.cors_allow_any_origin = true;
    cfg
}

/// Application backed by a private in-memory SQLite database.
///
/// Events published by the services are kept in a channel so tests can
/// assert on them with [`TestApp::take_events`].
pub struct TestApp {
    router: Router,
    pub state: AppState,
    events: Mutex<mpsc::Receiver<Event>>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_db_config(db::DbConfig::in_memory_sqlite()).await
    }

    /// Application on a SQLite file inside `dir` with a pool of several
    /// connections, so transactions can actually interleave.
    pub async fn file_backed(dir: &TempDir) -> Self {
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("storefront.db").display()
        );
        Self::with_db_config(db::DbConfig {
            url,
            max_connections: 4,
            min_connections: 1,
            ..Default::default()
        })
        .await
    }

    async fn with_db_config(db_config: db::DbConfig) -> Self {
        let pool = db::establish_connection_with_config(&db_config)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        seed_reference_data(&pool).await;

        let (event_tx, event_rx) = mpsc::channel(1024);
        let state = AppState::new(
            Arc::new(pool),
            Arc::new(test_config()),
            Arc::new(EventSender::new(event_tx)),
        );
        let router = storefront_api::build_router(state.clone()).expect("router builds");

        Self {
            router,
            state,
            events: Mutex::new(event_rx),
        }
    }

    pub fn token_for(&self, user_id: i32, roles: &[&str]) -> String {
        self.state
            .auth
            .issue_token(user_id, roles)
            .expect("token issues")
    }

    pub fn customer_token(&self) -> String {
        self.token_for(CUSTOMER_ID, &["customer"])
    }

    pub fn admin_token(&self) -> String {
        self.token_for(ADMIN_ID, &["admin"])
    }

    /// Send a request through the full router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Everything published on the event bus since the last call.
    pub async fn take_events(&self) -> Vec<Event> {
        let mut rx = self.events.lock().await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn outbox_worker(&self, sink: Arc<dyn NotificationSink>) -> OutboxWorker {
        OutboxWorker::new(
            self.state.db.clone(),
            (*self.state.event_sender).clone(),
            sink,
            &self.state.config,
        )
    }

    pub async fn seed_product(&self, slug: &str, price: Decimal) -> ProductModel {
        self.seed_product_with_discount(slug, price, None).await
    }

    pub async fn seed_product_with_discount(
        &self,
        slug: &str,
        price: Decimal,
        discount_price: Option<Decimal>,
    ) -> ProductModel {
        self.state
            .services
            .catalog
            .create_product(CreateProductInput {
                name: format!("Product {}", slug),
                slug: slug.to_string(),
                description: Some("Seeded for integration tests".to_string()),
                brand_id: 1,
                category_id: 1,
                price,
                discount_price,
                is_active: Some(true),
            })
            .await
            .expect("seed product")
    }

    pub async fn seed_variant(&self, product_id: i32, sku: &str, stock: i32) -> ProductVariantModel {
        self.state
            .services
            .catalog
            .add_variant(
                product_id,
                CreateVariantInput {
                    color_id: 1,
                    size_id: 1,
                    sku: sku.to_string(),
                    stock,
                },
            )
            .await
            .expect("seed variant")
    }

    pub async fn seed_shipping_option(&self, base_price: Decimal) -> ShippingOptionModel {
        shipping_option::ActiveModel {
            name: Set("Standard".to_string()),
            description: Set(Some("3-5 business days".to_string())),
            base_price: Set(base_price),
            estimated_days: Set(4),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed shipping option")
    }

    pub async fn seed_payment_method(&self) -> PaymentMethodModel {
        payment_method::ActiveModel {
            name: Set("Credit card".to_string()),
            method_type: Set(PaymentMethodType::CreditCard),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed payment method")
    }

    pub async fn variant_stock(&self, variant_id: i32) -> i32 {
        use sea_orm::EntityTrait;
        storefront_api::entities::commerce::ProductVariant::find_by_id(variant_id)
            .one(&*self.state.db)
            .await
            .expect("query variant")
            .expect("variant exists")
            .stock
    }
}

/// Brand, category, color and size with id 1, which seeded products and
/// variants point at.
async fn seed_reference_data(db: &sea_orm::DatabaseConnection) {
    let now = Utc::now();
    brand::ActiveModel {
        name: Set("Atelier".to_string()),
        slug: Set("atelier".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed brand");
    category::ActiveModel {
        name: Set("Outerwear".to_string()),
        slug: Set("outerwear".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed category");
    color::ActiveModel {
        name: Set("Black".to_string()),
        code: Set("#000000".to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed color");
    size::ActiveModel {
        size: Set("M".to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed size");
}

pub fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Ayse Yilmaz".to_string(),
        phone: "+90 555 000 0000".to_string(),
        address: "Bagdat Cad. 12/4".to_string(),
        city: "Istanbul".to_string(),
        postal_code: "34710".to_string(),
        country: String::new(),
    }
}

pub fn shipping_address_json() -> Value {
    json!({
        "fullName": "Ayse Yilmaz",
        "phone": "+90 555 000 0000",
        "address": "Bagdat Cad. 12/4",
        "city": "Istanbul",
        "postalCode": "34710"
    })
}

pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response is json")
}

pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        other => other.to_string().parse().expect("decimal number"),
    }
}
