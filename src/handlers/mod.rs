pub mod commerce;
pub mod common;
pub mod inventory;
pub mod notifications;
pub mod orders;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::{
    commerce::{CartService, ProductCatalogService, TaxonomyService},
    inventory::InventoryService,
    notifications::NotificationService,
    order_status::OrderStatusService,
    orders::OrderService,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub cart: Arc<CartService>,
    pub catalog: Arc<ProductCatalogService>,
    pub taxonomy: Arc<TaxonomyService>,
    pub orders: Arc<OrderService>,
    pub order_status: Arc<OrderStatusService>,
    pub inventory: Arc<InventoryService>,
    pub notifications: Arc<NotificationService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            cart: Arc::new(CartService::new(db.clone(), event_sender.clone())),
            catalog: Arc::new(ProductCatalogService::new(
                db.clone(),
                event_sender.clone(),
            )),
            taxonomy: Arc::new(TaxonomyService::new(db.clone())),
            orders: Arc::new(OrderService::new(
                db.clone(),
                event_sender.clone(),
                config.clone(),
            )),
            order_status: Arc::new(OrderStatusService::new(db.clone())),
            inventory: Arc::new(InventoryService::new(
                db.clone(),
                event_sender.clone(),
                config,
            )),
            notifications: Arc::new(NotificationService::new(db, event_sender)),
        }
    }
}
