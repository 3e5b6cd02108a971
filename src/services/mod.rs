// Storefront services
pub mod commerce;
pub mod inventory;
pub mod notifications;
pub mod order_status;
pub mod orders;
