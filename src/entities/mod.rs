pub mod commerce;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod outbox_event;
