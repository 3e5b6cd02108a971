use crate::errors::ServiceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub mod outbox;

/// Domain events published after a change has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartItemAdded {
        user_id: i32,
        cart_item_id: i32,
        product_id: i32,
        variant_id: Option<i32>,
        quantity: i32,
    },
    CartItemUpdated {
        user_id: i32,
        cart_item_id: i32,
        quantity: i32,
    },
    CartItemRemoved {
        user_id: i32,
        cart_item_id: i32,
    },
    CartCleared {
        user_id: i32,
        removed: u64,
    },

    // Order events
    OrderCreated {
        order_id: i32,
        user_id: i32,
        order_number: String,
        total_amount: Decimal,
    },
    OrderStatusChanged {
        order_id: i32,
        old_status: String,
        new_status: String,
    },
    PaymentStatusChanged {
        order_id: i32,
        old_status: String,
        new_status: String,
    },

    // Inventory events
    StockUpdated {
        variant_id: i32,
        old_stock: i32,
        new_stock: i32,
    },
    LowStock {
        variant_id: i32,
        stock: i32,
    },

    // Notification events
    NotificationCreated {
        notification_id: i32,
        user_id: i32,
        related_order_id: Option<i32>,
    },
    NotificationsRead {
        user_id: i32,
        count: u64,
    },
}

impl Event {
    /// Stable name used for logging and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Event::CartItemAdded { .. } => "cart_item_added",
            Event::CartItemUpdated { .. } => "cart_item_updated",
            Event::CartItemRemoved { .. } => "cart_item_removed",
            Event::CartCleared { .. } => "cart_cleared",
            Event::OrderCreated { .. } => "order_created",
            Event::OrderStatusChanged { .. } => "order_status_changed",
            Event::PaymentStatusChanged { .. } => "payment_status_changed",
            Event::StockUpdated { .. } => "stock_updated",
            Event::LowStock { .. } => "low_stock",
            Event::NotificationCreated { .. } => "notification_created",
            Event::NotificationsRead { .. } => "notifications_read",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    ///
    /// Used after a commit: the change is durable whether or not anyone is listening.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "event dropped");
        }
    }
}

/// Drains the in-process event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        metrics::counter!("storefront_events_total", 1, "event" => event.name());

        match &event {
            Event::OrderCreated {
                order_id,
                user_id,
                order_number,
                total_amount,
            } => info!(
                order_id,
                user_id,
                %order_number,
                %total_amount,
                "order created"
            ),
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => info!(order_id, %old_status, %new_status, "order status changed"),
            Event::LowStock { variant_id, stock } => {
                warn!(variant_id, stock, "variant stock is low")
            }
            other => info!(event = other.name(), payload = ?other, "event processed"),
        }
    }

    info!("Event channel closed; event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::CartCleared {
                user_id: 1,
                removed: 2,
            })
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await,
            Some(Event::CartCleared {
                user_id: 1,
                removed: 2
            })
        );
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let err = sender
            .send(Event::LowStock {
                variant_id: 1,
                stock: 3,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EventError(_)));

        // must not panic or error
        sender
            .send_or_log(Event::LowStock {
                variant_id: 1,
                stock: 3,
            })
            .await;
    }

    #[tokio::test]
    async fn process_events_stops_when_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(process_events(rx));

        tx.send(Event::NotificationsRead {
            user_id: 1,
            count: 3,
        })
        .await
        .unwrap();
        drop(tx);

        handle.await.unwrap();
    }
}
