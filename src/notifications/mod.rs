//! Outbound delivery of customer notifications.
//!
//! Notification rows are the durable inbox; a [`NotificationSink`] is the
//! push channel (email, SMS, websocket fan-out) the outbox worker hands each
//! new notification to. Delivery is at-least-once, so sinks must tolerate
//! duplicates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

/// Payload handed to a sink for one stored notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub notification_id: i32,
    pub user_id: i32,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub related_order_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Notification delivery errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: &NotificationMessage) -> Result<(), NotificationError>;
}

/// Sink that records deliveries in the application log
#[derive(Debug, Default, Clone)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn send(&self, notification: &NotificationMessage) -> Result<(), NotificationError> {
        info!(
            notification_id = notification.notification_id,
            user_id = notification.user_id,
            related_order_id = ?notification.related_order_id,
            title = %notification.title,
            "notification delivered"
        );
        Ok(())
    }
}

/// Sink that keeps every delivered message in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryNotificationSink {
    delivered: Arc<Mutex<Vec<NotificationMessage>>>,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn delivered(&self) -> Vec<NotificationMessage> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn send(&self, notification: &NotificationMessage) -> Result<(), NotificationError> {
        self.delivered.lock().await.push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> NotificationMessage {
        NotificationMessage {
            notification_id: 1,
            user_id: 7,
            title: "Order shipped".into(),
            message: "Order #ORD-1 status updated to shipped.".into(),
            notification_type: "order".into(),
            related_order_id: Some(3),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn in_memory_sink_records_messages() {
        let sink = InMemoryNotificationSink::new();
        sink.send(&message()).await.unwrap();
        sink.send(&message()).await.unwrap();

        let delivered = sink.delivered().await;
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].related_order_id, Some(3));
    }

    #[test]
    fn message_serializes_type_field() {
        let json = serde_json::to_value(message()).unwrap();
        assert_eq!(json["type"], "order");
        assert_eq!(json["user_id"], 7);
    }
}
