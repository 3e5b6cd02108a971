use crate::{
    entities::{
        notification::{self, Entity as Notification, Model as NotificationModel, NotificationType},
        order::Model as OrderModel,
    },
    errors::ServiceError,
    events::{outbox, Event, EventSender},
    notifications::NotificationMessage,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

const DEFAULT_LIMIT: u64 = 50;
const MAX_LIMIT: u64 = 200;

/// Writes an order notification and queues it for push delivery.
///
/// Both rows go through `conn`, which callers pass as the transaction that
/// changes the order.
pub async fn record_order_notification<C: ConnectionTrait>(
    conn: &C,
    order: &OrderModel,
    title: &str,
    message: String,
) -> Result<NotificationModel, ServiceError> {
    let row = notification::ActiveModel {
        user_id: Set(order.user_id),
        title: Set(title.to_string()),
        message: Set(message),
        notification_type: Set(NotificationType::Order),
        related_order_id: Set(Some(order.id)),
        is_read: Set(false),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    outbox::enqueue_notification(
        conn,
        &NotificationMessage {
            notification_id: row.id,
            user_id: row.user_id,
            title: row.title.clone(),
            message: row.message.clone(),
            notification_type: "order".to_string(),
            related_order_id: row.related_order_id,
            created_at: row.created_at,
        },
    )
    .await?;

    debug!(notification_id = row.id, order_id = order.id, "order notification recorded");
    Ok(row)
}

/// The customer's notification inbox
#[derive(Clone)]
pub struct NotificationService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl NotificationService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Newest first, at most `limit` (default 50)
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        user_id: i32,
        limit: Option<u64>,
    ) -> Result<Vec<NotificationModel>, ServiceError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .limit(limit)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn unread_count(&self, user_id: i32) -> Result<u64, ServiceError> {
        Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Marks one notification read; only its owner may do so.
    #[instrument(skip(self))]
    pub async fn mark_as_read(
        &self,
        user_id: i32,
        notification_id: i32,
    ) -> Result<NotificationModel, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = Notification::find_by_id(notification_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Notification {} not found", notification_id))
            })?;
        if existing.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "You do not have access to this notification".to_string(),
            ));
        }
        if existing.is_read {
            txn.commit().await?;
            return Ok(existing);
        }

        let mut active: notification::ActiveModel = existing.into();
        active.is_read = Set(true);
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::NotificationsRead { user_id, count: 1 })
            .await;
        Ok(updated)
    }

    /// Marks every unread notification of the user read; returns how many changed.
    #[instrument(skip(self))]
    pub async fn mark_all_as_read(&self, user_id: i32) -> Result<u64, ServiceError> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&*self.db)
            .await?;
        let count = result.rows_affected;

        if count > 0 {
            self.event_sender
                .send_or_log(Event::NotificationsRead { user_id, count })
                .await;
        }
        info!("Marked {} notifications read for user {}", count, user_id);
        Ok(count)
    }
}
