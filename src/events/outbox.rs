use crate::config::AppConfig;
use crate::entities::outbox_event::{self, OutboxStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::notifications::{NotificationMessage, NotificationSink};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Event type of outbox rows carrying a [`NotificationMessage`] for the sink.
pub const NOTIFICATION_CREATED: &str = "notification.created";

const BASE_BACKOFF_SECS: i64 = 2;
const MAX_BACKOFF_SECS: i64 = 3600;

/// Enqueue an event row. Pass the open transaction so the row commits or
/// rolls back together with the change it describes.
pub async fn enqueue<C: ConnectionTrait>(
    conn: &C,
    aggregate_type: &str,
    aggregate_id: Option<String>,
    event_type: &str,
    payload: Value,
) -> Result<Uuid, ServiceError> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    outbox_event::ActiveModel {
        id: Set(id),
        aggregate_type: Set(aggregate_type.to_string()),
        aggregate_id: Set(aggregate_id),
        event_type: Set(event_type.to_string()),
        payload: Set(payload),
        status: Set(OutboxStatus::Pending),
        attempts: Set(0),
        available_at: Set(now),
        created_at: Set(now),
        updated_at: Set(now),
        processed_at: Set(None),
        error_message: Set(None),
    }
    .insert(conn)
    .await?;

    debug!(%id, event_type, aggregate_type, "enqueued outbox event");
    Ok(id)
}

/// Enqueue a domain [`Event`] for the in-process bus.
pub async fn enqueue_event<C: ConnectionTrait>(
    conn: &C,
    aggregate_type: &str,
    aggregate_id: Option<String>,
    event: &Event,
) -> Result<Uuid, ServiceError> {
    let payload = serde_json::to_value(event)?;
    enqueue(conn, aggregate_type, aggregate_id, event.name(), payload).await
}

/// Enqueue a notification for delivery through the [`NotificationSink`].
pub async fn enqueue_notification<C: ConnectionTrait>(
    conn: &C,
    message: &NotificationMessage,
) -> Result<Uuid, ServiceError> {
    let payload = serde_json::to_value(message)?;
    enqueue(
        conn,
        "notification",
        Some(message.notification_id.to_string()),
        NOTIFICATION_CREATED,
        payload,
    )
    .await
}

fn backoff_secs(attempts: i32) -> i64 {
    BASE_BACKOFF_SECS
        .saturating_pow(attempts.max(0) as u32)
        .min(MAX_BACKOFF_SECS)
}

/// Polls the outbox and dispatches due rows at-least-once.
#[derive(Clone)]
pub struct OutboxWorker {
    db: Arc<DatabaseConnection>,
    sender: EventSender,
    sink: Arc<dyn NotificationSink>,
    batch_size: u64,
    max_attempts: i32,
    poll_interval: Duration,
    claim_timeout: chrono::Duration,
}

impl OutboxWorker {
    pub fn new(
        db: Arc<DatabaseConnection>,
        sender: EventSender,
        sink: Arc<dyn NotificationSink>,
        config: &AppConfig,
    ) -> Self {
        Self {
            db,
            sender,
            sink,
            batch_size: config.outbox_batch_size,
            max_attempts: config.outbox_max_attempts,
            poll_interval: Duration::from_millis(config.outbox_poll_interval_ms),
            claim_timeout: chrono::Duration::seconds(config.outbox_claim_timeout_secs),
        }
    }

    /// Runs the polling loop on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            batch_size = self.batch_size,
            "Starting outbox worker"
        );
        tokio::spawn(async move {
            let mut ticker = interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.drain_once().await {
                    error!("outbox worker error: {}", e);
                }
            }
        })
    }

    /// Rows a worker may claim: pending rows that are due, plus rows whose
    /// claim is older than the claim timeout (the claiming worker died or
    /// lost its connection before recording the outcome).
    fn claimable(&self, now: chrono::DateTime<Utc>) -> Condition {
        let stale_before = now - self.claim_timeout;
        Condition::any()
            .add(
                Condition::all()
                    .add(outbox_event::Column::Status.eq(OutboxStatus::Pending))
                    .add(outbox_event::Column::AvailableAt.lte(now)),
            )
            .add(
                Condition::all()
                    .add(outbox_event::Column::Status.eq(OutboxStatus::Processing))
                    .add(outbox_event::Column::UpdatedAt.lte(stale_before)),
            )
    }

    /// Processes one batch of due rows; returns how many were delivered.
    pub async fn drain_once(&self) -> Result<usize, ServiceError> {
        let db = self.db.as_ref();
        let now = Utc::now();

        let due = outbox_event::Entity::find()
            .filter(self.claimable(now))
            .order_by_asc(outbox_event::Column::CreatedAt)
            .limit(self.batch_size)
            .all(db)
            .await?;

        let mut delivered = 0;
        for row in due {
            if row.status == OutboxStatus::Processing {
                warn!(id = %row.id, attempts = row.attempts, "reclaiming stale outbox row");
            }

            // Claim the row; zero rows affected means another worker got it first.
            let claimed = outbox_event::Entity::update_many()
                .col_expr(
                    outbox_event::Column::Status,
                    Expr::value(OutboxStatus::Processing.to_value()),
                )
                .col_expr(
                    outbox_event::Column::Attempts,
                    Expr::col(outbox_event::Column::Attempts).add(1),
                )
                .col_expr(outbox_event::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(outbox_event::Column::Id.eq(row.id))
                .filter(self.claimable(Utc::now()))
                .exec(db)
                .await?;
            if claimed.rows_affected == 0 {
                continue;
            }

            let attempts = row.attempts + 1;
            let id = row.id;
            let outcome = self.dispatch(&row.event_type, &row.payload).await;

            let mut update: outbox_event::ActiveModel = row.into();
            update.attempts = Set(attempts);
            update.updated_at = Set(Utc::now());
            match outcome {
                Ok(()) => {
                    update.status = Set(OutboxStatus::Delivered);
                    update.processed_at = Set(Some(Utc::now()));
                    update.error_message = Set(None);
                    delivered += 1;
                }
                Err(reason) if attempts < self.max_attempts => {
                    let delay = backoff_secs(attempts);
                    warn!(%id, attempts, delay_secs = delay, %reason, "outbox dispatch failed; retrying");
                    update.status = Set(OutboxStatus::Pending);
                    update.available_at = Set(Utc::now() + chrono::Duration::seconds(delay));
                    update.error_message = Set(Some(reason));
                }
                Err(reason) => {
                    error!(%id, attempts, %reason, "outbox dispatch failed permanently");
                    update.status = Set(OutboxStatus::Failed);
                    update.error_message = Set(Some(reason));
                }
            }
            update.update(db).await?;
        }

        if delivered > 0 {
            metrics::counter!("storefront_outbox_delivered_total", delivered as u64);
        }
        Ok(delivered)
    }

    async fn dispatch(&self, event_type: &str, payload: &Value) -> Result<(), String> {
        if event_type == NOTIFICATION_CREATED {
            let message: NotificationMessage =
                serde_json::from_value(payload.clone()).map_err(|e| e.to_string())?;
            self.sink.send(&message).await.map_err(|e| e.to_string())?;
            self.sender
                .send_or_log(Event::NotificationCreated {
                    notification_id: message.notification_id,
                    user_id: message.user_id,
                    related_order_id: message.related_order_id,
                })
                .await;
            return Ok(());
        }

        let event: Event = serde_json::from_value(payload.clone())
            .map_err(|e| format!("undecodable {} payload: {}", event_type, e))?;
        self.sender.send(event).await.map_err(|e| e.to_string())
    }
}
