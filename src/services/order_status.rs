use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    entities::{
        order::{
            self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
            OrderStatus, PaymentStatus,
        },
        order_item,
    },
    errors::ServiceError,
    events::{outbox, Event},
    services::{inventory, notifications},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusInput {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdatePaymentStatusInput {
    pub payment_status: PaymentStatus,
}

/// Fulfilment transitions. Delivered and cancelled are terminal.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Preparing, Shipped) | (Shipped, Delivered) | (Preparing, Cancelled) | (Shipped, Cancelled)
    )
}

/// Payment transitions. A failed payment may be retried; completed is final.
pub fn is_valid_payment_transition(from: PaymentStatus, to: PaymentStatus) -> bool {
    use PaymentStatus::*;
    matches!(
        (from, to),
        (Pending, Completed) | (Pending, Failed) | (Failed, Completed)
    )
}

/// Inbox title for an order entering `status`.
pub fn status_title(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Preparing => "Order is being prepared",
        OrderStatus::Shipped => "Order shipped",
        OrderStatus::Delivered => "Order delivered",
        OrderStatus::Cancelled => "Order cancelled",
    }
}

pub fn status_message(order_number: &str, status: OrderStatus) -> String {
    format!("Order #{} status updated to {}.", order_number, status)
}

async fn find_order<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<OrderModel, ServiceError> {
    OrderEntity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
}

/// Admin-driven order state machine
#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DatabaseConnection>,
}

impl OrderStatusService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Moves an order to `new_status`.
    ///
    /// The status change, the shipped/delivered timestamps, the stock
    /// returned by a cancellation, the customer notification and the outbox
    /// rows all commit together. `OrderStatusChanged` reaches the event bus
    /// through the outbox once the transaction has committed.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: i32,
        new_status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;

        let order = find_order(&txn, order_id).await?;

        let old_status = order.status;
        if !is_valid_transition(old_status, new_status) {
            warn!(%old_status, %new_status, "rejected order status transition");
            return Err(ServiceError::InvalidTransition(format!(
                "Cannot change order status from {} to {}",
                old_status, new_status
            )));
        }

        let now = Utc::now();
        let mut changes = OrderActiveModel {
            status: Set(new_status),
            updated_at: Set(now),
            ..Default::default()
        };
        match new_status {
            OrderStatus::Shipped => changes.shipped_at = Set(Some(now)),
            OrderStatus::Delivered => changes.delivered_at = Set(Some(now)),
            _ => {}
        }

        // Guarded on the status read above: a concurrent change makes this a no-op.
        let result = OrderEntity::update_many()
            .set(changes)
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(old_status))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            warn!(%old_status, %new_status, "order status changed concurrently");
            return Err(ServiceError::InvalidTransition(format!(
                "Order {} is no longer {}; cannot change status to {}",
                order_id, old_status, new_status
            )));
        }
        let updated = find_order(&txn, order_id).await?;

        if new_status == OrderStatus::Cancelled {
            let items = order_item::Entity::find()
                .filter(order_item::Column::OrderId.eq(order_id))
                .all(&txn)
                .await?;
            for item in items {
                if let Some(variant_id) = item.variant_id {
                    inventory::release_stock(&txn, variant_id, item.quantity).await?;
                }
            }
        }

        notifications::record_order_notification(
            &txn,
            &updated,
            status_title(new_status),
            status_message(&updated.order_number, new_status),
        )
        .await?;

        outbox::enqueue_event(
            &txn,
            "order",
            Some(order_id.to_string()),
            &Event::OrderStatusChanged {
                order_id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
            },
        )
        .await?;

        txn.commit().await?;

        metrics::counter!(
            "storefront_order_status_changes_total",
            1,
            "status" => new_status.to_string()
        );
        info!(
            "Order {} status changed from {} to {}",
            order_id, old_status, new_status
        );
        Ok(updated)
    }

    /// Records a payment outcome for an order.
    #[instrument(skip(self))]
    pub async fn update_payment_status(
        &self,
        order_id: i32,
        new_status: PaymentStatus,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;

        let order = find_order(&txn, order_id).await?;

        let old_status = order.payment_status;
        if !is_valid_payment_transition(old_status, new_status) {
            return Err(ServiceError::InvalidTransition(format!(
                "Cannot change payment status from {} to {}",
                old_status, new_status
            )));
        }

        let now = Utc::now();
        let changes = OrderActiveModel {
            payment_status: Set(new_status),
            updated_at: Set(now),
            ..Default::default()
        };
        let result = OrderEntity::update_many()
            .set(changes)
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::PaymentStatus.eq(old_status))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::InvalidTransition(format!(
                "Payment status of order {} is no longer {}; cannot change it to {}",
                order_id, old_status, new_status
            )));
        }

        let updated = find_order(&txn, order_id).await?;

        outbox::enqueue_event(
            &txn,
            "order",
            Some(order_id.to_string()),
            &Event::PaymentStatusChanged {
                order_id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
            },
        )
        .await?;

        txn.commit().await?;

        info!(
            "Order {} payment status changed from {} to {}",
            order_id, old_status, new_status
        );
        Ok(updated)
    }
}
