use crate::handlers::common::{success_response, LimitParams};
use crate::{
    auth::AuthUser, entities::notification::Model as NotificationModel, ApiResult, AppState,
};
use axum::extract::{Path, Query, State};
use serde_json::{json, Value};

pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<NotificationModel>> {
    let notifications = state
        .services
        .notifications
        .list(user.user_id, params.limit)
        .await?;
    Ok(success_response(notifications))
}

pub async fn unread_count(State(state): State<AppState>, user: AuthUser) -> ApiResult<Value> {
    let count = state.services.notifications.unread_count(user.user_id).await?;
    Ok(success_response(json!({ "count": count })))
}

pub async fn mark_as_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<NotificationModel> {
    let notification = state
        .services
        .notifications
        .mark_as_read(user.user_id, id)
        .await?;
    Ok(success_response(notification))
}

pub async fn mark_all_as_read(State(state): State<AppState>, user: AuthUser) -> ApiResult<Value> {
    let updated = state
        .services
        .notifications
        .mark_all_as_read(user.user_id)
        .await?;
    Ok(success_response(json!({ "updated": updated })))
}
