use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{InboxQuery, NotificationError, PushMessageRequest};
use crate::services::NotificationService;

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound => AppError::NotFound(err.to_string()),
            NotificationError::Decode(_) => AppError::BadRequest(err.to_string()),
            NotificationError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<InboxQuery>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);

    let mut notifications = service.list(&user.id, &user.token).await?;
    let unread = notifications.iter().filter(|n| !n.is_read).count();
    if query.unread_only.unwrap_or(false) {
        notifications.retain(|n| !n.is_read);
    }

    Ok(Json(json!({
        "notifications": notifications,
        "total": notifications.len(),
        "unread": unread
    })))
}

#[axum::debug_handler]
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(notification_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);

    let notification = service.mark_read(&user.id, &notification_id, &user.token).await?;

    Ok(Json(json!(notification)))
}

/// Accepts a push message addressed to the caller (or, for admins, to any
/// recipient) and files it in the inbox.
#[axum::debug_handler]
pub async fn ingest_push(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<PushMessageRequest>,
) -> Result<Json<Value>, AppError> {
    let recipient_id = request.recipient_id.unwrap_or_else(|| user.id.clone());
    if !user.can_act_for(&recipient_id) {
        return Err(AppError::Forbidden(
            "Not authorized to deliver to this recipient".to_string(),
        ));
    }

    let service = NotificationService::new(&state);

    let dispatched = service.ingest_push(&recipient_id, &request.data, &user.token).await?;

    Ok(Json(json!({
        "success": true,
        "channel": dispatched.channel,
        "notification": dispatched.notification
    })))
}
