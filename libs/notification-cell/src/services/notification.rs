use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_database::{AppState, RealtimeDatabase};
use shared_models::dates::now_millis;
use shared_models::record::{decode_children, Record};

use crate::models::{DispatchedNotification, Notification, NotificationError};
use crate::services::dispatch::channel_for;
use crate::services::publisher::NotificationPublisher;

#[derive(Clone)]
pub struct NotificationService {
    db: RealtimeDatabase,
}

impl NotificationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
        }
    }

    /// Stores a notification in the recipient's inbox.
    pub async fn create(
        &self,
        recipient_id: &str,
        notification: &Notification,
        auth_token: &str,
    ) -> Result<DispatchedNotification, NotificationError> {
        self.db
            .put(
                &Notification::path(recipient_id, &notification.id),
                Some(auth_token),
                notification.to_value(),
            )
            .await?;

        let channel = channel_for(notification.kind);
        info!(
            "Notification {} ({}) stored for {} on channel {}",
            notification.id,
            notification.kind,
            recipient_id,
            channel.id()
        );

        Ok(DispatchedNotification {
            channel,
            notification: notification.clone(),
        })
    }

    /// Inbox of `recipient_id`, newest first. Entries with an unknown type
    /// are skipped.
    pub async fn list(&self, recipient_id: &str, auth_token: &str) -> Result<Vec<Notification>, NotificationError> {
        debug!("Listing notifications for {}", recipient_id);

        let children = self
            .db
            .children(&Notification::inbox_path(recipient_id), Some(auth_token))
            .await?;
        let mut notifications: Vec<Notification> = decode_children(children);
        notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(notifications)
    }

    pub async fn unread_count(&self, recipient_id: &str, auth_token: &str) -> Result<usize, NotificationError> {
        let notifications = self.list(recipient_id, auth_token).await?;
        Ok(notifications.iter().filter(|n| !n.is_read).count())
    }

    pub async fn mark_read(
        &self,
        recipient_id: &str,
        notification_id: &str,
        auth_token: &str,
    ) -> Result<Notification, NotificationError> {
        let path = Notification::path(recipient_id, notification_id);
        let node = self
            .db
            .get(&path, Some(auth_token))
            .await?
            .filter(|node| node.is_object())
            .ok_or(NotificationError::NotFound)?;

        let mut notification = Notification::from_value(&node)?;
        if notification.is_read {
            return Ok(notification);
        }

        self.db
            .patch(&path, Some(auth_token), json!({ "isRead": true }))
            .await?;
        notification.is_read = true;

        debug!("Notification {} marked read for {}", notification_id, recipient_id);
        Ok(notification)
    }

    /// Decodes a push payload and stores it. An unknown `type` is rejected
    /// before anything is written.
    pub async fn ingest_push(
        &self,
        recipient_id: &str,
        data: &HashMap<String, String>,
        auth_token: &str,
    ) -> Result<DispatchedNotification, NotificationError> {
        let notification = Notification::from_push(data, now_millis()).map_err(|e| {
            warn!("Rejected push payload for {}: {}", recipient_id, e);
            e
        })?;
        self.create(recipient_id, &notification, auth_token).await
    }
}

#[async_trait]
impl NotificationPublisher for NotificationService {
    async fn publish(
        &self,
        recipient_id: &str,
        notification: Notification,
        auth_token: &str,
    ) -> Result<(), NotificationError> {
        self.create(recipient_id, &notification, auth_token).await?;
        Ok(())
    }
}
