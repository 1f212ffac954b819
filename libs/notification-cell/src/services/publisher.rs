use async_trait::async_trait;

use crate::models::{Notification, NotificationError};

/// Sink for notifications raised by other cells.
///
/// Appointment booking talks to this trait rather than to the database so
/// tests can capture what would have been sent.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(
        &self,
        recipient_id: &str,
        notification: Notification,
        auth_token: &str,
    ) -> Result<(), NotificationError>;
}
