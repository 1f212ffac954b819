use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::record::{
    optional_value, read_bool, read_i64, read_optional_string, read_string, require_enum, Record,
    RecordError, RecordMap, SymbolicEnum,
};

// ==============================================================================
// NOTIFICATION TYPES
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationType {
    AppointmentBooked,
    AppointmentConfirmed,
    AppointmentCancelled,
    AppointmentCompleted,
    AppointmentReminder,
    General,
}

impl SymbolicEnum for NotificationType {
    const KIND: &'static str = "notification type";
    const VARIANTS: &'static [Self] = &[
        NotificationType::AppointmentBooked,
        NotificationType::AppointmentConfirmed,
        NotificationType::AppointmentCancelled,
        NotificationType::AppointmentCompleted,
        NotificationType::AppointmentReminder,
        NotificationType::General,
    ];

    fn name(&self) -> &'static str {
        match self {
            NotificationType::AppointmentBooked => "APPOINTMENT_BOOKED",
            NotificationType::AppointmentConfirmed => "APPOINTMENT_CONFIRMED",
            NotificationType::AppointmentCancelled => "APPOINTMENT_CANCELLED",
            NotificationType::AppointmentCompleted => "APPOINTMENT_COMPLETED",
            NotificationType::AppointmentReminder => "APPOINTMENT_REMINDER",
            NotificationType::General => "GENERAL",
        }
    }
}

impl Default for NotificationType {
    fn default() -> Self {
        Self::first_declared()
    }
}

impl NotificationType {
    pub fn default_title(&self) -> &'static str {
        match self {
            NotificationType::AppointmentBooked => "New appointment request",
            NotificationType::AppointmentConfirmed => "Appointment confirmed",
            NotificationType::AppointmentCancelled => "Appointment cancelled",
            NotificationType::AppointmentCompleted => "Appointment completed",
            NotificationType::AppointmentReminder => "Appointment reminder",
            NotificationType::General => "MediBook",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for NotificationType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

// ==============================================================================
// NOTIFICATION RECORD
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub related_id: Option<String>,
    pub is_read: bool,
    pub timestamp: i64,
}

impl Notification {
    pub fn path(recipient_id: &str, notification_id: &str) -> String {
        format!("{}/{}", Self::inbox_path(recipient_id), notification_id)
    }

    pub fn inbox_path(recipient_id: &str) -> String {
        format!("notifications/{}", recipient_id)
    }

    pub fn new(
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        related_id: Option<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            message: message.into(),
            kind,
            related_id,
            is_read: false,
            timestamp,
        }
    }

    /// Builds a notification from the string data map of a push message.
    ///
    /// `type` must name a [`NotificationType`] exactly; anything else is an
    /// error. The other fields are optional.
    pub fn from_push(data: &HashMap<String, String>, timestamp: i64) -> Result<Self, RecordError> {
        let raw_type = data.get("type").ok_or(RecordError::MissingField("type"))?;
        let kind = NotificationType::from_name(raw_type)?;

        let title = data
            .get("title")
            .filter(|t| !t.is_empty())
            .cloned()
            .unwrap_or_else(|| kind.default_title().to_string());
        let message = data.get("message").or_else(|| data.get("body")).cloned().unwrap_or_default();
        let related_id = data
            .get("relatedId")
            .or_else(|| data.get("appointmentId"))
            .filter(|id| !id.is_empty())
            .cloned();

        Ok(Self::new(kind, title, message, related_id, timestamp))
    }
}

impl Record for Notification {
    fn key(&self) -> &str {
        &self.id
    }

    fn to_map(&self) -> RecordMap {
        let mut map = RecordMap::new();
        map.insert("id".into(), json!(self.id));
        map.insert("title".into(), json!(self.title));
        map.insert("message".into(), json!(self.message));
        map.insert("type".into(), json!(self.kind.name()));
        map.insert("relatedId".into(), optional_value(&self.related_id));
        map.insert("isRead".into(), json!(self.is_read));
        map.insert("timestamp".into(), json!(self.timestamp));
        map
    }

    /// A `type` that is present must name a [`NotificationType`] exactly.
    /// An absent one, like every other field, falls back to its default.
    fn from_map(map: &RecordMap) -> Result<Self, RecordError> {
        let kind = match map.get("type") {
            None | Some(Value::Null) => NotificationType::default(),
            Some(_) => require_enum(map, "type")?,
        };

        Ok(Self {
            id: read_string(map, "id").into_inner(),
            title: read_string(map, "title").into_inner(),
            message: read_string(map, "message").into_inner(),
            kind,
            related_id: read_optional_string(map, "relatedId").into_inner(),
            is_read: read_bool(map, "isRead").into_inner(),
            timestamp: read_i64(map, "timestamp").into_inner(),
        })
    }
}

// ==============================================================================
// CHANNELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelImportance {
    High,
    Default,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationChannel {
    Appointments,
    Reminders,
    General,
}

impl NotificationChannel {
    pub fn id(&self) -> &'static str {
        match self {
            NotificationChannel::Appointments => "appointments",
            NotificationChannel::Reminders => "reminders",
            NotificationChannel::General => "general",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            NotificationChannel::Appointments => "Appointments",
            NotificationChannel::Reminders => "Reminders",
            NotificationChannel::General => "General",
        }
    }

    pub fn importance(&self) -> ChannelImportance {
        match self {
            NotificationChannel::Appointments => ChannelImportance::High,
            NotificationChannel::Reminders => ChannelImportance::Default,
            NotificationChannel::General => ChannelImportance::Low,
        }
    }
}

impl Serialize for NotificationChannel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        json!({
            "id": self.id(),
            "name": self.display_name(),
            "importance": self.importance(),
        })
        .serialize(serializer)
    }
}

/// A stored notification together with the channel it should surface on.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchedNotification {
    pub channel: NotificationChannel,
    pub notification: Notification,
}

// ==============================================================================
// REQUESTS / ERRORS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessageRequest {
    /// Defaults to the caller.
    pub recipient_id: Option<String>,
    pub data: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboxQuery {
    pub unread_only: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification not found")]
    NotFound,

    #[error("Invalid notification: {0}")]
    Decode(#[from] RecordError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for NotificationError {
    fn from(err: anyhow::Error) -> Self {
        NotificationError::DatabaseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn push(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn type_names_are_exact() {
        assert_eq!(
            NotificationType::from_name("APPOINTMENT_CONFIRMED"),
            Ok(NotificationType::AppointmentConfirmed)
        );
        assert_matches!(
            NotificationType::from_name("appointment_confirmed"),
            Err(RecordError::UnknownVariant { .. })
        );
        assert_matches!(
            NotificationType::from_name("PAYMENT_RECEIVED"),
            Err(RecordError::UnknownVariant { .. })
        );
    }

    #[test]
    fn record_round_trips() {
        let notification = Notification::new(
            NotificationType::AppointmentBooked,
            "New appointment request",
            "Grace booked 09:00",
            Some("apt-1".to_string()),
            1_700_000_000_000,
        );
        assert_eq!(Notification::from_map(&notification.to_map()).unwrap(), notification);
    }

    #[test]
    fn unknown_stored_type_fails_instead_of_defaulting() {
        let map = json!({ "id": "n1", "type": "SOMETHING_ELSE" }).as_object().cloned().unwrap();
        assert_matches!(Notification::from_map(&map), Err(RecordError::UnknownVariant { .. }));
    }

    #[test]
    fn empty_map_is_the_default_notification() {
        let notification = Notification::from_map(&RecordMap::new()).unwrap();
        assert_eq!(notification, Notification::default());
        assert_eq!(notification.kind, NotificationType::AppointmentBooked);

        let map = json!({ "id": "n1", "type": null }).as_object().cloned().unwrap();
        assert_eq!(Notification::from_map(&map).unwrap().kind, NotificationType::AppointmentBooked);
    }

    #[test]
    fn non_string_type_fails() {
        let map = json!({ "id": "n1", "type": 3 }).as_object().cloned().unwrap();
        assert_matches!(Notification::from_map(&map), Err(RecordError::UnknownVariant { .. }));
    }

    #[test]
    fn other_fields_stay_lenient() {
        let map = json!({ "type": "GENERAL", "timestamp": "soon", "isRead": "maybe" })
            .as_object()
            .cloned()
            .unwrap();
        let notification = Notification::from_map(&map).unwrap();
        assert_eq!(notification.timestamp, 0);
        assert!(!notification.is_read);
        assert_eq!(notification.title, "");
    }

    #[test]
    fn push_payload_decoding() {
        let notification = Notification::from_push(
            &push(&[("type", "APPOINTMENT_REMINDER"), ("body", "Tomorrow 09:00"), ("appointmentId", "apt-3")]),
            42,
        )
        .unwrap();
        assert_eq!(notification.kind, NotificationType::AppointmentReminder);
        assert_eq!(notification.title, "Appointment reminder");
        assert_eq!(notification.message, "Tomorrow 09:00");
        assert_eq!(notification.related_id.as_deref(), Some("apt-3"));
        assert!(!notification.is_read);
        assert_eq!(notification.timestamp, 42);

        assert_matches!(
            Notification::from_push(&push(&[("type", "Reminder")]), 42),
            Err(RecordError::UnknownVariant { .. })
        );
        assert_matches!(
            Notification::from_push(&push(&[("title", "hi")]), 42),
            Err(RecordError::MissingField("type"))
        );
    }

    #[test]
    fn serializes_type_by_name() {
        let notification = Notification::new(NotificationType::General, "t", "m", None, 1);
        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["type"], "GENERAL");
        assert_eq!(value["relatedId"], serde_json::Value::Null);
    }
}
