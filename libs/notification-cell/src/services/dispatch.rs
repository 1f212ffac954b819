use crate::models::{NotificationChannel, NotificationType};

/// Channel each notification type is surfaced on.
pub fn channel_for(kind: NotificationType) -> NotificationChannel {
    match kind {
        NotificationType::AppointmentBooked
        | NotificationType::AppointmentConfirmed
        | NotificationType::AppointmentCancelled
        | NotificationType::AppointmentCompleted => NotificationChannel::Appointments,
        NotificationType::AppointmentReminder => NotificationChannel::Reminders,
        NotificationType::General => NotificationChannel::General,
    }
}
