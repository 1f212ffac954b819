pub mod dispatch;
pub mod notification;
pub mod publisher;

pub use dispatch::channel_for;
pub use notification::NotificationService;
pub use publisher::NotificationPublisher;
