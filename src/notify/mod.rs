pub mod message;
pub mod ntfy;

use async_trait::async_trait;
use message::Notification;

/// Push channel for per-repository and end-of-run notifications.
///
/// Never errors: transport or service failures come back as `false`.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> bool;
}
