use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use thiserror::Error;

use crate::{BookingData, UserData};

pub type SharedNotifier = Arc<dyn Notifier>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification channel unavailable: {0}")]
    Unavailable(String),
}

/// Something a participant gets told about
#[derive(Debug, Clone)]
pub enum Notification {
    /// A student requested a new booking
    BookingRequested { booking: BookingData },
}

/// Represents a type that can deliver notifications to users.
///
/// Deliveries are best-effort: callers fire them off the request path and log
/// failures instead of propagating them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        recipient: &UserData,
        notification: &Notification,
    ) -> Result<(), NotifyError>;
}

/// Default notifier that records deliveries in the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        recipient: &UserData,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        match notification {
            Notification::BookingRequested { booking } => {
                info!(
                    "Notifying {} about booking {} scheduled at {}",
                    recipient.email, booking.id, booking.scheduled_at
                );
            }
        }

        Ok(())
    }
}
