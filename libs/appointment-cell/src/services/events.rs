// libs/appointment-cell/src/services/events.rs
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::Appointment;

pub const DEFAULT_FEED_CAPACITY: usize = 256;

pub type AppointmentEventReceiver = broadcast::Receiver<AppointmentEvent>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppointmentEvent {
    Booked { appointment: Appointment },
    Cancelled { appointment: Appointment },
}

impl AppointmentEvent {
    pub fn appointment(&self) -> &Appointment {
        match self {
            AppointmentEvent::Booked { appointment }
            | AppointmentEvent::Cancelled { appointment } => appointment,
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.appointment().provider_id
    }
}

/// In-process fan-out of store mutations.
///
/// Cloning shares the same channel. Publishing with nobody listening is fine;
/// the watchers still reconcile on their own timer.
#[derive(Debug, Clone)]
pub struct AppointmentEventFeed {
    sender: broadcast::Sender<AppointmentEvent>,
}

impl Default for AppointmentEventFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

impl AppointmentEventFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> AppointmentEventReceiver {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Returns how many subscribers the event reached.
    pub fn publish(&self, event: AppointmentEvent) -> usize {
        let provider_id = event.provider_id().to_string();
        match self.sender.send(event) {
            Ok(delivered) => {
                debug!(
                    "Published appointment event for {} to {} subscribers",
                    provider_id, delivered
                );
                delivered
            }
            Err(_) => {
                debug!("No subscribers for appointment event on {}", provider_id);
                0
            }
        }
    }
}
