// libs/appointment-cell/src/services/watcher.rs
use std::future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast::error::RecvError, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::models::{normalize_provider_id, Appointment, NewAppointment};
use crate::services::booking::BookingService;
use crate::services::events::{AppointmentEvent, AppointmentEventReceiver};

/// What a provider dashboard hears from its watcher.
pub trait DashboardListener: Send + Sync + 'static {
    /// Fires at most once per check, only when the count grew.
    fn on_new_appointment(&self, notice: &NewAppointment);

    /// Fires after every successful check with the provider's current list.
    fn on_refresh(&self, _appointments: &[Appointment]) {}
}

impl<F> DashboardListener for F
where
    F: Fn(&NewAppointment) + Send + Sync + 'static,
{
    fn on_new_appointment(&self, notice: &NewAppointment) {
        self(notice)
    }
}

/// Count-delta growth detection.
///
/// The first observation only anchors the baseline. After that, a check
/// reports growth when the count is above the previous one, and every check
/// re-anchors, so a drop lowers the bar for the next increase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeDetector {
    previous_count: Option<usize>,
}

impl ChangeDetector {
    pub fn anchored(count: usize) -> Self {
        Self {
            previous_count: Some(count),
        }
    }

    pub fn baseline(&self) -> Option<usize> {
        self.previous_count
    }

    pub fn observe(&mut self, current_count: usize) -> bool {
        let grew = matches!(self.previous_count, Some(previous) if current_count > previous);
        self.previous_count = Some(current_count);
        grew
    }
}

/// Spawns one watcher task per dashboard session.
#[derive(Clone)]
pub struct WatcherService {
    booking: Arc<BookingService>,
    poll_interval: Duration,
}

impl WatcherService {
    pub fn new(booking: Arc<BookingService>, poll_interval: Duration) -> Self {
        Self {
            booking,
            poll_interval,
        }
    }

    /// Starts watching `provider_id`. The baseline count is read before this
    /// returns, so every later booking for the provider is reported. The watch
    /// lasts until the handle is cancelled or dropped.
    pub async fn subscribe_to_changes(
        &self,
        provider_id: &str,
        listener: Arc<dyn DashboardListener>,
    ) -> SubscriptionHandle {
        let id = Uuid::new_v4();
        let provider_id = normalize_provider_id(provider_id);
        let (stop_tx, stop_rx) = oneshot::channel();

        // Subscribed ahead of the baseline read; bookings racing it re-check on their event.
        let feed = self.booking.events().subscribe();

        let watcher = ChangeWatcher {
            provider_id: provider_id.clone(),
            booking: Arc::clone(&self.booking),
            listener,
            poll_interval: self.poll_interval,
        };

        let span =
            tracing::info_span!("change_watcher", subscription = %id, provider = %provider_id);

        let mut detector = ChangeDetector::default();
        watcher.check(&mut detector).instrument(span.clone()).await;
        let first_poll = Instant::now() + self.poll_interval;

        let task = tokio::spawn(
            watcher
                .run(detector, first_poll, feed, stop_rx)
                .instrument(span),
        );

        info!("Started change watcher {} for {}", id, provider_id);

        SubscriptionHandle {
            id,
            provider_id,
            stop: Some(stop_tx),
            task: Some(task),
        }
    }
}

/// Keeps a watcher alive. Dropping it aborts the task; [`cancel`](Self::cancel)
/// stops it and waits until it has exited.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: Uuid,
    provider_id: String,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub async fn cancel(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Change watcher {} ended abnormally: {}", self.id, e);
            }
        }
        info!("Cancelled change watcher {} for {}", self.id, self.provider_id);
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Aborted change watcher {} for {}", self.id, self.provider_id);
        }
    }
}

struct ChangeWatcher {
    provider_id: String,
    booking: Arc<BookingService>,
    listener: Arc<dyn DashboardListener>,
    poll_interval: Duration,
}

impl ChangeWatcher {
    async fn run(
        self,
        mut detector: ChangeDetector,
        first_poll: Instant,
        feed: AppointmentEventReceiver,
        mut stop: oneshot::Receiver<()>,
    ) {
        let mut ticker = time::interval_at(first_poll, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut feed = Some(feed);

        loop {
            tokio::select! {
                biased;

                _ = &mut stop => {
                    debug!("Stop requested");
                    break;
                }
                _ = ticker.tick() => {
                    self.check(&mut detector).await;
                }
                event = next_event(&mut feed) => match event {
                    Ok(event) if self.concerns(&event) => {
                        self.check(&mut detector).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event feed lagged by {} events, reconciling", skipped);
                        self.check(&mut detector).await;
                    }
                    Err(RecvError::Closed) => {
                        debug!("Event feed closed, falling back to polling only");
                        feed = None;
                    }
                },
            }
        }
    }

    fn concerns(&self, event: &AppointmentEvent) -> bool {
        event.provider_id() == self.provider_id
    }

    async fn check(&self, detector: &mut ChangeDetector) {
        let appointments = match self.booking.list_for(&self.provider_id).await {
            Ok(appointments) => appointments,
            Err(e) => {
                warn!("Skipping check, could not read appointments: {}", e);
                return;
            }
        };

        let previous_count = detector.baseline();
        let current_count = appointments.len();

        if detector.observe(current_count) {
            info!("New appointment for {} ({} total)", self.provider_id, current_count);
            self.listener.on_new_appointment(&NewAppointment {
                provider_id: self.provider_id.clone(),
                previous_count: previous_count.unwrap_or_default(),
                current_count,
            });
        }

        self.listener.on_refresh(&appointments);
    }
}

async fn next_event(
    feed: &mut Option<AppointmentEventReceiver>,
) -> Result<AppointmentEvent, RecvError> {
    match feed {
        Some(receiver) => receiver.recv().await,
        None => future::pending().await,
    }
}
