// libs/appointment-cell/src/state.rs
use std::sync::Arc;

use shared_config::AppConfig;

use crate::services::booking::BookingService;
use crate::services::credentials::{CredentialLookup, StaticCredentials};
use crate::services::watcher::WatcherService;

/// Everything the appointment routes share across requests.
#[derive(Clone)]
pub struct AppointmentState {
    pub booking: Arc<BookingService>,
    pub watchers: WatcherService,
    pub credentials: Arc<dyn CredentialLookup>,
}

impl AppointmentState {
    pub fn new(
        config: &AppConfig,
        booking: Arc<BookingService>,
        credentials: Arc<dyn CredentialLookup>,
    ) -> Self {
        let watchers = WatcherService::new(Arc::clone(&booking), config.watcher_poll_interval);
        Self {
            booking,
            watchers,
            credentials,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let booking = Arc::new(BookingService::from_config(config));
        let credentials = Arc::new(StaticCredentials::from_config(config));
        Self::new(config, booking, credentials)
    }
}
