// libs/appointment-cell/src/services/booking.rs
use std::sync::{Arc, LazyLock};

use chrono::NaiveDate;
use regex::Regex;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use shared_config::AppConfig;
use shared_database::JsonFileStore;

use crate::models::{
    normalize_provider_id, Appointment, AppointmentError, BookAppointmentRequest, ValidationReason,
};
use crate::services::catalog::SlotCatalog;
use crate::services::events::{AppointmentEvent, AppointmentEventFeed};
use crate::services::store::AppointmentStore;

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?\d+$").expect("phone pattern compiles"));

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_PATTERN.is_match(phone)
}

/// The only writer of the appointment store.
///
/// Every read-check-write sequence runs under `write_lock`, so within one
/// process a slot can be handed out at most once.
pub struct BookingService {
    store: Arc<dyn AppointmentStore>,
    catalog: SlotCatalog,
    events: AppointmentEventFeed,
    write_lock: Mutex<()>,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        catalog: SlotCatalog,
        events: AppointmentEventFeed,
    ) -> Self {
        Self {
            store,
            catalog,
            events,
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        info!("Using appointment data file {}", config.data_file.display());
        Self::new(
            Arc::new(JsonFileStore::from_config(config)),
            SlotCatalog::default(),
            AppointmentEventFeed::default(),
        )
    }

    pub fn catalog(&self) -> &SlotCatalog {
        &self.catalog
    }

    pub fn events(&self) -> &AppointmentEventFeed {
        &self.events
    }

    /// Checks a request without touching storage and builds the record it would create.
    ///
    /// Checks run in form order so the first problem the user sees is the
    /// first field they need to fix.
    pub fn validate(
        &self,
        request: &BookAppointmentRequest,
    ) -> Result<Appointment, ValidationReason> {
        if request.client_name.is_empty() || request.client_phone.is_empty() {
            return Err(ValidationReason::MissingNameOrPhone);
        }

        if !is_valid_phone(&request.client_phone) {
            return Err(ValidationReason::InvalidPhone);
        }

        let (provider, time_slot) =
            match (non_empty(&request.provider), non_empty(&request.time_slot)) {
                (Some(provider), Some(time_slot)) => (provider, time_slot),
                _ => return Err(ValidationReason::MissingProviderOrTime),
            };

        let date = non_empty(&request.date).ok_or(ValidationReason::MissingDate)?;

        let provider = self
            .catalog
            .resolve_display_name(provider)
            .ok_or_else(|| ValidationReason::UnknownProvider(provider.to_string()))?;

        if !self.catalog.contains_slot(time_slot) {
            return Err(ValidationReason::UnknownTimeSlot(time_slot.to_string()));
        }

        let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|_| ValidationReason::InvalidDate(date.to_string()))?;

        Ok(Appointment {
            client_name: request.client_name.clone(),
            client_phone: request.client_phone.clone(),
            provider_id: provider.id.clone(),
            date,
            time_slot: time_slot.to_string(),
        })
    }

    #[instrument(
        skip(self, request),
        fields(provider = ?request.provider, date = ?request.date, time = ?request.time_slot)
    )]
    pub async fn book(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let candidate = self.validate(&request).map_err(|reason| {
            debug!("Rejected booking request: {}", reason);
            reason
        })?;

        {
            let _guard = self.write_lock.lock().await;

            let mut appointments = self.store.load_all().await?;
            let taken = appointments.iter().any(|a| {
                a.occupies(&candidate.provider_id, candidate.date, &candidate.time_slot)
            });

            if taken {
                warn!(
                    "Slot {} {} already booked for {}",
                    candidate.date, candidate.time_slot, candidate.provider_id
                );
                return Err(AppointmentError::SlotConflict {
                    provider_id: candidate.provider_id,
                    date: candidate.date,
                    time_slot: candidate.time_slot,
                });
            }

            appointments.push(candidate.clone());
            self.store.replace_all(&appointments).await?;
        }

        info!(
            "Booked {} {} with {}",
            candidate.date, candidate.time_slot, candidate.provider_id
        );
        self.events.publish(AppointmentEvent::Booked {
            appointment: candidate.clone(),
        });

        Ok(candidate)
    }

    /// Removes the first record structurally equal to `appointment`.
    ///
    /// Returns `false` and writes nothing when no such record exists.
    #[instrument(
        skip(self, appointment),
        fields(
            provider = %appointment.provider_id,
            date = %appointment.date,
            time = %appointment.time_slot
        )
    )]
    pub async fn cancel(&self, appointment: &Appointment) -> Result<bool, AppointmentError> {
        {
            let _guard = self.write_lock.lock().await;

            let mut appointments = self.store.load_all().await?;
            let Some(position) = appointments.iter().position(|a| a == appointment) else {
                debug!("Appointment already absent, nothing to cancel");
                return Ok(false);
            };

            appointments.remove(position);
            self.store.replace_all(&appointments).await?;
        }

        info!(
            "Cancelled {} {} with {}",
            appointment.date, appointment.time_slot, appointment.provider_id
        );
        self.events.publish(AppointmentEvent::Cancelled {
            appointment: appointment.clone(),
        });

        Ok(true)
    }

    /// The provider's appointments in store order.
    pub async fn list_for(&self, provider_id: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let provider_id = normalize_provider_id(provider_id);
        let appointments = self.store.load_all().await?;

        Ok(appointments
            .into_iter()
            .filter(|a| a.belongs_to(&provider_id))
            .collect())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service() -> BookingService {
        BookingService::new(
            Arc::new(JsonFileStore::new("unused.json")),
            SlotCatalog::default(),
            AppointmentEventFeed::default(),
        )
    }

    fn request() -> BookAppointmentRequest {
        BookAppointmentRequest {
            client_name: "Ali".into(),
            client_phone: "+213555000111".into(),
            provider: Some("OUSSAMA".into()),
            time_slot: Some("09:00".into()),
            date: Some("2024-06-01".into()),
        }
    }

    #[test]
    fn phone_pattern() {
        assert!(is_valid_phone("+213555123456"));
        assert!(is_valid_phone("0555123456"));
        assert!(!is_valid_phone("abc123"));
        assert!(!is_valid_phone(""));
        assert!(!is_valid_phone("+"));
        assert!(!is_valid_phone("0555 123 456"));
        assert!(!is_valid_phone("++213"));
    }

    #[test]
    fn valid_request_resolves_provider_id() {
        let appointment = service().validate(&request()).unwrap();
        assert_eq!(appointment.provider_id, "oussama");
        assert_eq!(appointment.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(appointment.time_slot, "09:00");
    }

    #[test]
    fn empty_name_wins_over_every_later_problem() {
        let bad = BookAppointmentRequest {
            client_name: String::new(),
            client_phone: "abc".into(),
            provider: None,
            time_slot: None,
            date: None,
        };
        assert_eq!(service().validate(&bad), Err(ValidationReason::MissingNameOrPhone));
    }

    #[test]
    fn checks_run_in_form_order() {
        let service = service();

        let mut r = request();
        r.client_phone = "abc123".into();
        r.provider = None;
        assert_eq!(service.validate(&r), Err(ValidationReason::InvalidPhone));

        let mut r = request();
        r.time_slot = Some(String::new());
        r.date = None;
        assert_eq!(service.validate(&r), Err(ValidationReason::MissingProviderOrTime));

        let mut r = request();
        r.date = None;
        r.provider = Some("NOBODY".into());
        assert_eq!(service.validate(&r), Err(ValidationReason::MissingDate));
    }

    #[test]
    fn rejects_values_outside_the_catalog() {
        let service = service();

        let mut r = request();
        r.provider = Some("NOBODY".into());
        assert_matches!(
            service.validate(&r),
            Err(ValidationReason::UnknownProvider(name)) if name == "NOBODY"
        );

        let mut r = request();
        r.time_slot = Some("12:30".into());
        assert_matches!(service.validate(&r), Err(ValidationReason::UnknownTimeSlot(_)));

        let mut r = request();
        r.date = Some("01/06/2024".into());
        assert_matches!(service.validate(&r), Err(ValidationReason::InvalidDate(_)));
    }
}
