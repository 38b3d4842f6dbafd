// libs/appointment-cell/src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StorageError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A booked slot. Persisted with the short field names of the data file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(rename = "name")]
    pub client_name: String,
    #[serde(rename = "phone")]
    pub client_phone: String,
    #[serde(rename = "barber")]
    pub provider_id: String,
    pub date: NaiveDate,
    #[serde(rename = "time")]
    pub time_slot: String,
}

impl Appointment {
    /// True when this appointment holds the `(provider, date, time)` slot.
    pub fn occupies(&self, provider_id: &str, date: NaiveDate, time_slot: &str) -> bool {
        self.provider_id == provider_id && self.date == date && self.time_slot == time_slot
    }

    pub fn belongs_to(&self, provider_id: &str) -> bool {
        self.provider_id == provider_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Account key used in storage, always lowercase.
    pub id: String,
    pub display_name: String,
}

impl Provider {
    pub fn from_id(id: &str) -> Self {
        let id = normalize_provider_id(id);
        Self {
            display_name: id.to_uppercase(),
            id,
        }
    }
}

pub fn normalize_provider_id(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

/// Raw booking input as the client form submits it.
///
/// `provider`, `time_slot` and `date` are optional because "nothing chosen
/// yet" is a state the form can be in; [`BookingService::book`] rejects it.
///
/// [`BookingService::book`]: crate::services::booking::BookingService::book
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_phone: String,
    /// Provider display name, e.g. `OUSSAMA`.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub time_slot: Option<String>,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogResponse {
    pub providers: Vec<Provider>,
    pub time_slots: Vec<String>,
}

/// Raised by a watcher when a provider's appointment count grew since the last check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAppointment {
    pub provider_id: String,
    pub previous_count: usize,
    pub current_count: usize,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    #[error("Fill all fields")]
    MissingNameOrPhone,

    #[error("Phone must be numbers with +")]
    InvalidPhone,

    #[error("Select barber and time")]
    MissingProviderOrTime,

    #[error("Select date")]
    MissingDate,

    #[error("Unknown barber: {0}")]
    UnknownProvider(String),

    #[error("Unknown time slot: {0}")]
    UnknownTimeSlot(String),

    #[error("Invalid date {0}, expected YYYY-MM-DD")]
    InvalidDate(String),
}

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationReason),

    #[error("Time already booked: {provider_id} on {date} at {time_slot}")]
    SlotConflict {
        provider_id: String,
        date: NaiveDate,
        time_slot: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Appointment {
        Appointment {
            client_name: "Ali".into(),
            client_phone: "+213555000111".into(),
            provider_id: "oussama".into(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            time_slot: "09:00".into(),
        }
    }

    #[test]
    fn serializes_with_data_file_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Ali",
                "phone": "+213555000111",
                "barber": "oussama",
                "date": "2024-06-01",
                "time": "09:00",
            })
        );
    }

    #[test]
    fn occupies_requires_all_three_keys() {
        let appointment = sample();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(appointment.occupies("oussama", date, "09:00"));
        assert!(!appointment.occupies("oussama", date, "09:30"));
        assert!(!appointment.occupies("zaki", date, "09:00"));
        assert!(!appointment.occupies("oussama", date.succ_opt().unwrap(), "09:00"));
    }

    #[test]
    fn provider_from_id_normalizes_case() {
        let provider = Provider::from_id(" Oussama ");
        assert_eq!(provider.id, "oussama");
        assert_eq!(provider.display_name, "OUSSAMA");
    }
}
