// libs/appointment-cell/src/services/catalog.rs
use crate::models::{normalize_provider_id, CatalogResponse, Provider};

/// Provider accounts in the order the booking form lists them.
pub const DEFAULT_PROVIDER_IDS: [&str; 5] =
    ["khireeddine", "oussama", "zaki", "maztoule", "mounir"];

pub const DEFAULT_TIME_SLOTS: [&str; 15] = [
    "09:00", "09:30", "10:00", "10:30", "11:00", "11:30", "12:00", "14:00", "14:30", "15:00",
    "15:30", "16:00", "16:30", "17:00", "17:30",
];

/// Fixed reference data: who can be booked and when.
#[derive(Debug, Clone)]
pub struct SlotCatalog {
    providers: Vec<Provider>,
    time_slots: Vec<String>,
}

impl Default for SlotCatalog {
    fn default() -> Self {
        Self::new(
            DEFAULT_PROVIDER_IDS.iter().map(|id| Provider::from_id(id)).collect(),
            DEFAULT_TIME_SLOTS.iter().map(|slot| slot.to_string()).collect(),
        )
    }
}

impl SlotCatalog {
    pub fn new(providers: Vec<Provider>, time_slots: Vec<String>) -> Self {
        Self { providers, time_slots }
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn time_slots(&self) -> &[String] {
        &self.time_slots
    }

    /// Case-insensitive lookup from the name shown to clients.
    pub fn resolve_display_name(&self, display_name: &str) -> Option<&Provider> {
        let wanted = display_name.trim();
        self.providers
            .iter()
            .find(|p| p.display_name.eq_ignore_ascii_case(wanted))
    }

    pub fn provider(&self, provider_id: &str) -> Option<&Provider> {
        let wanted = normalize_provider_id(provider_id);
        self.providers.iter().find(|p| p.id == wanted)
    }

    pub fn display_name_for(&self, provider_id: &str) -> Option<&str> {
        self.provider(provider_id).map(|p| p.display_name.as_str())
    }

    pub fn contains_slot(&self, time_slot: &str) -> bool {
        self.time_slots.iter().any(|slot| slot == time_slot)
    }

    pub fn to_response(&self) -> CatalogResponse {
        CatalogResponse {
            providers: self.providers.clone(),
            time_slots: self.time_slots.clone(),
        }
    }
}
