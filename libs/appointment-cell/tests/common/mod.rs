#![allow(dead_code)]

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::TempDir;

use appointment_cell::models::{Appointment, BookAppointmentRequest};
use appointment_cell::services::{
    AppointmentEventFeed, AppointmentStore, BookingService, SlotCatalog,
};
use shared_database::{JsonFileStore, StorageError};

/// Isolated data file plus a booking service writing to it.
pub struct TestEnv {
    pub dir: TempDir,
    pub store: Arc<JsonFileStore>,
    pub booking: Arc<BookingService>,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = Arc::new(JsonFileStore::new(dir.path().join("data.json")));
        let booking = Arc::new(BookingService::new(
            store.clone(),
            SlotCatalog::default(),
            AppointmentEventFeed::default(),
        ));

        Self { dir, store, booking }
    }

    pub fn data_file(&self) -> PathBuf {
        self.store.path().to_path_buf()
    }

    pub fn raw_contents(&self) -> Option<Vec<u8>> {
        std::fs::read(self.data_file()).ok()
    }

    /// Writes straight to the file, bypassing the booking service and its events.
    pub async fn write_behind_the_service(&self, appointments: &[Appointment]) {
        self.store
            .replace_all(appointments)
            .await
            .expect("seed data file");
    }

    pub async fn stored(&self) -> Vec<Appointment> {
        self.store
            .load_all::<Appointment>()
            .await
            .expect("read data file")
    }
}

pub fn request(
    name: &str,
    phone: &str,
    provider: &str,
    date: &str,
    time: &str,
) -> BookAppointmentRequest {
    BookAppointmentRequest {
        client_name: name.to_string(),
        client_phone: phone.to_string(),
        provider: Some(provider.to_string()),
        time_slot: Some(time.to_string()),
        date: Some(date.to_string()),
    }
}

pub fn ali_request(time: &str) -> BookAppointmentRequest {
    request("Ali", "+213555000111", "OUSSAMA", "2024-06-01", time)
}

pub fn appointment(provider_id: &str, date: &str, time: &str) -> Appointment {
    Appointment {
        client_name: "Client".to_string(),
        client_phone: "0555123456".to_string(),
        provider_id: provider_id.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("valid test date"),
        time_slot: time.to_string(),
    }
}

/// `count` distinct appointments for one provider on one day.
pub fn appointments_for(provider_id: &str, count: usize) -> Vec<Appointment> {
    SlotCatalog::default()
        .time_slots()
        .iter()
        .take(count)
        .map(|slot| appointment(provider_id, "2024-06-01", slot))
        .collect()
}

fn denied() -> StorageError {
    StorageError::Io {
        path: PathBuf::from("/denied/data.json"),
        source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
    }
}

/// Store whose medium can be neither read nor written.
pub struct UnreadableStore;

#[async_trait]
impl AppointmentStore for UnreadableStore {
    async fn load_all(&self) -> Result<Vec<Appointment>, StorageError> {
        Err(denied())
    }

    async fn replace_all(&self, _appointments: &[Appointment]) -> Result<(), StorageError> {
        Err(denied())
    }
}

/// Store that reads fine but rejects every write.
#[derive(Default)]
pub struct ReadOnlyStore {
    pub records: Mutex<Vec<Appointment>>,
}

impl ReadOnlyStore {
    pub fn with(records: Vec<Appointment>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl AppointmentStore for ReadOnlyStore {
    async fn load_all(&self) -> Result<Vec<Appointment>, StorageError> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn replace_all(&self, _appointments: &[Appointment]) -> Result<(), StorageError> {
        Err(denied())
    }
}

/// In-memory store, so watcher timing can run on a paused clock without file I/O.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Appointment>>,
}

impl MemoryStore {
    /// Replaces the records without going through the booking service.
    pub fn write_behind_the_service(&self, appointments: &[Appointment]) {
        *self.records.lock().unwrap() = appointments.to_vec();
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<Appointment>, StorageError> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn replace_all(&self, appointments: &[Appointment]) -> Result<(), StorageError> {
        *self.records.lock().unwrap() = appointments.to_vec();
        Ok(())
    }
}

pub fn service_over(store: Arc<dyn AppointmentStore>) -> Arc<BookingService> {
    Arc::new(BookingService::new(
        store,
        SlotCatalog::default(),
        AppointmentEventFeed::default(),
    ))
}
