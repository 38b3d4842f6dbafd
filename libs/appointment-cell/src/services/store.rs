// libs/appointment-cell/src/services/store.rs
use async_trait::async_trait;

use shared_database::{JsonFileStore, StorageError};

use crate::models::Appointment;

/// Durable home of the appointment collection.
///
/// Implementations hold no cache; each call reflects the medium as it is now.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<Appointment>, StorageError>;

    async fn replace_all(&self, appointments: &[Appointment]) -> Result<(), StorageError>;
}

#[async_trait]
impl AppointmentStore for JsonFileStore {
    async fn load_all(&self) -> Result<Vec<Appointment>, StorageError> {
        JsonFileStore::load_all::<Appointment>(self).await
    }

    async fn replace_all(&self, appointments: &[Appointment]) -> Result<(), StorageError> {
        JsonFileStore::replace_all(self, appointments).await
    }
}
