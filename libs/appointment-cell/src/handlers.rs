// libs/appointment-cell/src/handlers.rs
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use shared_models::error::AppError;

use crate::models::{
    normalize_provider_id, Appointment, AppointmentError, BookAppointmentRequest, NewAppointment,
    Provider, ProviderLoginRequest,
};
use crate::services::watcher::DashboardListener;
use crate::state::AppointmentState;

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::Validation(reason) => AppError::ValidationError(reason.to_string()),
            AppointmentError::SlotConflict { .. } => AppError::Conflict(e.to_string()),
            AppointmentError::Storage(err) => {
                error!("Appointment storage failed: {}", err);
                AppError::Storage("Could not access appointment records".to_string())
            }
        }
    }
}

fn require_provider(state: &AppointmentState, provider_id: &str) -> Result<Provider, AppError> {
    state
        .booking
        .catalog()
        .provider(provider_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Unknown barber: {}", provider_id)))
}

// ==============================================================================
// CLIENT HANDLERS
// ==============================================================================

pub async fn get_catalog(State(state): State<Arc<AppointmentState>>) -> Json<Value> {
    Json(json!(state.booking.catalog().to_response()))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.book(request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment booked",
        "appointment": appointment,
    })))
}

// ==============================================================================
// PROVIDER DASHBOARD HANDLERS
// ==============================================================================

pub async fn provider_login(
    State(state): State<Arc<AppointmentState>>,
    Json(request): Json<ProviderLoginRequest>,
) -> Result<Json<Value>, AppError> {
    let provider_id = normalize_provider_id(&request.username);

    let provider = state
        .booking
        .catalog()
        .provider(&provider_id)
        .filter(|_| state.credentials.verify(&provider_id, &request.password))
        .ok_or_else(|| AppError::Auth("Wrong credentials".to_string()))?;

    info!("Barber {} logged in", provider.id);

    Ok(Json(json!({
        "success": true,
        "provider_id": provider.id,
        "display_name": provider.display_name,
    })))
}

pub async fn list_provider_appointments(
    State(state): State<Arc<AppointmentState>>,
    Path(provider_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let provider = require_provider(&state, &provider_id)?;
    let appointments = state.booking.list_for(&provider.id).await?;

    Ok(Json(json!({
        "provider_id": provider.id,
        "display_name": provider.display_name,
        "count": appointments.len(),
        "appointments": appointments,
    })))
}

/// Cancels one of the barber's appointments.
///
/// Login hands out no session, so the path segment is taken at its word: the
/// only check is that the record's barber matches `{provider_id}`. This guards
/// against mistakes, not against a caller who picks another barber's path.
#[axum::debug_handler]
pub async fn cancel_provider_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(provider_id): Path<String>,
    Json(mut appointment): Json<Appointment>,
) -> Result<Json<Value>, AppError> {
    let provider = require_provider(&state, &provider_id)?;

    appointment.provider_id = normalize_provider_id(&appointment.provider_id);
    if appointment.provider_id != provider.id {
        warn!("{} tried to cancel an appointment of {}", provider.id, appointment.provider_id);
        return Err(AppError::Auth(
            "Appointments can only be cancelled by their own barber".to_string(),
        ));
    }

    let removed = state.booking.cancel(&appointment).await?;

    Ok(Json(json!({
        "success": true,
        "removed": removed,
    })))
}

/// Live dashboard feed: `refresh` events carry the current list, and
/// `new_appointment` events signal growth. The watcher behind the stream
/// stops when the client disconnects.
pub async fn provider_events(
    State(state): State<Arc<AppointmentState>>,
    Path(provider_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let provider = require_provider(&state, &provider_id)?;

    let (tx, rx) = mpsc::channel(SSE_BUFFER);
    let handle = state
        .watchers
        .subscribe_to_changes(&provider.id, Arc::new(SseListener { tx }))
        .await;

    let events = stream::unfold((rx, handle), |(mut rx, handle)| async move {
        rx.recv()
            .await
            .map(|event| (Ok::<_, Infallible>(event), (rx, handle)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Events queued per SSE client before new ones are dropped.
const SSE_BUFFER: usize = 16;

struct SseListener {
    tx: mpsc::Sender<Event>,
}

impl SseListener {
    fn send<T: Serialize + ?Sized>(&self, name: &str, payload: &T) {
        let event = match Event::default().event(name).json_data(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!("Could not encode {} event: {}", name, e);
                return;
            }
        };

        match self.tx.try_send(event) {
            Ok(()) => {}
            // A slow client misses this one; the next refresh carries the full list again.
            Err(TrySendError::Full(_)) => debug!("SSE client lagging, dropped {} event", name),
            // Client left; the handle drop stops the watcher shortly.
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

impl DashboardListener for SseListener {
    fn on_new_appointment(&self, notice: &NewAppointment) {
        self.send("new_appointment", notice);
    }

    fn on_refresh(&self, appointments: &[Appointment]) {
        self.send("refresh", appointments);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_client_buffer_is_bounded() {
        let (tx, mut rx) = mpsc::channel(SSE_BUFFER);
        let listener = SseListener { tx };

        for _ in 0..SSE_BUFFER * 3 {
            listener.on_refresh(&[]);
        }

        let mut queued = 0;
        while rx.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, SSE_BUFFER);
    }

    #[test]
    fn send_after_client_left_is_ignored() {
        let (tx, rx) = mpsc::channel(SSE_BUFFER);
        drop(rx);
        SseListener { tx }.on_refresh(&[]);
    }
}
