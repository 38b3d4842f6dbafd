// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::state::AppointmentState;

pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    let client_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/catalog", get(handlers::get_catalog));

    let provider_routes = Router::new()
        .route("/providers/login", post(handlers::provider_login))
        .route("/providers/{provider_id}", get(handlers::list_provider_appointments))
        .route("/providers/{provider_id}/cancel", post(handlers::cancel_provider_appointment))
        .route("/providers/{provider_id}/events", get(handlers::provider_events));

    Router::new()
        .merge(client_routes)
        .merge(provider_routes)
        .with_state(state)
}
