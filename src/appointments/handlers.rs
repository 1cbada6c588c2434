use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, instrument};
use uuid::Uuid;

use crate::{
    appointments::{
        dto::{BookingWindowResponse, SlotResponse},
        repo,
    },
    auth::services::AuthUser,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/appointments/window", get(get_window))
        .route("/appointments/:id", get(get_appointment))
}

/// Date range the UI may offer for slot search: earliest bookable day
/// (never before today) through the last seeded day.
#[instrument(skip(state))]
pub async fn get_window(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> Result<Json<BookingWindowResponse>, (StatusCode, String)> {
    let window = repo::booking_window(&state.db).await.map_err(|e| {
        error!(error = %e, "booking_window failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let (min_day, max_day) =
        window.ok_or((StatusCode::NOT_FOUND, "No appointments available".to_string()))?;

    Ok(Json(BookingWindowResponse {
        min_day: min_day.to_string(),
        max_day: max_day.to_string(),
    }))
}

#[instrument(skip(state))]
pub async fn get_appointment(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SlotResponse>, (StatusCode, String)> {
    let appointment = repo::find_by_id(&state.db, id)
        .await
        .map_err(|e| {
            error!(error = %e, %id, "find_by_id failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::NOT_FOUND, "Appointment not found".to_string()))?;

    Ok(Json(SlotResponse::from(appointment)))
}
