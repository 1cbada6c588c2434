use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    appointments::dto::SlotResponse,
    auth::services::AuthUser,
    reservations::{
        dto::{
            parse_day, parse_time_of_day, AvailabilityResponse, AvailableQuery, BookRequest,
            ReservationResponse,
        },
        repo,
        services::{self, BookingError, TimeWindow},
    },
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/appointments/available", get(search_available))
        .route("/reservations", get(list_my_reservations))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/reservations", post(book))
        .route("/reservations/:id", delete(cancel))
}

/// Status for a denied booking: unknown slot is 404, either conflict is 409.
fn denial_response(e: &BookingError) -> (StatusCode, String) {
    let status = match e {
        BookingError::AppointmentNotFound => StatusCode::NOT_FOUND,
        BookingError::DayAlreadyBooked | BookingError::SlotTaken => StatusCode::CONFLICT,
        BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

#[instrument(skip(state))]
pub async fn search_available(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<AvailableQuery>,
) -> Result<Json<AvailabilityResponse>, (StatusCode, String)> {
    let day = parse_day(&q.day).map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;
    let start = q
        .start_time
        .as_deref()
        .map(parse_time_of_day)
        .transpose()
        .map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;
    let end = q
        .end_time
        .as_deref()
        .map(parse_time_of_day)
        .transpose()
        .map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;

    let window = TimeWindow::normalize(start, end);
    let availability = services::search_available(&state.db, user_id, day, window)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, %day, "availability search failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(Json(AvailabilityResponse {
        day: day.to_string(),
        day_unavailable: availability.day_unavailable,
        slots: availability
            .slots
            .into_iter()
            .map(SlotResponse::from)
            .collect(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn book(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<BookRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), (StatusCode, String)> {
    let (reservation, appointment) =
        match services::book(&state.db, user_id, payload.appointment_id).await {
            Ok(pair) => pair,
            Err(BookingError::Internal(e)) => {
                error!(error = %e, %user_id, "booking failed");
                return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
            }
            Err(e) => {
                warn!(%user_id, appointment_id = %payload.appointment_id, reason = %e, "booking denied");
                return Err(denial_response(&e));
            }
        };

    Ok((
        StatusCode::CREATED,
        Json(ReservationResponse::from(repo::ReservationSlot {
            id: reservation.id,
            appointment_id: appointment.id,
            slot_at: appointment.slot_at,
            created_at: reservation.created_at,
        })),
    ))
}

#[instrument(skip(state))]
pub async fn list_my_reservations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ReservationResponse>>, (StatusCode, String)> {
    let rows = repo::list_for_user(&state.db, user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "list_for_user failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(rows.into_iter().map(ReservationResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = repo::delete_owned(&state.db, user_id, id).await.map_err(|e| {
        error!(error = %e, %user_id, reservation_id = %id, "delete failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    if !deleted {
        return Err((StatusCode::NOT_FOUND, "Reservation not found".into()));
    }

    info!(%user_id, reservation_id = %id, "reservation cancelled");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn denial_response_maps_unknown_slot_to_404() {
        let (status, msg) = denial_response(&BookingError::AppointmentNotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(msg, "Appointment not found");
    }

    #[test]
    fn denial_response_maps_conflicts_to_409() {
        let (status, _) = denial_response(&BookingError::DayAlreadyBooked);
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = denial_response(&BookingError::SlotTaken);
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn availability_response_serialization() {
        let response = AvailabilityResponse {
            day: "2026-09-03".into(),
            day_unavailable: true,
            slots: vec![],
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"day_unavailable\":true"));
        assert!(json.contains("\"slots\":[]"));
    }

    #[test]
    fn reservation_response_carries_label() {
        let response = ReservationResponse::from(crate::reservations::repo::ReservationSlot {
            id: Uuid::new_v4(),
            appointment_id: Uuid::new_v4(),
            slot_at: datetime!(2026-09-03 13:30 UTC),
            created_at: datetime!(2026-09-01 08:00 UTC),
        });
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("Thursday, September 3, 2026 at 1:30 PM"));
    }
}
