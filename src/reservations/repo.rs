use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// A user's claim on one appointment. `slot_day` is the UTC calendar day of
/// the slot, denormalized so `(user_id, slot_day)` can carry a unique
/// constraint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub appointment_id: Uuid,
    pub slot_day: Date,
    pub created_at: OffsetDateTime,
}

/// Reservation joined with its slot time, for listing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReservationSlot {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub slot_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

pub async fn user_has_reservation_on(
    db: &PgPool,
    user_id: Uuid,
    day: Date,
) -> anyhow::Result<bool> {
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM reservations WHERE user_id = $1 AND slot_day = $2
        )
        "#,
    )
    .bind(user_id)
    .bind(day)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

pub async fn slot_is_taken(db: &PgPool, appointment_id: Uuid) -> anyhow::Result<bool> {
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM reservations WHERE appointment_id = $1
        )
        "#,
    )
    .bind(appointment_id)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

/// Atomic conditional write: the insert succeeds only if neither the slot nor
/// the user's day is already claimed. Both rules are unique constraints, so a
/// raced double-booking resolves to exactly one winner; the loser gets `None`.
pub async fn insert_if_free(
    db: &PgPool,
    user_id: Uuid,
    appointment_id: Uuid,
) -> anyhow::Result<Option<Reservation>> {
    let reservation = sqlx::query_as::<_, Reservation>(
        r#"
        INSERT INTO reservations (user_id, appointment_id, slot_day)
        SELECT $1, a.id, (a.slot_at AT TIME ZONE 'UTC')::date
        FROM appointments a
        WHERE a.id = $2
        ON CONFLICT DO NOTHING
        RETURNING id, user_id, appointment_id, slot_day, created_at
        "#,
    )
    .bind(user_id)
    .bind(appointment_id)
    .fetch_optional(db)
    .await?;
    Ok(reservation)
}

/// All of a user's reservations with their slot times, soonest first.
pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<ReservationSlot>> {
    let rows = sqlx::query_as::<_, ReservationSlot>(
        r#"
        SELECT r.id, r.appointment_id, a.slot_at, r.created_at
        FROM reservations r
        JOIN appointments a ON a.id = r.appointment_id
        WHERE r.user_id = $1
        ORDER BY a.slot_at
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Delete a reservation only if it belongs to `user_id`. Returns whether a
/// row was removed.
pub async fn delete_owned(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM reservations WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}
