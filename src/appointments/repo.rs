use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// A bookable time slot. Created by seeding, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub slot_at: OffsetDateTime,
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Appointment>> {
    let appointment = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT id, slot_at
        FROM appointments
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(appointment)
}

/// Earliest and latest slot days in the catalog, as UTC dates. The lower end
/// is clamped to today since nothing in the past is bookable.
pub async fn booking_window(db: &PgPool) -> anyhow::Result<Option<(Date, Date)>> {
    let row: (Option<OffsetDateTime>, Option<OffsetDateTime>) =
        sqlx::query_as(r#"SELECT MIN(slot_at), MAX(slot_at) FROM appointments"#)
            .fetch_one(db)
            .await?;

    let (Some(min_at), Some(max_at)) = row else {
        return Ok(None);
    };

    let today = OffsetDateTime::now_utc().date();
    let min_day = min_at.date().max(today);
    Ok(Some((min_day, max_at.date())))
}

/// Slots in `[from, to]` that no reservation claims, ordered by time.
pub async fn list_unreserved_between(
    db: &PgPool,
    from: OffsetDateTime,
    to: OffsetDateTime,
) -> anyhow::Result<Vec<Appointment>> {
    let rows = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT a.id, a.slot_at
        FROM appointments a
        WHERE a.slot_at >= $1
          AND a.slot_at <= $2
          AND NOT EXISTS (
              SELECT 1 FROM reservations r WHERE r.appointment_id = a.id
          )
        ORDER BY a.slot_at
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
