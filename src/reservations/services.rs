use sqlx::PgPool;
use time::macros::time;
use time::{Date, OffsetDateTime, Time, UtcOffset};
use tracing::{debug, info};
use uuid::Uuid;

use crate::appointments::repo as appointments_repo;
use crate::appointments::repo::Appointment;
use crate::reservations::repo::{self, Reservation};

/// Why a booking attempt was denied.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Appointment not found")]
    AppointmentNotFound,
    #[error("You already have a reservation that day")]
    DayAlreadyBooked,
    #[error("That time slot is already taken")]
    SlotTaken,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Time-of-day bounds for an availability search. Missing bounds widen to the
/// whole day; reversed bounds are swapped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Time,
    pub end: Time,
}

impl TimeWindow {
    pub fn normalize(start: Option<Time>, end: Option<Time>) -> Self {
        let start = start.unwrap_or(Time::MIDNIGHT);
        let end = end.unwrap_or(time!(23:59:59));
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }
}

/// UTC calendar day a slot falls on. The one-reservation-per-day rule is
/// defined over this day.
pub fn slot_day_utc(at: OffsetDateTime) -> Date {
    at.to_offset(UtcOffset::UTC).date()
}

/// Free slots on `day` within `window` for this user.
#[derive(Debug)]
pub struct Availability {
    /// The user already holds a reservation on this day, so the whole day is
    /// ineligible regardless of what is free.
    pub day_unavailable: bool,
    pub slots: Vec<Appointment>,
}

impl Availability {
    /// The whole day is off the table for this user; no slots are offered.
    pub fn day_excluded() -> Self {
        Self {
            day_unavailable: true,
            slots: Vec::new(),
        }
    }

    /// The day is eligible; `slots` may still be empty if nothing is free.
    pub fn open(slots: Vec<Appointment>) -> Self {
        Self {
            day_unavailable: false,
            slots,
        }
    }
}

/// Denial precedence for a booking attempt: the user's existing reservation
/// on the day is reported before the slot being taken.
fn deny_reason(day_already_booked: bool, slot_taken: bool) -> Option<BookingError> {
    if day_already_booked {
        Some(BookingError::DayAlreadyBooked)
    } else if slot_taken {
        Some(BookingError::SlotTaken)
    } else {
        None
    }
}

pub async fn search_available(
    db: &PgPool,
    user_id: Uuid,
    day: Date,
    window: TimeWindow,
) -> anyhow::Result<Availability> {
    if repo::user_has_reservation_on(db, user_id, day).await? {
        debug!(%user_id, %day, "day excluded, user already booked");
        return Ok(Availability::day_excluded());
    }

    let from = day.with_time(window.start).assume_utc();
    let to = day.with_time(window.end).assume_utc();
    let slots = appointments_repo::list_unreserved_between(db, from, to).await?;
    Ok(Availability::open(slots))
}

/// The booking decision. The insert itself is a single conditional write
/// backed by unique constraints; the checks around it exist to name the
/// denial reason, not to guarantee anything.
pub async fn book(
    db: &PgPool,
    user_id: Uuid,
    appointment_id: Uuid,
) -> Result<(Reservation, Appointment), BookingError> {
    let appointment = appointments_repo::find_by_id(db, appointment_id)
        .await?
        .ok_or(BookingError::AppointmentNotFound)?;

    let day = slot_day_utc(appointment.slot_at);
    let day_conflict = repo::user_has_reservation_on(db, user_id, day).await?;
    let taken = repo::slot_is_taken(db, appointment_id).await?;
    if let Some(denied) = deny_reason(day_conflict, taken) {
        return Err(denied);
    }

    match repo::insert_if_free(db, user_id, appointment_id).await? {
        Some(reservation) => {
            info!(%user_id, %appointment_id, reservation_id = %reservation.id, "reservation created");
            Ok((reservation, appointment))
        }
        // Lost a race after the pre-checks passed; the insert returning no
        // row means one of the two constraints fired, so re-diagnose with
        // the slot treated as taken.
        None => {
            let day_conflict = repo::user_has_reservation_on(db, user_id, day).await?;
            Err(deny_reason(day_conflict, true).unwrap_or(BookingError::SlotTaken))
        }
    }
}

#[cfg(test)]
mod window_tests {
    use super::*;
    use time::macros::time;

    #[test]
    fn defaults_cover_the_whole_day() {
        let w = TimeWindow::normalize(None, None);
        assert_eq!(w.start, Time::MIDNIGHT);
        assert_eq!(w.end, time!(23:59:59));
    }

    #[test]
    fn keeps_ordered_bounds() {
        let w = TimeWindow::normalize(Some(time!(09:00)), Some(time!(17:00)));
        assert_eq!(w.start, time!(09:00));
        assert_eq!(w.end, time!(17:00));
    }

    #[test]
    fn swaps_reversed_bounds() {
        let w = TimeWindow::normalize(Some(time!(17:00)), Some(time!(09:00)));
        assert_eq!(w.start, time!(09:00));
        assert_eq!(w.end, time!(17:00));
    }

    #[test]
    fn missing_start_defaults_to_midnight() {
        let w = TimeWindow::normalize(None, Some(time!(12:00)));
        assert_eq!(w.start, Time::MIDNIGHT);
        assert_eq!(w.end, time!(12:00));
    }
}

#[cfg(test)]
mod slot_day_tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn utc_timestamp_maps_to_its_date() {
        assert_eq!(slot_day_utc(datetime!(2026-09-03 13:30 UTC)), date!(2026-09-03));
    }

    #[test]
    fn offset_timestamp_is_converted_to_utc_first() {
        // 01:00 at +03:00 is still the previous day in UTC.
        assert_eq!(
            slot_day_utc(datetime!(2026-09-03 01:00 +03:00)),
            date!(2026-09-02)
        );
    }
}

#[cfg(test)]
mod availability_tests {
    use super::*;
    use time::macros::datetime;
    use uuid::Uuid;

    #[test]
    fn excluded_day_is_flagged_and_offers_nothing() {
        let a = Availability::day_excluded();
        assert!(a.day_unavailable);
        assert!(a.slots.is_empty());
    }

    #[test]
    fn open_day_with_no_free_slots_is_not_flagged() {
        // An empty result on an eligible day is a different answer than an
        // excluded day.
        let a = Availability::open(Vec::new());
        assert!(!a.day_unavailable);
        assert!(a.slots.is_empty());
    }

    #[test]
    fn open_day_carries_its_slots() {
        let a = Availability::open(vec![Appointment {
            id: Uuid::new_v4(),
            slot_at: datetime!(2026-09-03 13:30 UTC),
        }]);
        assert!(!a.day_unavailable);
        assert_eq!(a.slots.len(), 1);
    }
}

#[cfg(test)]
mod deny_reason_tests {
    use super::*;

    #[test]
    fn day_conflict_wins_over_taken_slot() {
        assert!(matches!(
            deny_reason(true, true),
            Some(BookingError::DayAlreadyBooked)
        ));
    }

    #[test]
    fn day_conflict_alone_denies_the_day() {
        assert!(matches!(
            deny_reason(true, false),
            Some(BookingError::DayAlreadyBooked)
        ));
    }

    #[test]
    fn taken_slot_alone_denies_the_slot() {
        assert!(matches!(deny_reason(false, true), Some(BookingError::SlotTaken)));
    }

    #[test]
    fn free_slot_on_a_free_day_is_allowed() {
        assert!(deny_reason(false, false).is_none());
    }
}

#[cfg(test)]
mod booking_error_tests {
    use super::*;

    #[test]
    fn denial_messages_are_user_facing() {
        assert_eq!(
            BookingError::DayAlreadyBooked.to_string(),
            "You already have a reservation that day"
        );
        assert_eq!(
            BookingError::SlotTaken.to_string(),
            "That time slot is already taken"
        );
    }
}
