use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::appointments::dto::{format_slot_label, SlotResponse};
use crate::reservations::repo::ReservationSlot;

/// Query string for the availability search. Times are optional; days come in
/// as `YYYY-MM-DD`, times as `HH:MM` or `HH:MM:SS` (what an HTML time input
/// submits).
#[derive(Debug, Deserialize)]
pub struct AvailableQuery {
    pub day: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

pub(crate) fn parse_day(s: &str) -> Result<Date, String> {
    let fmt = format_description!("[year]-[month]-[day]");
    Date::parse(s, &fmt).map_err(|_| format!("Invalid day '{s}', expected YYYY-MM-DD"))
}

pub(crate) fn parse_time_of_day(s: &str) -> Result<Time, String> {
    let hms = format_description!("[hour]:[minute]:[second]");
    let hm = format_description!("[hour]:[minute]");
    Time::parse(s, &hms)
        .or_else(|_| Time::parse(s, &hm))
        .map_err(|_| format!("Invalid time '{s}', expected HH:MM or HH:MM:SS"))
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub day: String,
    /// True when the requesting user already holds a reservation on this day;
    /// `slots` is then empty no matter what is free.
    pub day_unavailable: bool,
    pub slots: Vec<SlotResponse>,
}

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub appointment_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    pub id: Uuid,
    pub appointment_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub slot_at: OffsetDateTime,
    pub label: String,
}

impl From<ReservationSlot> for ReservationResponse {
    fn from(r: ReservationSlot) -> Self {
        Self {
            id: r.id,
            appointment_id: r.appointment_id,
            slot_at: r.slot_at,
            label: format_slot_label(r.slot_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    #[test]
    fn parses_iso_day() {
        assert_eq!(parse_day("2026-09-03"), Ok(date!(2026-09-03)));
    }

    #[test]
    fn rejects_garbage_day() {
        assert!(parse_day("03/09/2026").is_err());
        assert!(parse_day("2026-13-01").is_err());
    }

    #[test]
    fn parses_times_with_and_without_seconds() {
        assert_eq!(parse_time_of_day("09:30"), Ok(time!(09:30)));
        assert_eq!(parse_time_of_day("09:30:15"), Ok(time!(09:30:15)));
    }

    #[test]
    fn rejects_out_of_range_time() {
        assert!(parse_time_of_day("25:00").is_err());
        assert!(parse_time_of_day("noonish").is_err());
    }
}
