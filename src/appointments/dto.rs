use serde::Serialize;
use time::macros::format_description;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::appointments::repo::Appointment;

#[derive(Debug, Serialize)]
pub struct SlotResponse {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub slot_at: OffsetDateTime,
    /// Human-readable slot time, e.g. "Thursday, September 3, 2026 at 1:30 PM".
    pub label: String,
}

impl From<Appointment> for SlotResponse {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            slot_at: a.slot_at,
            label: format_slot_label(a.slot_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingWindowResponse {
    pub min_day: String,
    pub max_day: String,
}

pub(crate) fn format_slot_label(at: OffsetDateTime) -> String {
    let fmt = format_description!(
        "[weekday repr:long], [month repr:long] [day padding:none], [year] at \
         [hour repr:12 padding:none]:[minute] [period]"
    );
    at.format(&fmt).unwrap_or_else(|_| at.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn slot_label_is_human_readable() {
        let at = datetime!(2026-09-03 13:30 UTC);
        assert_eq!(
            format_slot_label(at),
            "Thursday, September 3, 2026 at 1:30 PM"
        );
    }

    #[test]
    fn slot_label_morning_slot() {
        let at = datetime!(2026-09-07 09:00 UTC);
        assert_eq!(format_slot_label(at), "Monday, September 7, 2026 at 9:00 AM");
    }
}
