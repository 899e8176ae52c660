//! Modelo de Shift
//!
//! Technician working interval `[start_time, end_time)`, optionally tied to
//! an appointment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use super::audit::Audit;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "shift_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl ShiftStatus {
    /// Shifts that still occupy the technician's time.
    pub fn blocks_availability(self) -> bool {
        self != ShiftStatus::Cancelled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Shift {
    pub id: Uuid,
    pub technician_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ShiftStatus,
    pub notes: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Shift {
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        intervals_overlap(self.start_time, self.end_time, start, end)
    }
}

/// Half-open interval overlap: touching endpoints do not conflict.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// First shift in `existing` that conflicts with `[start, end)`.
///
/// `exclude` skips the shift being edited.
pub fn find_conflict<'a>(
    existing: &'a [Shift],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> Option<&'a Shift> {
    existing.iter().find(|shift| {
        Some(shift.id) != exclude
            && !shift.audit.is_deleted
            && shift.status.blocks_availability()
            && shift.overlaps(start, end)
    })
}

/// Status a shift should have at `now`, or `None` when it is already right.
pub fn reconcile(
    status: ShiftStatus,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<ShiftStatus> {
    match status {
        ShiftStatus::Scheduled | ShiftStatus::InProgress if end <= now => {
            Some(ShiftStatus::Completed)
        }
        ShiftStatus::Scheduled if start <= now => Some(ShiftStatus::InProgress),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, hour, 0, 0).unwrap()
    }

    fn shift(start: u32, end: u32, status: ShiftStatus) -> Shift {
        Shift {
            id: Uuid::new_v4(),
            technician_id: Uuid::new_v4(),
            appointment_id: None,
            start_time: at(start),
            end_time: at(end),
            status,
            notes: None,
            audit: Audit::new(None),
        }
    }

    #[test]
    fn test_overlap_is_half_open() {
        assert!(intervals_overlap(at(8), at(10), at(9), at(11)));
        assert!(!intervals_overlap(at(8), at(10), at(10), at(12)));
        assert!(intervals_overlap(at(8), at(12), at(9), at(10)));
    }

    #[test]
    fn test_find_conflict_ignores_cancelled_and_excluded() {
        let cancelled = shift(8, 12, ShiftStatus::Cancelled);
        let active = shift(13, 15, ShiftStatus::Scheduled);
        let existing = vec![cancelled, active.clone()];

        assert!(find_conflict(&existing, at(9), at(11), None).is_none());
        assert_eq!(find_conflict(&existing, at(14), at(16), None).map(|s| s.id), Some(active.id));
        assert!(find_conflict(&existing, at(14), at(16), Some(active.id)).is_none());
    }

    #[test]
    fn test_reconcile() {
        let (start, end) = (at(8), at(12));
        assert_eq!(reconcile(ShiftStatus::Scheduled, start, end, at(7)), None);
        assert_eq!(
            reconcile(ShiftStatus::Scheduled, start, end, start),
            Some(ShiftStatus::InProgress)
        );
        assert_eq!(reconcile(ShiftStatus::InProgress, start, end, at(10)), None);
        assert_eq!(
            reconcile(ShiftStatus::InProgress, start, end, end),
            Some(ShiftStatus::Completed)
        );
        assert_eq!(
            reconcile(ShiftStatus::Scheduled, start, end, end + Duration::hours(1)),
            Some(ShiftStatus::Completed)
        );
        assert_eq!(reconcile(ShiftStatus::Cancelled, start, end, at(10)), None);
        assert_eq!(reconcile(ShiftStatus::Completed, start, end, at(13)), None);
    }
}
