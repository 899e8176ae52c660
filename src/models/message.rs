//! Modelos de mensajería
//!
//! Each customer has one conversation (keyed by `customer_id`) handled by at
//! most one active staff assignment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub sent_at: DateTime<Utc>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MessageAssignment {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub staff_id: Uuid,
    pub is_active: bool,
    pub assigned_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Active assignment count per staff member, used to pick the least loaded.
#[derive(Debug, Clone, FromRow)]
pub struct StaffLoad {
    pub staff_id: Uuid,
    pub active_count: i64,
}

/// Staff member with the fewest active conversations; ties go to the first.
pub fn least_loaded(loads: &[StaffLoad]) -> Option<Uuid> {
    loads
        .iter()
        .min_by_key(|load| load.active_count)
        .map(|load| load.staff_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_least_loaded() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let loads = vec![
            StaffLoad { staff_id: a, active_count: 3 },
            StaffLoad { staff_id: b, active_count: 1 },
            StaffLoad { staff_id: c, active_count: 1 },
        ];
        assert_eq!(least_loaded(&loads), Some(b));
        assert_eq!(least_loaded(&[]), None);
    }
}
