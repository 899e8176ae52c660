//! Modelos de mantenimiento
//!
//! A `MaintenanceManagement` is the work order for one service type on an
//! appointment; its `MaintenanceRecord`s are the parts consumed.
//!
//! Status machine: `PENDING → IN_PROGRESS → COMPLETED`, nothing else.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use super::audit::Audit;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "maintenance_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceStatus {
    Pending,
    InProgress,
    Completed,
}

impl MaintenanceStatus {
    pub fn can_transition_to(self, next: MaintenanceStatus) -> bool {
        matches!(
            (self, next),
            (MaintenanceStatus::Pending, MaintenanceStatus::InProgress)
                | (MaintenanceStatus::InProgress, MaintenanceStatus::Completed)
        )
    }

    /// Records and costs are frozen once the work order is completed.
    pub fn is_editable(self) -> bool {
        self != MaintenanceStatus::Completed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MaintenanceManagement {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub service_type_id: Uuid,
    pub technician_id: Option<Uuid>,
    pub status: MaintenanceStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub labor_cost: Decimal,
    pub parts_cost: Decimal,
    pub total_cost: Decimal,
    pub notes: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MaintenanceRecord {
    pub id: Uuid,
    pub maintenance_management_id: Uuid,
    pub vehicle_part_id: Uuid,
    pub quantity_used: i32,
    pub unit_price: Decimal,
    pub warranty_covered: bool,
    pub coverage_percentage: i32,
    pub approved_by_customer: bool,
    pub notes: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl MaintenanceRecord {
    /// Amount billed for this line. Unapproved lines are not charged.
    pub fn charge(&self) -> Decimal {
        if !self.approved_by_customer {
            return Decimal::ZERO;
        }
        line_charge(self.quantity_used, self.unit_price, self.coverage_percentage)
    }
}

/// `quantity × unit_price × (100 − coverage) / 100`, rounded half-up to cents.
pub fn line_charge(quantity: i32, unit_price: Decimal, coverage_percentage: i32) -> Decimal {
    let coverage = coverage_percentage.clamp(0, 100);
    let payable = Decimal::from(100 - coverage) / Decimal::from(100);
    (Decimal::from(quantity) * unit_price * payable)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Cost rollup for a work order: `(parts_cost, total_cost)`.
pub fn compute_costs(labor_cost: Decimal, records: &[MaintenanceRecord]) -> (Decimal, Decimal) {
    let parts_cost: Decimal = records.iter().map(MaintenanceRecord::charge).sum();
    (parts_cost, labor_cost + parts_cost)
}

/// The appointment completes once every one of its work orders has.
pub fn all_completed(managements: &[MaintenanceManagement]) -> bool {
    !managements.is_empty()
        && managements
            .iter()
            .all(|m| m.status == MaintenanceStatus::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(quantity: i32, price: i64, coverage: i32, approved: bool) -> MaintenanceRecord {
        MaintenanceRecord {
            id: Uuid::new_v4(),
            maintenance_management_id: Uuid::new_v4(),
            vehicle_part_id: Uuid::new_v4(),
            quantity_used: quantity,
            unit_price: Decimal::from(price),
            warranty_covered: coverage > 0,
            coverage_percentage: coverage,
            approved_by_customer: approved,
            notes: None,
            audit: Audit::new(None),
        }
    }

    fn management(status: MaintenanceStatus) -> MaintenanceManagement {
        MaintenanceManagement {
            id: Uuid::new_v4(),
            appointment_id: Uuid::new_v4(),
            service_type_id: Uuid::new_v4(),
            technician_id: None,
            status,
            started_at: None,
            completed_at: None,
            labor_cost: Decimal::ZERO,
            parts_cost: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            notes: None,
            audit: Audit::new(None),
        }
    }

    #[test]
    fn test_status_machine() {
        use MaintenanceStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(Pending));
        assert!(!Completed.is_editable());
        assert!(InProgress.is_editable());
    }

    #[test]
    fn test_line_charge_with_coverage() {
        assert_eq!(line_charge(2, Decimal::from(150_000), 0), Decimal::from(300_000));
        assert_eq!(line_charge(2, Decimal::from(150_000), 50), Decimal::from(150_000));
        assert_eq!(line_charge(1, Decimal::from(99_999), 100), Decimal::ZERO);
        assert_eq!(line_charge(1, Decimal::new(1001, 2), 50), Decimal::new(501, 2));
    }

    #[test]
    fn test_compute_costs_skips_unapproved() {
        let records = vec![
            record(2, 100_000, 0, true),
            record(1, 500_000, 0, false),
            record(4, 50_000, 25, true),
        ];
        let (parts, total) = compute_costs(Decimal::from(200_000), &records);
        assert_eq!(parts, Decimal::from(350_000));
        assert_eq!(total, Decimal::from(550_000));
    }

    #[test]
    fn test_all_completed() {
        assert!(!all_completed(&[]));
        assert!(all_completed(&[management(MaintenanceStatus::Completed)]));
        assert!(!all_completed(&[
            management(MaintenanceStatus::Completed),
            management(MaintenanceStatus::InProgress),
        ]));
    }
}
