//! Modelos de garantía
//!
//! Packages list covered parts; buying a package for a vehicle creates one
//! `CustomerWarrantyPart` per covered part.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use super::audit::Audit;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WarrantyPackage {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub validity_months: i32,
    pub price: Decimal,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WarrantyPart {
    pub id: Uuid,
    pub warranty_package_id: Uuid,
    pub vehicle_part_id: Uuid,
    pub coverage_percentage: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "warranty_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarrantyStatus {
    Active,
    Expired,
    Void,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CustomerWarrantyPart {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub vehicle_id: Uuid,
    pub warranty_part_id: Uuid,
    pub vehicle_part_id: Uuid,
    pub install_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub status: WarrantyStatus,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl CustomerWarrantyPart {
    pub fn covers(&self, on: NaiveDate) -> bool {
        self.status == WarrantyStatus::Active
            && !self.audit.is_deleted
            && self.install_date <= on
            && on <= self.expiry_date
    }
}

/// Install date plus the validity period; day-of-month is clamped to the
/// last day of the target month (Jan 31 + 1 month → Feb 28/29).
pub fn compute_expiry(install_date: NaiveDate, validity_months: i32) -> Option<NaiveDate> {
    let months = u32::try_from(validity_months).ok()?;
    install_date.checked_add_months(Months::new(months))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_compute_expiry() {
        assert_eq!(compute_expiry(date(2025, 1, 15), 12), Some(date(2026, 1, 15)));
        assert_eq!(compute_expiry(date(2024, 1, 31), 1), Some(date(2024, 2, 29)));
        assert_eq!(compute_expiry(date(2025, 1, 31), 1), Some(date(2025, 2, 28)));
        assert_eq!(compute_expiry(date(2025, 1, 31), -1), None);
    }

    #[test]
    fn test_covers_window() {
        let part = CustomerWarrantyPart {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            warranty_part_id: Uuid::new_v4(),
            vehicle_part_id: Uuid::new_v4(),
            install_date: date(2025, 1, 1),
            expiry_date: date(2026, 1, 1),
            status: WarrantyStatus::Active,
            audit: Audit::new(None),
        };
        assert!(part.covers(date(2025, 6, 1)));
        assert!(part.covers(date(2026, 1, 1)));
        assert!(!part.covers(date(2026, 1, 2)));

        let expired = CustomerWarrantyPart { status: WarrantyStatus::Expired, ..part };
        assert!(!expired.covers(date(2025, 6, 1)));
    }
}
