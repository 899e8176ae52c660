//! Modelo de VehiclePart
//!
//! Inventory item. `current_quantity` never drops below zero; the database
//! enforces it with a CHECK and decrements are conditional.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::audit::Audit;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VehiclePart {
    pub id: Uuid,
    pub name: String,
    pub part_number: String,
    pub category_id: Uuid,
    pub vehicle_type_id: Option<Uuid>,
    pub current_quantity: i32,
    pub minimum_stock_level: i32,
    pub unit_price: Decimal,
    pub last_restock_date: Option<DateTime<Utc>>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl VehiclePart {
    pub fn is_low_stock(&self) -> bool {
        self.current_quantity <= self.minimum_stock_level
    }

    pub fn has_stock_for(&self, quantity: i32) -> bool {
        quantity > 0 && self.current_quantity >= quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(current: i32, minimum: i32) -> VehiclePart {
        VehiclePart {
            id: Uuid::new_v4(),
            name: "Brake pad".to_string(),
            part_number: "BRK-001".to_string(),
            category_id: Uuid::new_v4(),
            vehicle_type_id: None,
            current_quantity: current,
            minimum_stock_level: minimum,
            unit_price: Decimal::new(250_000, 0),
            last_restock_date: None,
            audit: Audit::new(None),
        }
    }

    #[test]
    fn test_low_stock_threshold_inclusive() {
        assert!(part(5, 5).is_low_stock());
        assert!(!part(6, 5).is_low_stock());
    }

    #[test]
    fn test_has_stock_for() {
        assert!(part(3, 0).has_stock_for(3));
        assert!(!part(3, 0).has_stock_for(4));
        assert!(!part(3, 0).has_stock_for(0));
    }
}
