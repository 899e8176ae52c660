//! Modelo de Role

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::audit::Audit;

/// Built-in roles seeded by the initial migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleName {
    Admin,
    Staff,
    Technician,
    Customer,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "ADMIN",
            RoleName::Staff => "STAFF",
            RoleName::Technician => "TECHNICIAN",
            RoleName::Customer => "CUSTOMER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(RoleName::Admin),
            "STAFF" => Some(RoleName::Staff),
            "TECHNICIAN" => Some(RoleName::Technician),
            "CUSTOMER" => Some(RoleName::Customer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_name_roundtrip() {
        for role in [RoleName::Admin, RoleName::Staff, RoleName::Technician, RoleName::Customer] {
            assert_eq!(RoleName::parse(role.as_str()), Some(role));
        }
        assert_eq!(RoleName::parse("admin"), None);
    }
}
