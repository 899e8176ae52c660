//! Modelo de User
//!
//! Users hold credentials; their roles live in the `user_roles` join table.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::audit::Audit;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl User {
    /// Deleted or deactivated accounts cannot authenticate.
    pub fn can_login(&self) -> bool {
        self.is_active && !self.audit.is_deleted
    }
}
