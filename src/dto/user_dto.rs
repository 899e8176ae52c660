use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::user::User;

// Alta de usuario por un administrador
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(custom = "crate::utils::validation::validate_password")]
    pub password: String,
    #[validate(length(min = 2, max = 150))]
    pub full_name: String,
    #[validate(custom = "crate::utils::validation::validate_phone")]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(min = 1))]
    pub role_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 2, max = 150))]
    pub full_name: Option<String>,
    #[validate(custom = "crate::utils::validation::validate_phone")]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignRolesRequest {
    #[validate(length(min = 1))]
    pub role_ids: Vec<Uuid>,
}

// Response de usuario (sin password)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_user(user: User, roles: Vec<String>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            address: user.address,
            is_active: user.is_active,
            is_deleted: user.audit.is_deleted,
            roles,
            created_at: user.audit.created_at,
        }
    }
}
