use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(custom = "crate::utils::validation::validate_role_name")]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(custom = "crate::utils::validation::validate_role_name")]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}
