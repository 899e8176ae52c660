use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::audit::Audit;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VehiclePartCategory {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}
