//! Soft-delete flag and audit columns carried by every table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Audit {
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl Audit {
    /// Fresh audit block for rows built in memory.
    pub fn new(actor: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            is_deleted: false,
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        }
    }
}
