use sqlx::PgPool;
use uuid::Uuid;

use crate::models::payment::{PaymentMethod, PaymentMethodType};
use crate::utils::errors::AppError;

pub struct PaymentMethodRepository {
    pool: PgPool,
}

impl PaymentMethodRepository {
    pub const TABLE: &'static str = "payment_methods";

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, method: &PaymentMethod) -> Result<PaymentMethod, AppError> {
        let created = sqlx::query_as::<_, PaymentMethod>(
            r#"
            INSERT INTO payment_methods (
                id, method_type, provider, description, is_active,
                is_deleted, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(method.id)
        .bind(method.method_type)
        .bind(&method.provider)
        .bind(&method.description)
        .bind(method.is_active)
        .bind(method.audit.is_deleted)
        .bind(method.audit.created_at)
        .bind(method.audit.created_by)
        .bind(method.audit.updated_at)
        .bind(method.audit.updated_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentMethod>, AppError> {
        let found = sqlx::query_as::<_, PaymentMethod>("SELECT * FROM payment_methods WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    /// First active method of a type, used to tag gateway and cash payments.
    pub async fn find_active_by_type(&self, method_type: PaymentMethodType) -> Result<Option<PaymentMethod>, AppError> {
        let found = sqlx::query_as::<_, PaymentMethod>(
            r#"
            SELECT * FROM payment_methods
            WHERE method_type = $1 AND is_active AND NOT is_deleted
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(method_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found)
    }

    pub async fn update(&self, method: &PaymentMethod) -> Result<PaymentMethod, AppError> {
        let updated = sqlx::query_as::<_, PaymentMethod>(
            r#"
            UPDATE payment_methods
            SET method_type = $2, provider = $3, description = $4, is_active = $5,
                updated_at = NOW(), updated_by = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(method.id)
        .bind(method.method_type)
        .bind(&method.provider)
        .bind(&method.description)
        .bind(method.is_active)
        .bind(method.audit.updated_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    pub async fn search(
        &self,
        pattern: Option<&str>,
        include_deleted: bool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PaymentMethod>, i64), AppError> {
        let items = sqlx::query_as::<_, PaymentMethod>(
            r#"
            SELECT * FROM payment_methods
            WHERE ($1::text IS NULL OR provider ILIKE $1 OR description ILIKE $1)
              AND ($2 OR NOT is_deleted)
            ORDER BY provider
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(pattern)
        .bind(include_deleted)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM payment_methods
            WHERE ($1::text IS NULL OR provider ILIKE $1 OR description ILIKE $1)
              AND ($2 OR NOT is_deleted)
            "#,
        )
        .bind(pattern)
        .bind(include_deleted)
        .fetch_one(&self.pool)
        .await?;

        Ok((items, total))
    }

    pub async fn soft_delete(&self, id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        super::soft_delete(&self.pool, Self::TABLE, id, actor).await
    }

    pub async fn restore(&self, id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        super::restore(&self.pool, Self::TABLE, id, actor).await
    }
}
