use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::message::StaffLoad;
use crate::models::user::User;
use crate::utils::errors::{map_unique_violation, AppError};

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub const TABLE: &'static str = "users";

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts the user and links `role_ids` in one transaction.
    pub async fn create_with_roles(&self, user: &User, role_ids: &[Uuid]) -> Result<User, AppError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, email, password_hash, full_name, phone, address, is_active,
                is_deleted, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, LOWER($2), $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(user.is_active)
        .bind(user.audit.is_deleted)
        .bind(user.audit.created_at)
        .bind(user.audit.created_by)
        .bind(user.audit.updated_at)
        .bind(user.audit.updated_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Email '{}' is already registered", user.email)))?;

        Self::replace_roles(&mut *tx, created.id, role_ids).await?;
        tx.commit().await?;

        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn update(&self, user: &User) -> Result<User, AppError> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET full_name = $2, phone = $3, address = $4, is_active = $5,
                updated_at = NOW(), updated_by = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(user.is_active)
        .bind(user.audit.updated_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW(), updated_by = $1 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Role names held by a user, through live roles only.
    pub async fn role_names(&self, user_id: Uuid) -> Result<Vec<String>, AppError> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT r.name FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1 AND NOT r.is_deleted
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    pub async fn has_role(&self, user_id: Uuid, role: &str) -> Result<bool, AppError> {
        let has: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_roles ur
                JOIN roles r ON r.id = ur.role_id
                JOIN users u ON u.id = ur.user_id
                WHERE ur.user_id = $1 AND r.name = $2
                  AND NOT r.is_deleted AND NOT u.is_deleted AND u.is_active
            )
            "#,
        )
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(has)
    }

    pub async fn set_roles(&self, user_id: Uuid, role_ids: &[Uuid], actor: Option<Uuid>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        Self::replace_roles(&mut *tx, user_id, role_ids).await?;
        sqlx::query("UPDATE users SET updated_at = NOW(), updated_by = $2 WHERE id = $1")
            .bind(user_id)
            .bind(actor)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_roles(conn: &mut PgConnection, user_id: Uuid, role_ids: &[Uuid]) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_ids)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Active, live users holding `role`.
    pub async fn list_by_role(&self, role: &str) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.* FROM users u
            JOIN user_roles ur ON ur.user_id = u.id
            JOIN roles r ON r.id = ur.role_id
            WHERE r.name = $1 AND NOT r.is_deleted AND NOT u.is_deleted AND u.is_active
            ORDER BY u.full_name
            "#,
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Active STAFF users with their open conversation count.
    pub async fn staff_loads(&self) -> Result<Vec<StaffLoad>, AppError> {
        let loads = sqlx::query_as::<_, StaffLoad>(
            r#"
            SELECT u.id AS staff_id, COUNT(ma.id) AS active_count
            FROM users u
            JOIN user_roles ur ON ur.user_id = u.id
            JOIN roles r ON r.id = ur.role_id AND r.name = 'STAFF' AND NOT r.is_deleted
            LEFT JOIN message_assignments ma ON ma.staff_id = u.id AND ma.is_active
            WHERE NOT u.is_deleted AND u.is_active
            GROUP BY u.id, u.created_at
            ORDER BY u.created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(loads)
    }

    pub async fn search(
        &self,
        pattern: Option<&str>,
        include_deleted: bool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::text IS NULL OR email ILIKE $1 OR full_name ILIKE $1 OR phone ILIKE $1)
              AND ($2 OR NOT is_deleted)
            ORDER BY created_at DESC
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
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL OR email ILIKE $1 OR full_name ILIKE $1 OR phone ILIKE $1)
              AND ($2 OR NOT is_deleted)
            "#,
        )
        .bind(pattern)
        .bind(include_deleted)
        .fetch_one(&self.pool)
        .await?;

        Ok((users, total))
    }

    pub async fn soft_delete(&self, id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        super::soft_delete(&self.pool, Self::TABLE, id, actor).await
    }

    pub async fn restore(&self, id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        super::restore(&self.pool, Self::TABLE, id, actor).await
    }
}
