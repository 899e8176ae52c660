use sqlx::PgPool;
use uuid::Uuid;

use crate::models::message::{Message, MessageAssignment};
use crate::utils::errors::{map_unique_violation, AppError};

pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, message: &Message) -> Result<Message, AppError> {
        let created = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, customer_id, sender_id, content, is_read, sent_at, is_deleted)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(message.id)
        .bind(message.customer_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.is_read)
        .bind(message.sent_at)
        .bind(message.is_deleted)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Newest first.
    pub async fn conversation(&self, customer_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<Message>, i64), AppError> {
        let items = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE customer_id = $1 AND NOT is_deleted
            ORDER BY sent_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(customer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE customer_id = $1 AND NOT is_deleted",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((items, total))
    }

    /// Marks messages not written by `reader_id` as read. Returns rows changed.
    pub async fn mark_read(&self, customer_id: Uuid, reader_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET is_read = TRUE
            WHERE customer_id = $1 AND sender_id <> $2 AND NOT is_read AND NOT is_deleted
            "#,
        )
        .bind(customer_id)
        .bind(reader_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn active_assignment(&self, customer_id: Uuid) -> Result<Option<MessageAssignment>, AppError> {
        let found = sqlx::query_as::<_, MessageAssignment>(
            "SELECT * FROM message_assignments WHERE customer_id = $1 AND is_active",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found)
    }

    /// Closes any open assignment and opens one for `staff_id`.
    pub async fn reassign(&self, customer_id: Uuid, staff_id: Uuid) -> Result<MessageAssignment, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE message_assignments SET is_active = FALSE, closed_at = NOW() WHERE customer_id = $1 AND is_active",
        )
        .bind(customer_id)
        .execute(&mut *tx)
        .await?;

        let created = sqlx::query_as::<_, MessageAssignment>(
            r#"
            INSERT INTO message_assignments (id, customer_id, staff_id, is_active, assigned_at)
            VALUES ($1, $2, $3, TRUE, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(customer_id)
        .bind(staff_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "Conversation was assigned concurrently"))?;

        tx.commit().await?;
        Ok(created)
    }

    /// Opens an assignment only if none is active; returns whichever is active afterwards.
    pub async fn assign_if_unassigned(&self, customer_id: Uuid, staff_id: Uuid) -> Result<MessageAssignment, AppError> {
        let inserted = sqlx::query_as::<_, MessageAssignment>(
            r#"
            INSERT INTO message_assignments (id, customer_id, staff_id, is_active, assigned_at)
            VALUES ($1, $2, $3, TRUE, NOW())
            ON CONFLICT (customer_id) WHERE is_active DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(customer_id)
        .bind(staff_id)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(assignment) => Ok(assignment),
            None => self
                .active_assignment(customer_id)
                .await?
                .ok_or_else(|| AppError::Conflict("Conversation assignment changed concurrently".to_string())),
        }
    }

    pub async fn close(&self, customer_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE message_assignments SET is_active = FALSE, closed_at = NOW() WHERE customer_id = $1 AND is_active",
        )
        .bind(customer_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn assignments_for_staff(&self, staff_id: Uuid) -> Result<Vec<MessageAssignment>, AppError> {
        let items = sqlx::query_as::<_, MessageAssignment>(
            "SELECT * FROM message_assignments WHERE staff_id = $1 AND is_active ORDER BY assigned_at DESC",
        )
        .bind(staff_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}
