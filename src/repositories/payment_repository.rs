use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::payment::{PaymentTransaction, TransactionStatus};
use crate::utils::errors::{map_unique_violation, AppError};

/// Gateway fields written back when a transaction settles.
#[derive(Debug, Clone, Default)]
pub struct GatewayResult {
    pub gateway_transaction_no: Option<String>,
    pub bank_code: Option<String>,
    pub response_code: Option<String>,
    pub pay_date: Option<DateTime<Utc>>,
    pub raw_response: Option<serde_json::Value>,
}

pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, txn: &PaymentTransaction) -> Result<PaymentTransaction, AppError> {
        sqlx::query_as::<_, PaymentTransaction>(
            r#"
            INSERT INTO payment_transactions (
                id, invoice_id, payment_method_id, txn_ref, amount, status,
                gateway_transaction_no, bank_code, response_code, pay_date, raw_response,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(txn.id)
        .bind(txn.invoice_id)
        .bind(txn.payment_method_id)
        .bind(&txn.txn_ref)
        .bind(txn.amount)
        .bind(txn.status)
        .bind(&txn.gateway_transaction_no)
        .bind(&txn.bank_code)
        .bind(&txn.response_code)
        .bind(txn.pay_date)
        .bind(&txn.raw_response)
        .bind(txn.created_at)
        .bind(txn.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Duplicate transaction reference"))
    }

    pub async fn find_by_txn_ref(&self, txn_ref: &str) -> Result<Option<PaymentTransaction>, AppError> {
        let found = sqlx::query_as::<_, PaymentTransaction>(
            "SELECT * FROM payment_transactions WHERE txn_ref = $1",
        )
        .bind(txn_ref)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found)
    }

    pub async fn lock_by_txn_ref(conn: &mut PgConnection, txn_ref: &str) -> Result<Option<PaymentTransaction>, AppError> {
        let found = sqlx::query_as::<_, PaymentTransaction>(
            "SELECT * FROM payment_transactions WHERE txn_ref = $1 FOR UPDATE",
        )
        .bind(txn_ref)
        .fetch_optional(conn)
        .await?;
        Ok(found)
    }

    pub async fn settle(
        conn: &mut PgConnection,
        id: Uuid,
        status: TransactionStatus,
        result: &GatewayResult,
    ) -> Result<PaymentTransaction, AppError> {
        let updated = sqlx::query_as::<_, PaymentTransaction>(
            r#"
            UPDATE payment_transactions
            SET status = $2, gateway_transaction_no = $3, bank_code = $4, response_code = $5,
                pay_date = $6, raw_response = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(&result.gateway_transaction_no)
        .bind(&result.bank_code)
        .bind(&result.response_code)
        .bind(result.pay_date)
        .bind(&result.raw_response)
        .fetch_one(conn)
        .await?;
        Ok(updated)
    }

    pub async fn list_by_invoice(&self, invoice_id: Uuid) -> Result<Vec<PaymentTransaction>, AppError> {
        let items = sqlx::query_as::<_, PaymentTransaction>(
            "SELECT * FROM payment_transactions WHERE invoice_id = $1 ORDER BY created_at DESC",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}
