use async_trait::async_trait;
use common::{PaymentId, RoomId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};

use super::PaymentLedger;
use crate::error::LedgerError;
use crate::record::{PaymentRecord, PaymentStatus};

const SELECT_COLUMNS: &str = r#"
    SELECT payment_id, room_id, user_id, amount, currency, status,
           gateway_payment_id, description, created_at, updated_at
    FROM payments
"#;

/// PostgreSQL-backed payment ledger.
#[derive(Clone)]
pub struct PostgresPaymentLedger {
    pool: PgPool,
}

impl PostgresPaymentLedger {
    /// Creates a ledger over an existing pool. The `payments` table must exist.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_record(row: PgRow) -> Result<PaymentRecord, LedgerError> {
        let status: String = row.try_get("status")?;
        Ok(PaymentRecord {
            payment_id: PaymentId::new(row.try_get::<String, _>("payment_id")?),
            room_id: RoomId::new(row.try_get::<String, _>("room_id")?),
            user_id: UserId::new(row.try_get::<String, _>("user_id")?),
            amount: row.try_get("amount")?,
            currency: row.try_get("currency")?,
            status: status.parse()?,
            gateway_payment_id: row.try_get("gateway_payment_id")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn fetch_many(
        &self,
        filter: &str,
        value: &str,
    ) -> Result<Vec<PaymentRecord>, LedgerError> {
        let sql = format!("{SELECT_COLUMNS} WHERE {filter} = $1 ORDER BY created_at DESC");
        let rows = sqlx::query(&sql).bind(value).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_record).collect()
    }
}

#[async_trait]
impl PaymentLedger for PostgresPaymentLedger {
    async fn create_payment(&self, record: &PaymentRecord) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO payments (payment_id, room_id, user_id, amount, currency, status,
                                  gateway_payment_id, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.payment_id.as_str())
        .bind(record.room_id.as_str())
        .bind(record.user_id.as_str())
        .bind(record.amount)
        .bind(&record.currency)
        .bind(record.status.as_str())
        .bind(&record.gateway_payment_id)
        .bind(&record.description)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_payment_status(
        &self,
        payment_id: &PaymentId,
        status: PaymentStatus,
        gateway_payment_id: &str,
    ) -> Result<(), LedgerError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $1, gateway_payment_id = $2, updated_at = NOW()
            WHERE payment_id = $3
            "#,
        )
        .bind(status.as_str())
        .bind(gateway_payment_id)
        .bind(payment_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::PaymentNotFound(payment_id.clone()));
        }
        Ok(())
    }

    async fn payments_by_room(&self, room_id: &RoomId) -> Result<Vec<PaymentRecord>, LedgerError> {
        self.fetch_many("room_id", room_id.as_str()).await
    }

    async fn payments_by_user(&self, user_id: &UserId) -> Result<Vec<PaymentRecord>, LedgerError> {
        self.fetch_many("user_id", user_id.as_str()).await
    }

    async fn payment_by_id(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<PaymentRecord>, LedgerError> {
        let sql = format!("{SELECT_COLUMNS} WHERE payment_id = $1");
        let row = sqlx::query(&sql)
            .bind(payment_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_record).transpose()
    }
}
