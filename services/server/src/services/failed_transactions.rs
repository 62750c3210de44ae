use log::{error, warn};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use crate::models::failed_transaction_model::FailedTransactionRow;

const FAILED_TX_COLUMNS: &str = "id, user_id, wallet_address, event_id, option_id, quantity, \
    amount, tx_signature, error_message, payload, resolved, resolved_by, resolution_notes, \
    resolved_at, created_at";

#[derive(Debug, Clone)]
pub struct FailedPurchase {
    pub user_id: i64,
    pub wallet_address: String,
    pub event_id: i64,
    pub option_id: i64,
    pub quantity: i32,
    pub amount: Option<Decimal>,
    pub tx_signature: String,
    pub error_message: String,
    pub payload: Value,
}

/// Best effort: a purchase that failed after the buyer may already have
/// paid is parked here for an admin. Failing to write the row is logged and
/// otherwise ignored.
pub async fn record_failed_purchase(pool: &PgPool, entry: FailedPurchase) {
    let result = sqlx::query(
        r#"
        INSERT INTO failed_transactions
            (user_id, wallet_address, event_id, option_id, quantity, amount,
             tx_signature, error_message, payload)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(entry.user_id)
    .bind(&entry.wallet_address)
    .bind(entry.event_id)
    .bind(entry.option_id)
    .bind(entry.quantity)
    .bind(entry.amount)
    .bind(&entry.tx_signature)
    .bind(&entry.error_message)
    .bind(&entry.payload)
    .execute(pool)
    .await;

    match result {
        Ok(_) => warn!(
            "Recorded failed purchase: signature={}, user_id={}, error={}",
            entry.tx_signature, entry.user_id, entry.error_message
        ),
        Err(e) => error!(
            "Failed to record failed purchase: signature={}, error={}, ledger_error={}",
            entry.tx_signature, entry.error_message, e
        ),
    }
}

pub async fn list(
    pool: &PgPool,
    resolved: Option<bool>,
) -> Result<Vec<FailedTransactionRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM failed_transactions \
         WHERE ($1::BOOLEAN IS NULL OR resolved = $1) \
         ORDER BY created_at DESC",
        FAILED_TX_COLUMNS
    );
    sqlx::query_as::<_, FailedTransactionRow>(&sql)
        .bind(resolved)
        .fetch_all(pool)
        .await
}

/// Marks an entry handled. Returns `None` when it doesn't exist or was
/// already resolved.
pub async fn resolve(
    conn: &mut PgConnection,
    id: i64,
    admin_id: i64,
    notes: &str,
) -> Result<Option<FailedTransactionRow>, sqlx::Error> {
    let sql = format!(
        "UPDATE failed_transactions \
         SET resolved = TRUE, resolved_by = $2, resolution_notes = $3, resolved_at = NOW() \
         WHERE id = $1 AND resolved = FALSE \
         RETURNING {}",
        FAILED_TX_COLUMNS
    );
    sqlx::query_as::<_, FailedTransactionRow>(&sql)
        .bind(id)
        .bind(admin_id)
        .bind(notes)
        .fetch_optional(conn)
        .await
}
