use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct FailedTransactionRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub wallet_address: Option<String>,
    pub event_id: Option<i64>,
    pub option_id: Option<i64>,
    pub quantity: Option<i32>,
    pub amount: Option<Decimal>,
    pub tx_signature: Option<String>,
    pub error_message: String,
    pub payload: serde_json::Value,
    pub resolved: bool,
    pub resolved_by: Option<i64>,
    pub resolution_notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
