use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use settlement::{SettlementError, TicketSnapshot};
use sqlx::FromRow;

pub const TICKET_COLUMNS: &str = "id, user_id, event_id, option_id, serial_number, wallet_address, \
    purchase_price, purchase_tx_signature, purchase_index, status, payout_amount, \
    claim_net_amount, claim_fee_amount, claim_tx_signature, claimed_at, created_at";

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct TicketRow {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub option_id: i64,
    pub serial_number: String,
    pub wallet_address: String,
    pub purchase_price: Decimal,
    pub purchase_tx_signature: String,
    pub purchase_index: i32,
    pub status: String,
    pub payout_amount: Option<Decimal>,
    pub claim_net_amount: Option<Decimal>,
    pub claim_fee_amount: Option<Decimal>,
    pub claim_tx_signature: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TicketRow {
    pub fn snapshot(&self) -> Result<TicketSnapshot, SettlementError> {
        Ok(TicketSnapshot {
            id: self.id,
            user_id: self.user_id,
            event_id: self.event_id,
            option_id: self.option_id,
            status: self.status.parse()?,
            purchase_price: self.purchase_price,
            payout_amount: self.payout_amount,
        })
    }
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct TicketWithEventRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub ticket: TicketRow,
    pub event_title: String,
    pub event_status: String,
    pub option_label: String,
}

/// A ticket joined with the settlement time of its event, for claims.
#[derive(Debug, Clone, FromRow)]
pub struct ClaimableTicketRow {
    #[sqlx(flatten)]
    pub ticket: TicketRow,
    pub event_resolved_at: Option<DateTime<Utc>>,
}
