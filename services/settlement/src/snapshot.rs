use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::status::{EventStatus, TicketStatus};

/// The parts of an event row the settlement rules read and update.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EventSnapshot {
    pub id: i64,
    pub status: EventStatus,
    pub ticket_price: Decimal,
    pub max_tickets: i32,
    pub tickets_sold: i32,
    pub pool_amount: Decimal,
    pub lock_time: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl EventSnapshot {
    pub fn remaining_capacity(&self) -> i32 {
        (self.max_tickets - self.tickets_sold).max(0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OptionSnapshot {
    pub id: i64,
    pub event_id: i64,
    /// `None` means the option is only bounded by the event capacity.
    pub ticket_limit: Option<i32>,
    pub tickets_sold: i32,
    pub pool_amount: Decimal,
}

impl OptionSnapshot {
    pub fn remaining(&self) -> Option<i32> {
        self.ticket_limit
            .map(|limit| (limit - self.tickets_sold).max(0))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TicketSnapshot {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub option_id: i64,
    pub status: TicketStatus,
    pub purchase_price: Decimal,
    pub payout_amount: Option<Decimal>,
}
