use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use settlement::{EventSnapshot, OptionSnapshot, SettlementError};
use sqlx::{FromRow, PgConnection, PgExecutor};

pub const EVENT_COLUMNS: &str = "id, title, description, category, status, ticket_price, \
    max_tickets, tickets_sold, pool_amount, lock_time, event_time, resolve_time, resolved_at, \
    winning_option_id, created_by, created_at, updated_at";

pub const OPTION_COLUMNS: &str =
    "id, event_id, label, ticket_limit, tickets_sold, pool_amount, is_winner, position";

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub status: String,
    pub ticket_price: Decimal,
    pub max_tickets: i32,
    pub tickets_sold: i32,
    pub pool_amount: Decimal,
    pub lock_time: DateTime<Utc>,
    pub event_time: DateTime<Utc>,
    pub resolve_time: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub winning_option_id: Option<i64>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRow {
    pub fn snapshot(&self) -> Result<EventSnapshot, SettlementError> {
        Ok(EventSnapshot {
            id: self.id,
            status: self.status.parse()?,
            ticket_price: self.ticket_price,
            max_tickets: self.max_tickets,
            tickets_sold: self.tickets_sold,
            pool_amount: self.pool_amount,
            lock_time: self.lock_time,
            resolved_at: self.resolved_at,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct EventOptionRow {
    pub id: i64,
    pub event_id: i64,
    pub label: String,
    pub ticket_limit: Option<i32>,
    pub tickets_sold: i32,
    pub pool_amount: Decimal,
    pub is_winner: bool,
    pub position: i32,
}

impl EventOptionRow {
    pub fn snapshot(&self) -> OptionSnapshot {
        OptionSnapshot {
            id: self.id,
            event_id: self.event_id,
            ticket_limit: self.ticket_limit,
            tickets_sold: self.tickets_sold,
            pool_amount: self.pool_amount,
        }
    }
}

/// Event detail as served by `GET /events/{id}`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EventWithOptions {
    #[serde(flatten)]
    pub event: EventRow,
    pub remaining_tickets: i32,
    pub options: Vec<EventOptionRow>,
}

impl EventWithOptions {
    pub fn new(event: EventRow, options: Vec<EventOptionRow>) -> Self {
        let remaining_tickets = (event.max_tickets - event.tickets_sold).max(0);
        Self {
            event,
            remaining_tickets,
            options,
        }
    }
}

impl EventRow {
    pub async fn find<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS);
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Row-locks the event until the surrounding transaction ends.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM events WHERE id = $1 FOR UPDATE", EVENT_COLUMNS);
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await
    }
}

impl EventOptionRow {
    pub async fn for_event<'e, E: PgExecutor<'e>>(
        executor: E,
        event_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM event_options WHERE event_id = $1 ORDER BY position, id",
            OPTION_COLUMNS
        );
        sqlx::query_as::<_, EventOptionRow>(&sql)
            .bind(event_id)
            .fetch_all(executor)
            .await
    }

    pub async fn for_events<'e, E: PgExecutor<'e>>(
        executor: E,
        event_ids: &[i64],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM event_options WHERE event_id = ANY($1) ORDER BY event_id, position, id",
            OPTION_COLUMNS
        );
        sqlx::query_as::<_, EventOptionRow>(&sql)
            .bind(event_ids)
            .fetch_all(executor)
            .await
    }

    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM event_options WHERE id = $1 FOR UPDATE", OPTION_COLUMNS);
        sqlx::query_as::<_, EventOptionRow>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await
    }
}

impl EventOptionRow {
    pub async fn find<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM event_options WHERE id = $1", OPTION_COLUMNS);
        sqlx::query_as::<_, EventOptionRow>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }
}
