use actix_web::{post, put, web, HttpRequest, HttpResponse};
use log::info;
use rust_decimal::Decimal;
use serde_json::json;
use settlement::{plan_cancellation, plan_resolution, EventStatus, ResolutionOutcome};
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::models::event_model::{
    EventOptionRow, EventRow, EventWithOptions, EVENT_COLUMNS, OPTION_COLUMNS,
};
use crate::services::audit_log;
use crate::services::platform_settings::resolution_fee_bps;
use crate::types::event_types::{CreateEventRequest, ResolveEventRequest, UpdateStatusRequest};
use crate::utils::jwt::extract_auth_user;
use crate::utils::responses::{created, ok};

async fn lock_event_row(conn: &mut PgConnection, event_id: i64) -> Result<EventRow, ApiError> {
    EventRow::find_for_update(conn, event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))
}

/// Refunds every still-active ticket of the event at its purchase price.
async fn refund_active_tickets(conn: &mut PgConnection, event_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE tickets SET status = 'refunded', payout_amount = purchase_price \
         WHERE event_id = $1 AND status = 'active'",
    )
    .bind(event_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

async fn notify_ticket_holders(
    conn: &mut PgConnection,
    event_id: i64,
    ticket_status: &str,
    title: &str,
    body: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO notifications (user_id, title, body) \
         SELECT DISTINCT user_id, $3, $4 FROM tickets WHERE event_id = $1 AND status = $2",
    )
    .bind(event_id)
    .bind(ticket_status)
    .bind(title)
    .bind(body)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// A notification sent to every holder of a ticket in `ticket_status`.
#[derive(Debug, PartialEq)]
struct Notice {
    ticket_status: &'static str,
    title: &'static str,
    body: String,
}

fn resolution_notices(outcome: &ResolutionOutcome, event_title: &str) -> Vec<Notice> {
    match outcome {
        ResolutionOutcome::Winners {
            payout_per_ticket, ..
        } => vec![
            Notice {
                ticket_status: "won",
                title: "You won!",
                body: format!(
                    "\"{}\" resolved in your favour. Each winning ticket pays {} SOL.",
                    event_title, payout_per_ticket
                ),
            },
            Notice {
                ticket_status: "lost",
                title: "Event resolved",
                body: format!(
                    "\"{}\" resolved and your option did not win. Better luck next time.",
                    event_title
                ),
            },
        ],
        ResolutionOutcome::RefundAll => vec![Notice {
            ticket_status: "refunded",
            title: "Tickets refunded",
            body: format!(
                "Nobody backed the winning option of \"{}\". \
                 Your tickets can be claimed as refunds.",
                event_title
            ),
        }],
    }
}

#[post("/events")]
pub async fn create_event(
    db_pool: web::Data<PgPool>,
    req: HttpRequest,
    body: web::Json<CreateEventRequest>,
) -> Result<HttpResponse, ApiError> {
    let admin = extract_auth_user(&req)?;
    body.validate()?;
    body.check_terms().map_err(ApiError::BadRequest)?;

    let mut tx = db_pool.begin().await?;

    let sql = format!(
        "INSERT INTO events \
             (title, description, category, status, ticket_price, max_tickets, \
              lock_time, event_time, resolve_time, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING {}",
        EVENT_COLUMNS
    );
    let event = sqlx::query_as::<_, EventRow>(&sql)
        .bind(body.title.trim())
        .bind(&body.description)
        .bind(&body.category)
        .bind(body.status.as_str())
        .bind(body.ticket_price)
        .bind(body.max_tickets)
        .bind(body.lock_time)
        .bind(body.event_time)
        .bind(body.resolve_time)
        .bind(admin.user_id)
        .fetch_one(&mut *tx)
        .await?;

    let sql = format!(
        "INSERT INTO event_options (event_id, label, ticket_limit, position) \
         VALUES ($1, $2, $3, $4) RETURNING {}",
        OPTION_COLUMNS
    );
    let mut options = Vec::with_capacity(body.options.len());
    for (position, option) in body.options.iter().enumerate() {
        let row = sqlx::query_as::<_, EventOptionRow>(&sql)
            .bind(event.id)
            .bind(option.label.trim())
            .bind(option.ticket_limit)
            .bind(position as i32)
            .fetch_one(&mut *tx)
            .await?;
        options.push(row);
    }

    audit_log::record(
        &mut *tx,
        admin.user_id,
        "event.create",
        "event",
        event.id,
        json!({ "title": event.title, "status": event.status, "options": options.len() }),
    )
    .await?;

    tx.commit().await?;

    info!("Created event: event_id={}, admin_id={}", event.id, admin.user_id);
    cache_client::invalidate_listing().await;

    Ok(created(EventWithOptions::new(event, options)))
}

/// Forward lifecycle moves only. Resolution and cancellation settle tickets
/// and go through their own endpoints.
#[put("/events/{event_id}/status")]
pub async fn update_event_status(
    db_pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let admin = extract_auth_user(&req)?;
    let event_id = path.into_inner();
    let next = body.status;

    if matches!(next, EventStatus::Resolved | EventStatus::Cancelled) {
        return Err(ApiError::BadRequest(format!(
            "Use the {} endpoint to move an event to {}",
            if next == EventStatus::Resolved { "resolve" } else { "cancel" },
            next
        )));
    }

    let mut tx = db_pool.begin().await?;
    let event = lock_event_row(&mut *tx, event_id).await?;
    let current = event.snapshot()?.status;
    current.transition_to(next)?;

    let sql = format!(
        "UPDATE events SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        EVENT_COLUMNS
    );
    let event = sqlx::query_as::<_, EventRow>(&sql)
        .bind(event_id)
        .bind(next.as_str())
        .fetch_one(&mut *tx)
        .await?;

    audit_log::record(
        &mut *tx,
        admin.user_id,
        "event.status",
        "event",
        event_id,
        json!({ "from": current, "to": next }),
    )
    .await?;

    tx.commit().await?;

    info!("Event {} moved {} -> {} by admin {}", event_id, current, next, admin.user_id);
    cache_client::invalidate_event(event_id).await;

    Ok(ok(event))
}

#[post("/events/{event_id}/resolve")]
pub async fn resolve_event(
    db_pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<ResolveEventRequest>,
) -> Result<HttpResponse, ApiError> {
    let admin = extract_auth_user(&req)?;
    body.validate()?;
    let event_id = path.into_inner();

    let mut tx = db_pool.begin().await?;

    let event = lock_event_row(&mut *tx, event_id).await?;
    let winning_option = EventOptionRow::find_for_update(&mut *tx, body.winning_option_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Option not found".into()))?;

    let winning_tickets: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tickets WHERE option_id = $1 AND status = 'active'",
    )
    .bind(winning_option.id)
    .fetch_one(&mut *tx)
    .await?;

    let fee_bps = resolution_fee_bps(&mut *tx, config.resolution_fee_bps).await?;
    let plan = plan_resolution(
        &event.snapshot()?,
        &winning_option.snapshot(),
        winning_tickets,
        fee_bps,
    )?;

    let (won, lost, refunded) = match plan.outcome {
        ResolutionOutcome::Winners {
            payout_per_ticket, ..
        } => {
            let won = sqlx::query(
                "UPDATE tickets SET status = 'won', payout_amount = $2 \
                 WHERE option_id = $1 AND status = 'active'",
            )
            .bind(winning_option.id)
            .bind(payout_per_ticket)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            let lost = sqlx::query(
                "UPDATE tickets SET status = 'lost', payout_amount = $2 \
                 WHERE event_id = $1 AND status = 'active'",
            )
            .bind(event_id)
            .bind(Decimal::ZERO)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            (won, lost, 0)
        }
        ResolutionOutcome::RefundAll => {
            let refunded = refund_active_tickets(&mut *tx, event_id).await?;
            (0, 0, refunded)
        }
    };

    for notice in resolution_notices(&plan.outcome, &event.title) {
        notify_ticket_holders(
            &mut *tx,
            event_id,
            notice.ticket_status,
            notice.title,
            &notice.body,
        )
        .await?;
    }

    sqlx::query("UPDATE event_options SET is_winner = (id = $2) WHERE event_id = $1")
        .bind(event_id)
        .bind(winning_option.id)
        .execute(&mut *tx)
        .await?;

    let sql = format!(
        "UPDATE events \
         SET status = 'resolved', winning_option_id = $2, resolved_at = NOW(), updated_at = NOW() \
         WHERE id = $1 RETURNING {}",
        EVENT_COLUMNS
    );
    let event = sqlx::query_as::<_, EventRow>(&sql)
        .bind(event_id)
        .bind(winning_option.id)
        .fetch_one(&mut *tx)
        .await?;

    audit_log::record(
        &mut *tx,
        admin.user_id,
        "event.resolve",
        "event",
        event_id,
        json!({ "plan": plan, "fee_bps": fee_bps, "won": won, "lost": lost, "refunded": refunded }),
    )
    .await?;

    tx.commit().await?;

    info!(
        "Resolved event: event_id={}, winning_option_id={}, won={}, lost={}, refunded={}, fee={}",
        event_id, winning_option.id, won, lost, refunded, plan.platform_fee
    );
    cache_client::invalidate_event(event_id).await;

    Ok(ok(json!({
        "event": event,
        "resolution": plan,
        "tickets_won": won,
        "tickets_lost": lost,
        "tickets_refunded": refunded
    })))
}

#[post("/events/{event_id}/cancel")]
pub async fn cancel_event(
    db_pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let admin = extract_auth_user(&req)?;
    let event_id = path.into_inner();

    let mut tx = db_pool.begin().await?;
    let event = lock_event_row(&mut *tx, event_id).await?;
    let previous = event.snapshot()?;
    plan_cancellation(&previous)?;

    let refunded = refund_active_tickets(&mut *tx, event_id).await?;
    notify_ticket_holders(
        &mut *tx,
        event_id,
        "refunded",
        "Event cancelled",
        &format!("\"{}\" was cancelled. Your tickets can be claimed as refunds.", event.title),
    )
    .await?;

    let sql = format!(
        "UPDATE events SET status = 'cancelled', resolved_at = NOW(), updated_at = NOW() \
         WHERE id = $1 RETURNING {}",
        EVENT_COLUMNS
    );
    let event = sqlx::query_as::<_, EventRow>(&sql)
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;

    audit_log::record(
        &mut *tx,
        admin.user_id,
        "event.cancel",
        "event",
        event_id,
        json!({ "from": previous.status, "refunded": refunded }),
    )
    .await?;

    tx.commit().await?;

    info!("Cancelled event: event_id={}, refunded={}", event_id, refunded);
    cache_client::invalidate_event(event_id).await;

    Ok(ok(json!({
        "event": event,
        "tickets_refunded": refunded
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_winners_and_losers_are_both_notified() {
        let outcome = ResolutionOutcome::Winners {
            winner_count: 4,
            payout_per_ticket: dec!(25),
        };
        let notices = resolution_notices(&outcome, "Cup final");
        let statuses: Vec<_> = notices.iter().map(|n| n.ticket_status).collect();
        assert_eq!(statuses, vec!["won", "lost"]);
        assert!(notices[0].body.contains("25 SOL"));
        assert!(notices[1].body.contains("Cup final"));
    }

    #[test]
    fn test_refund_notice_when_nobody_won() {
        let notices = resolution_notices(&ResolutionOutcome::RefundAll, "Cup final");
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].ticket_status, "refunded");
        assert!(notices[0].body.contains("claimed as refunds"));
    }
}
