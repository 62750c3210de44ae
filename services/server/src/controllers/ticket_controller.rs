use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use log::{info, warn};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use settlement::{
    plan_claim, plan_purchase, ClaimAmounts, PurchasePlan, PurchaseRequest, SettlementError,
    TicketStatus,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::models::event_model::{EventOptionRow, EventRow};
use crate::models::prefixed;
use crate::models::ticket_model::{
    ClaimableTicketRow, TicketRow, TicketWithEventRow, TICKET_COLUMNS,
};
use crate::services::auto_lock::lock_event;
use crate::services::failed_transactions::{record_failed_purchase, FailedPurchase};
use crate::services::payment_verifier::PaymentVerifier;
use crate::types::auth_types::AuthUser;
use crate::types::ticket_types::{ClaimTicketInput, MyTicketsQuery, PurchaseTicketInput};
use crate::utils::jwt::extract_auth_user;
use crate::utils::responses::{created, ok};

struct PurchaseFailure {
    error: ApiError,
    /// Set once the on-chain payment checked out: from here on a failure
    /// means the buyer paid without getting tickets.
    payment_verified: bool,
    total_cost: Option<Decimal>,
}

fn fail<E: Into<ApiError>>(error: E) -> PurchaseFailure {
    PurchaseFailure {
        error: error.into(),
        payment_verified: false,
        total_cost: None,
    }
}

fn paid<E: Into<ApiError>>(total_cost: Decimal) -> impl Fn(E) -> PurchaseFailure {
    move |error| PurchaseFailure {
        error: error.into(),
        payment_verified: true,
        total_cost: Some(total_cost),
    }
}

async fn signature_used<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    signature: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM tickets WHERE purchase_tx_signature = $1)",
    )
    .bind(signature)
    .fetch_one(executor)
    .await
}

/// Unique constraint over `(purchase_tx_signature, purchase_index)`.
const SIGNATURE_ONCE_CONSTRAINT: &str = "tickets_purchase_signature_once";

fn is_signature_reuse(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.constraint() == Some(SIGNATURE_ONCE_CONSTRAINT)
        }
        _ => false,
    }
}

fn map_ticket_insert_error(e: sqlx::Error) -> ApiError {
    if is_signature_reuse(&e) {
        ApiError::Settlement(SettlementError::SignatureAlreadyUsed)
    } else {
        ApiError::Database(e)
    }
}

/// Tickets go to the wallet that paid, so it must be the caller's own,
/// proven at login or when it was linked to the account.
fn check_buyer_wallet(auth: &AuthUser, wallet_address: &str) -> Result<(), ApiError> {
    if auth.wallet_address.as_deref() == Some(wallet_address) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Purchases must be paid from the wallet linked to your account".into(),
        ))
    }
}

async fn process_purchase(
    db_pool: &PgPool,
    config: &AppConfig,
    verifier: &PaymentVerifier,
    auth: &AuthUser,
    input: &PurchaseTicketInput,
) -> Result<(PurchasePlan, Vec<TicketRow>), PurchaseFailure> {
    check_buyer_wallet(auth, &input.wallet_address).map_err(fail)?;

    let event = EventRow::find(db_pool, input.event_id)
        .await
        .map_err(fail)?
        .ok_or_else(|| fail(ApiError::NotFound("Event not found".into())))?;
    let option = EventOptionRow::find(db_pool, input.option_id)
        .await
        .map_err(fail)?
        .ok_or_else(|| fail(ApiError::NotFound("Option not found".into())))?;

    let used = signature_used(db_pool, &input.transaction_signature)
        .await
        .map_err(fail)?;

    let request = PurchaseRequest {
        option_id: input.option_id,
        quantity: input.quantity,
        wallet_address: &input.wallet_address,
        signature_used: used,
    };

    let event_snapshot = event.snapshot().map_err(fail)?;
    let plan = match plan_purchase(
        &event_snapshot,
        &option.snapshot(),
        &request,
        &config.treasury_wallet,
        Utc::now(),
    ) {
        Ok(plan) => plan,
        Err(SettlementError::LockTimePassed) => {
            if lock_event(db_pool, event.id).await.map_err(fail)? {
                info!("Locked event {} during purchase: lock time passed", event.id);
                cache_client::invalidate_event(event.id).await;
            }
            return Err(fail(SettlementError::LockTimePassed));
        }
        Err(e) => return Err(fail(e)),
    };

    verifier
        .verify(&input.transaction_signature, plan.total_cost, &input.wallet_address)
        .await
        .map_err(fail)?;

    let total_cost = plan.total_cost;
    let mut tx = db_pool.begin().await.map_err(paid(total_cost))?;

    // Re-plan against locked rows: the checks above ran without a lock and
    // another purchase may have landed in between.
    let locked_event = EventRow::find_for_update(&mut *tx, input.event_id)
        .await
        .map_err(paid(total_cost))?
        .ok_or_else(|| {
            paid::<ApiError>(total_cost)(ApiError::NotFound("Event not found".into()))
        })?;
    let locked_option = EventOptionRow::find_for_update(&mut *tx, input.option_id)
        .await
        .map_err(paid(total_cost))?
        .ok_or_else(|| {
            paid::<ApiError>(total_cost)(ApiError::NotFound("Option not found".into()))
        })?;
    let used = signature_used(&mut *tx, &input.transaction_signature)
        .await
        .map_err(paid(total_cost))?;

    let mut event_snapshot = locked_event.snapshot().map_err(paid(total_cost))?;
    let mut option_snapshot = locked_option.snapshot();
    let request = PurchaseRequest {
        signature_used: used,
        ..request
    };
    let plan = plan_purchase(
        &event_snapshot,
        &option_snapshot,
        &request,
        &config.treasury_wallet,
        Utc::now(),
    )
    .map_err(paid(total_cost))?;

    let (indexes, serials): (Vec<i32>, Vec<String>) = plan
        .ticket_sequences()
        .map(|(index, sequence)| (index, plan.serial_number(sequence)))
        .unzip();

    let sql = format!(
        "INSERT INTO tickets (user_id, event_id, option_id, serial_number, wallet_address, \
             purchase_price, purchase_tx_signature, purchase_index) \
         SELECT $1, $2, $3, s.serial, $4, $5, $6, s.idx \
         FROM UNNEST($7::TEXT[], $8::INT[]) AS s(serial, idx) \
         RETURNING {}",
        TICKET_COLUMNS
    );
    let tickets = sqlx::query_as::<_, TicketRow>(&sql)
        .bind(auth.user_id)
        .bind(plan.event_id)
        .bind(plan.option_id)
        .bind(&input.wallet_address)
        .bind(plan.unit_price)
        .bind(&input.transaction_signature)
        .bind(serials)
        .bind(indexes)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| paid::<ApiError>(total_cost)(map_ticket_insert_error(e)))?;

    plan.apply(&mut event_snapshot, &mut option_snapshot);

    sqlx::query(
        "UPDATE events SET tickets_sold = $2, pool_amount = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(event_snapshot.id)
    .bind(event_snapshot.tickets_sold)
    .bind(event_snapshot.pool_amount)
    .execute(&mut *tx)
    .await
    .map_err(paid(total_cost))?;

    sqlx::query("UPDATE event_options SET tickets_sold = $2, pool_amount = $3 WHERE id = $1")
        .bind(option_snapshot.id)
        .bind(option_snapshot.tickets_sold)
        .bind(option_snapshot.pool_amount)
        .execute(&mut *tx)
        .await
        .map_err(paid(total_cost))?;

    tx.commit().await.map_err(paid(total_cost))?;

    Ok((plan, tickets))
}

#[post("/purchase")]
pub async fn purchase_tickets(
    db_pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    verifier: web::Data<PaymentVerifier>,
    req: HttpRequest,
    body: web::Json<PurchaseTicketInput>,
) -> Result<HttpResponse, ApiError> {
    let auth = extract_auth_user(&req)?;
    body.validate()?;
    let input = body.into_inner();

    match process_purchase(&db_pool, &config, &verifier, &auth, &input).await {
        Ok((plan, tickets)) => {
            info!(
                "Purchased tickets: user_id={}, event_id={}, option_id={}, quantity={}, \
                 signature={}",
                auth.user_id,
                plan.event_id,
                plan.option_id,
                plan.quantity,
                input.transaction_signature
            );
            cache_client::invalidate_event(plan.event_id).await;

            Ok(created(json!({
                "event_id": plan.event_id,
                "option_id": plan.option_id,
                "quantity": plan.quantity,
                "unit_price": plan.unit_price,
                "total_cost": plan.total_cost,
                "tickets": tickets
            })))
        }
        Err(failure) => {
            if failure.payment_verified || failure.error.is_internal() {
                record_failed_purchase(
                    &db_pool,
                    FailedPurchase {
                        user_id: auth.user_id,
                        wallet_address: input.wallet_address.clone(),
                        event_id: input.event_id,
                        option_id: input.option_id,
                        quantity: input.quantity,
                        amount: failure.total_cost,
                        tx_signature: input.transaction_signature.clone(),
                        error_message: failure.error.to_string(),
                        payload: json!({
                            "payment_verified": failure.payment_verified,
                            "event_id": input.event_id,
                            "option_id": input.option_id,
                            "quantity": input.quantity,
                        }),
                    },
                )
                .await;
            }
            Err(failure.error)
        }
    }
}

#[get("/my-tickets")]
pub async fn get_my_tickets(
    db_pool: web::Data<PgPool>,
    req: HttpRequest,
    query: web::Query<MyTicketsQuery>,
) -> Result<HttpResponse, ApiError> {
    let auth = extract_auth_user(&req)?;

    let status = match query.status.as_deref() {
        Some(raw) => Some(
            raw.parse::<TicketStatus>()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        ),
        None => None,
    };

    let sql = format!(
        "SELECT {}, e.title AS event_title, e.status AS event_status, o.label AS option_label \
         FROM tickets t \
         JOIN events e ON e.id = t.event_id \
         JOIN event_options o ON o.id = t.option_id \
         WHERE t.user_id = $1 AND ($2::TEXT IS NULL OR t.status = $2) \
         ORDER BY t.created_at DESC, t.id DESC",
        prefixed(TICKET_COLUMNS, "t")
    );
    let tickets = sqlx::query_as::<_, TicketWithEventRow>(&sql)
        .bind(auth.user_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(db_pool.get_ref())
        .await?;

    Ok(ok(json!({
        "count": tickets.len(),
        "tickets": tickets
    })))
}

#[derive(Serialize, Debug)]
struct ClaimResult {
    ticket: TicketRow,
    amounts: ClaimAmounts,
}

async fn process_claim(
    db_pool: &PgPool,
    config: &AppConfig,
    auth: &AuthUser,
    ticket_id: i64,
) -> Result<ClaimResult, ApiError> {
    let sql = format!(
        "SELECT {}, e.resolved_at AS event_resolved_at \
         FROM tickets t JOIN events e ON e.id = t.event_id \
         WHERE t.id = $1",
        prefixed(TICKET_COLUMNS, "t")
    );
    let row = sqlx::query_as::<_, ClaimableTicketRow>(&sql)
        .bind(ticket_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".into()))?;

    let plan = plan_claim(
        &row.ticket.snapshot()?,
        auth.user_id,
        row.event_resolved_at,
        Duration::seconds(config.claim_delay_secs),
        Utc::now(),
    )?;

    // On-chain payout is not executed yet; the claim records a placeholder
    // id that an operator replaces once the transfer is sent.
    let claim_reference = format!("pending-{}", Uuid::new_v4());

    // The status guard makes a concurrent second claim update nothing.
    let sql = format!(
        "UPDATE tickets \
         SET status = 'claimed', claim_net_amount = $3, claim_fee_amount = $4, \
             claim_tx_signature = $5, claimed_at = NOW() \
         WHERE id = $1 AND user_id = $2 AND status IN ('won', 'refunded') \
         RETURNING {}",
        TICKET_COLUMNS
    );
    let ticket = sqlx::query_as::<_, TicketRow>(&sql)
        .bind(plan.ticket_id)
        .bind(auth.user_id)
        .bind(plan.amounts.net)
        .bind(plan.amounts.fee)
        .bind(&claim_reference)
        .fetch_optional(db_pool)
        .await?
        .ok_or(ApiError::Settlement(SettlementError::AlreadyClaimed))?;

    info!(
        "Claimed ticket: ticket_id={}, user_id={}, net={}, fee={}, reference={}",
        ticket.id, auth.user_id, plan.amounts.net, plan.amounts.fee, claim_reference
    );

    Ok(ClaimResult {
        ticket,
        amounts: plan.amounts,
    })
}

#[post("/claim")]
pub async fn claim_ticket(
    db_pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    req: HttpRequest,
    body: web::Json<ClaimTicketInput>,
) -> Result<HttpResponse, ApiError> {
    let auth = extract_auth_user(&req)?;
    body.validate()?;

    let result = process_claim(&db_pool, &config, &auth, body.ticket_id).await?;
    Ok(ok(result))
}

/// Claims every eligible ticket one after another. Not atomic: a failure on
/// one ticket is reported and the rest are still attempted.
#[post("/claim-all")]
pub async fn claim_all_tickets(
    db_pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let auth = extract_auth_user(&req)?;

    let ticket_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM tickets WHERE user_id = $1 AND status IN ('won', 'refunded') ORDER BY id",
    )
    .bind(auth.user_id)
    .fetch_all(db_pool.get_ref())
    .await?;

    let mut claimed = Vec::new();
    let mut failed = Vec::new();
    let mut total_gross = Decimal::ZERO;
    let mut total_fee = Decimal::ZERO;
    let mut total_net = Decimal::ZERO;

    for ticket_id in ticket_ids {
        match process_claim(&db_pool, &config, &auth, ticket_id).await {
            Ok(result) => {
                total_gross += result.amounts.gross;
                total_fee += result.amounts.fee;
                total_net += result.amounts.net;
                claimed.push(result);
            }
            Err(e) => {
                warn!("Claim-all skipped ticket {}: {}", ticket_id, e);
                let message = if e.is_internal() {
                    "Internal server error".to_string()
                } else {
                    e.to_string()
                };
                failed.push(json!({ "ticket_id": ticket_id, "error": message }));
            }
        }
    }

    Ok(ok(json!({
        "claimed_count": claimed.len(),
        "total_gross": total_gross,
        "total_fee": total_fee,
        "total_net": total_net,
        "claimed": claimed,
        "failed": failed
    })))
}
