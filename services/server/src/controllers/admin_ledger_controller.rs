use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::info;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::errors::ApiError;
use crate::services::{audit_log, failed_transactions};
use crate::types::admin_types::{FailedTransactionQuery, ResolveFailedTransactionInput};
use crate::utils::jwt::extract_auth_user;
use crate::utils::responses::ok;

#[get("/failed-transactions")]
pub async fn list_failed_transactions(
    db_pool: web::Data<PgPool>,
    query: web::Query<FailedTransactionQuery>,
) -> Result<HttpResponse, ApiError> {
    let entries = failed_transactions::list(db_pool.get_ref(), query.resolved).await?;
    Ok(ok(json!({
        "count": entries.len(),
        "failed_transactions": entries
    })))
}

#[post("/failed-transactions/{id}/resolve")]
pub async fn resolve_failed_transaction(
    db_pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<ResolveFailedTransactionInput>,
) -> Result<HttpResponse, ApiError> {
    let admin = extract_auth_user(&req)?;
    body.validate()?;
    let id = path.into_inner();

    let mut tx = db_pool.begin().await?;
    let entry = failed_transactions::resolve(&mut *tx, id, admin.user_id, body.notes.trim())
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("Failed transaction not found or already resolved".into())
        })?;

    audit_log::record(
        &mut *tx,
        admin.user_id,
        "failed_transaction.resolve",
        "failed_transaction",
        id,
        json!({ "tx_signature": entry.tx_signature, "notes": entry.resolution_notes }),
    )
    .await?;

    tx.commit().await?;

    info!("Failed transaction {} resolved by admin {}", id, admin.user_id);
    Ok(ok(entry))
}
