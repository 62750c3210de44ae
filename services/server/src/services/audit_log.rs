use serde_json::Value;
use sqlx::PgConnection;

/// Writes an audit row on the caller's connection so it commits or rolls
/// back together with the change it describes.
pub async fn record(
    conn: &mut PgConnection,
    actor_id: i64,
    action: &str,
    entity_type: &str,
    entity_id: i64,
    details: Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (actor_id, action, entity_type, entity_id, details)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(actor_id)
    .bind(action)
    .bind(entity_type)
    .bind(entity_id)
    .bind(details)
    .execute(conn)
    .await?;
    Ok(())
}
