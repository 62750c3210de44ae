use log::warn;
use serde_json::Value;
use sqlx::PgConnection;

const RESOLUTION_FEE_KEY: &str = "resolution_fee_bps";

/// An admin-set `resolution_fee_bps` row overrides the configured default.
pub async fn resolution_fee_bps(conn: &mut PgConnection, default: u32) -> Result<u32, sqlx::Error> {
    let value: Option<Value> =
        sqlx::query_scalar("SELECT value FROM platform_settings WHERE key = $1")
            .bind(RESOLUTION_FEE_KEY)
            .fetch_optional(conn)
            .await?;

    Ok(match value {
        None => default,
        Some(v) => parse_fee(&v).unwrap_or_else(|| {
            warn!("Ignoring invalid {} setting: {}", RESOLUTION_FEE_KEY, v);
            default
        }),
    })
}

fn parse_fee(value: &Value) -> Option<u32> {
    value
        .as_u64()
        .filter(|bps| *bps <= u64::from(settlement::BPS_DENOMINATOR))
        .map(|bps| bps as u32)
}
