use std::time::Duration;

use log::{error, info};
use sqlx::{PgExecutor, PgPool};
use tokio::task::JoinHandle;

/// Flips every open event whose lock time has passed to `locked`.
pub async fn lock_expired_events(pool: &PgPool) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE events
        SET status = 'locked', updated_at = NOW()
        WHERE status = 'open' AND lock_time <= NOW()
        RETURNING id
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Locks a single event if it is still open. Used when a purchase notices
/// the lock time has passed before the sweeper did.
pub async fn lock_event<'e, E: PgExecutor<'e>>(
    executor: E,
    event_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE events
        SET status = 'locked', updated_at = NOW()
        WHERE id = $1 AND status = 'open'
        "#,
    )
    .bind(event_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub fn start_auto_lock_sweeper(pool: PgPool, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match lock_expired_events(&pool).await {
                Ok(ids) if ids.is_empty() => {}
                Ok(ids) => {
                    info!("Auto-locked events past their lock time: {:?}", ids);
                    for id in ids {
                        cache_client::invalidate_event(id).await;
                    }
                }
                Err(e) => error!("Auto-lock sweep failed: {}", e),
            }
        }
    })
}
