use std::collections::HashMap;

use actix_web::{get, web, HttpResponse};
use cache_client::keys::{event_key, EVENTS_ALL, TTL_EVENT, TTL_EVENTS};
use sqlx::PgPool;

use crate::errors::ApiError;
use crate::models::event_model::{EventOptionRow, EventRow, EventWithOptions, EVENT_COLUMNS};
use crate::types::event_types::EventQuery;
use crate::utils::responses::ok;

#[get("")]
pub async fn get_all_events(
    db_pool: web::Data<PgPool>,
    query: web::Query<EventQuery>,
) -> Result<HttpResponse, ApiError> {
    let use_cache = query.is_unfiltered();
    if use_cache {
        if let Some(events) = cache_client::cached::<Vec<EventWithOptions>>(EVENTS_ALL).await {
            return Ok(ok(events));
        }
    }

    let (limit, offset) = query.page();
    let sql = format!(
        "SELECT {} FROM events \
         WHERE status <> 'draft' \
           AND ($1::TEXT IS NULL OR status = $1) \
           AND ($2::TEXT IS NULL OR category = $2) \
         ORDER BY lock_time ASC, id DESC \
         LIMIT $3 OFFSET $4",
        EVENT_COLUMNS
    );
    let events = sqlx::query_as::<_, EventRow>(&sql)
        .bind(query.status.map(|s| s.as_str()))
        .bind(&query.category)
        .bind(limit)
        .bind(offset)
        .fetch_all(db_pool.get_ref())
        .await?;

    let ids: Vec<i64> = events.iter().map(|e| e.id).collect();
    let mut options_by_event: HashMap<i64, Vec<EventOptionRow>> = HashMap::new();
    for option in EventOptionRow::for_events(db_pool.get_ref(), &ids).await? {
        options_by_event.entry(option.event_id).or_default().push(option);
    }

    let events: Vec<EventWithOptions> = events
        .into_iter()
        .map(|event| {
            let options = options_by_event.remove(&event.id).unwrap_or_default();
            EventWithOptions::new(event, options)
        })
        .collect();

    if use_cache {
        cache_client::store(EVENTS_ALL, &events, TTL_EVENTS).await;
    }

    Ok(ok(events))
}

#[get("/{event_id}")]
pub async fn get_event_by_id(
    db_pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let event_id = path.into_inner();
    let cache_key = event_key(event_id);

    if let Some(event) = cache_client::cached::<EventWithOptions>(&cache_key).await {
        return Ok(ok(event));
    }

    let event = EventRow::find(db_pool.get_ref(), event_id)
        .await?
        .filter(|e| e.status != "draft")
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;
    let options = EventOptionRow::for_event(db_pool.get_ref(), event_id).await?;

    let detail = EventWithOptions::new(event, options);
    cache_client::store(&cache_key, &detail, TTL_EVENT).await;

    Ok(ok(detail))
}
