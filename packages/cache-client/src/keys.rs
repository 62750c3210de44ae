/// Unfiltered event listing.
pub const EVENTS_ALL: &str = "events:all";

pub const TTL_EVENTS: i64 = 300;
pub const TTL_EVENT: i64 = 60;

pub fn event_key(event_id: i64) -> String {
    format!("event:{}", event_id)
}

/// Keys that go stale whenever an event's status or counters change.
pub fn event_keys(event_id: i64) -> Vec<String> {
    vec![EVENTS_ALL.to_string(), event_key(event_id)]
}
