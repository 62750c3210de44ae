pub mod event_model;
pub mod failed_transaction_model;
pub mod ticket_model;
pub mod user_model;

/// Qualifies a comma-separated column list with a table alias for joins.
pub fn prefixed(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
