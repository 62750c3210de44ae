pub mod admin_event_controller;
pub mod admin_ledger_controller;
pub mod auth_controller;
pub mod event_controller;
pub mod ticket_controller;
