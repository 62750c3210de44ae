pub mod audit_log;
pub mod auto_lock;
pub mod failed_transactions;
pub mod payment_verifier;
pub mod platform_settings;
