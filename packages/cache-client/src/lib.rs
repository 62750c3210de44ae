pub mod cache_manager;
pub mod keys;

pub use cache_manager::{cached, invalidate_event, invalidate_listing, store, CacheManager};
