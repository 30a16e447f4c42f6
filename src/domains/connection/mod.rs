pub mod manager;
pub mod query_helpers;
pub mod types;

pub use manager::{ConnectionManager, DEFAULT_MONITOR_INTERVAL};
pub use query_helpers::{batch_query, debounce_query, execute_with_retry, DebouncedQuery, RetryPolicy};
pub use types::{ConnectionStatus, DbStatus, HealthReport, SubscriptionHandle};
