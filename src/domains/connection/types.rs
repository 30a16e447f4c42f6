use crate::backend::{ChangeCallback, ChangeEvent, Filter, RealtimeChannel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Usage above this share of the ceiling is reported as high.
pub const HIGH_USAGE_RATIO: f64 = 0.8;

/// A live, named realtime subscription owned by the `ConnectionManager`.
///
/// Clones share the same underlying channel.
#[derive(Clone)]
pub struct SubscriptionHandle {
    inner: Arc<SubscriptionInner>,
}

struct SubscriptionInner {
    channel_name: String,
    table_name: String,
    filters: Vec<Filter>,
    callback: ChangeCallback,
    channel: Box<dyn RealtimeChannel>,
}

impl SubscriptionHandle {
    pub(crate) fn new(
        channel_name: &str,
        table_name: &str,
        filters: Vec<Filter>,
        callback: ChangeCallback,
        channel: Box<dyn RealtimeChannel>,
    ) -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                channel_name: channel_name.to_string(),
                table_name: table_name.to_string(),
                filters,
                callback,
                channel,
            }),
        }
    }

    pub fn channel_name(&self) -> &str {
        &self.inner.channel_name
    }

    pub fn table_name(&self) -> &str {
        &self.inner.table_name
    }

    pub fn filters(&self) -> &[Filter] {
        &self.inner.filters
    }

    pub fn is_closed(&self) -> bool {
        self.inner.channel.is_closed()
    }

    /// Invoke the callback stored with this subscription.
    pub fn notify(&self, event: ChangeEvent) {
        (self.inner.callback)(event);
    }

    /// Whether two handles refer to the same live subscription.
    pub fn same_subscription(&self, other: &SubscriptionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn close(&self) {
        self.inner.channel.unsubscribe();
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("channel_name", &self.inner.channel_name)
            .field("table_name", &self.inner.table_name)
            .field("filters", &self.inner.filters)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Read-only snapshot of the subscription registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub active_count: usize,
    pub ceiling: usize,
    pub channel_names: Vec<String>,
}

impl ConnectionStatus {
    pub fn usage_percentage(&self) -> f64 {
        if self.ceiling == 0 {
            return 0.0;
        }
        self.active_count as f64 / self.ceiling as f64 * 100.0
    }

    pub fn is_high_usage(&self) -> bool {
        self.active_count as f64 > self.ceiling as f64 * HIGH_USAGE_RATIO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbStatus {
    Connected,
    Disconnected,
    Error,
}

/// Result of one monitoring probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: ConnectionStatus,
    pub db_status: DbStatus,
    pub checked_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.db_status == DbStatus::Connected && !self.status.is_high_usage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_thresholds() {
        let status = ConnectionStatus { active_count: 4, ceiling: 5, channel_names: vec![] };
        assert_eq!(status.usage_percentage(), 80.0);
        assert!(!status.is_high_usage());

        let status = ConnectionStatus { active_count: 5, ceiling: 5, channel_names: vec![] };
        assert!(status.is_high_usage());
    }
}
