use crate::backend::{tables, Backend, ChangeCallback, ChannelSpec, Filter, SelectQuery};
use crate::domains::connection::types::{ConnectionStatus, DbStatus, HealthReport, SubscriptionHandle};
use chrono::Utc;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default polling interval of the connection monitor.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(30);

/// Owns the shared backend handle and a bounded registry of named realtime
/// subscriptions.
///
/// Registry operations are short synchronous critical sections; callbacks
/// run on the channel tasks and never hold the registry lock.
pub struct ConnectionManager {
    backend: Arc<Backend>,
    ceiling: usize,
    subscriptions: Mutex<BTreeMap<String, SubscriptionHandle>>,
}

impl ConnectionManager {
    pub fn new(backend: Arc<Backend>, ceiling: usize) -> Self {
        Self {
            backend,
            ceiling,
            subscriptions: Mutex::new(BTreeMap::new()),
        }
    }

    /// The shared backend handle. Every call returns the same instance.
    pub fn client(&self) -> Arc<Backend> {
        self.backend.clone()
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    fn registry(&self) -> MutexGuard<'_, BTreeMap<String, SubscriptionHandle>> {
        // A panic inside a callback never happens under this lock, so a
        // poisoned registry still holds consistent data.
        self.subscriptions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribe to all change events on `table_name` matching `filters`.
    ///
    /// Returns the existing handle if `channel_name` is already live; the
    /// stored callback is kept and the new one is ignored. Returns `None`
    /// when the ceiling is reached or the channel cannot be opened.
    pub fn subscribe(
        &self,
        channel_name: &str,
        table_name: &str,
        filters: Vec<Filter>,
        callback: ChangeCallback,
    ) -> Option<SubscriptionHandle> {
        let mut registry = self.registry();

        if let Some(existing) = registry.get(channel_name) {
            info!("Reusing existing subscription: {}", channel_name);
            return Some(existing.clone());
        }

        if registry.len() >= self.ceiling {
            warn!("Max connections reached ({}). Skipping subscription {}.", self.ceiling, channel_name);
            return None;
        }

        let spec = ChannelSpec {
            channel_name: channel_name.to_string(),
            schema: self.backend.options().schema.clone(),
            table: table_name.to_string(),
            filters: filters.clone(),
        };

        let channel = match self.backend.realtime().open_channel(spec, callback.clone()) {
            Ok(channel) => channel,
            Err(e) => {
                error!("Failed to open realtime channel {}: {}", channel_name, e);
                return None;
            }
        };

        let handle = SubscriptionHandle::new(channel_name, table_name, filters, callback, channel);
        registry.insert(channel_name.to_string(), handle.clone());
        info!("Active subscriptions: {}", registry.len());
        Some(handle)
    }

    /// Close and forget one subscription. Unknown names are a no-op.
    pub fn unsubscribe(&self, channel_name: &str) -> bool {
        let removed = self.registry().remove(channel_name);
        match removed {
            Some(handle) => {
                handle.close();
                info!("Unsubscribed: {}. Active: {}", channel_name, self.registry().len());
                true
            }
            None => {
                debug!("Unsubscribe ignored, no channel named {}", channel_name);
                false
            }
        }
    }

    /// Close every live subscription. Returns how many were closed.
    pub fn unsubscribe_all(&self) -> usize {
        let drained: Vec<(String, SubscriptionHandle)> =
            std::mem::take(&mut *self.registry()).into_iter().collect();
        for (name, handle) in &drained {
            handle.close();
            info!("Unsubscribed: {}", name);
        }
        drained.len()
    }

    /// Snapshot of the registry at call time.
    pub fn status(&self) -> ConnectionStatus {
        let registry = self.registry();
        ConnectionStatus {
            active_count: registry.len(),
            ceiling: self.ceiling,
            channel_names: registry.keys().cloned().collect(),
        }
    }

    /// Status snapshot that also warns when usage runs high.
    pub fn monitor_connection(&self) -> ConnectionStatus {
        let status = self.status();
        if status.is_high_usage() {
            warn!(
                "High connection usage: {}/{} ({:?})",
                status.active_count, status.ceiling, status.channel_names
            );
        }
        status
    }

    /// Probe the backend with a one-row read and combine it with the
    /// registry status.
    pub async fn check_health(&self) -> HealthReport {
        let status = self.monitor_connection();
        let probe = SelectQuery::new(tables::CHURCHES).columns("church_id").limit(1);

        let (db_status, error) = match self.backend.client().select(&probe).await {
            Ok(_) => (DbStatus::Connected, None),
            Err(e) if e.is_transient() => (DbStatus::Disconnected, Some(e.to_string())),
            Err(e) => (DbStatus::Error, Some(e.to_string())),
        };

        HealthReport {
            status,
            db_status,
            checked_at: Utc::now(),
            error,
        }
    }

    /// Poll `check_health` on a background task until the manager is dropped.
    pub fn spawn_monitor(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let manager = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                let report = manager.check_health().await;
                match report.db_status {
                    DbStatus::Connected => debug!(
                        "Connection check: db connected, {}/{} subscriptions",
                        report.status.active_count, report.status.ceiling
                    ),
                    _ => warn!(
                        "Connection check: db {:?} ({})",
                        report.db_status,
                        report.error.as_deref().unwrap_or("no details")
                    ),
                }
            }
        })
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let closed = self.unsubscribe_all();
        if closed > 0 {
            debug!("Connection manager shut down, closed {} subscriptions", closed);
        }
    }
}
