use crate::backend::query::Filter;
use crate::errors::{BackendError, BackendResult};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};

const HUB_BUFFER: usize = 256;

/// Row change kinds delivered on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeEventType {
    Insert,
    Update,
    Delete,
}

/// One change notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub schema: String,
    pub table: String,
    pub event_type: ChangeEventType,
    pub new_record: Option<Value>,
    pub old_record: Option<Value>,
    pub commit_timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(schema: &str, table: &str, event_type: ChangeEventType, record: Value) -> Self {
        let (new_record, old_record) = match event_type {
            ChangeEventType::Delete => (None, Some(record)),
            _ => (Some(record), None),
        };
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            event_type,
            new_record,
            old_record,
            commit_timestamp: Utc::now(),
        }
    }

    /// The row the event is about: the new image, or the old one for deletes.
    pub fn record(&self) -> Option<&Value> {
        self.new_record.as_ref().or(self.old_record.as_ref())
    }
}

/// Callback registered for every change type on a channel.
pub type ChangeCallback = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// What a channel listens to.
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    pub channel_name: String,
    pub schema: String,
    pub table: String,
    pub filters: Vec<Filter>,
}

impl ChannelSpec {
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.schema != self.schema || event.table != self.table {
            return false;
        }
        match event.record() {
            Some(row) => self.filters.iter().all(|f| f.matches(row)),
            None => self.filters.is_empty(),
        }
    }
}

/// An open realtime channel.
pub trait RealtimeChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Stop delivering events. Safe to call more than once.
    fn unsubscribe(&self);

    fn is_closed(&self) -> bool;
}

/// Something that can open realtime channels.
pub trait RealtimeTransport: Send + Sync {
    fn open_channel(
        &self,
        spec: ChannelSpec,
        callback: ChangeCallback,
    ) -> BackendResult<Box<dyn RealtimeChannel>>;
}

/// In-process realtime fan-out.
///
/// Changes published to the hub are delivered to every open channel whose
/// table and filters match. Each channel runs its own dispatch task and
/// delivers at most `events_per_second` callbacks per second.
pub struct LocalRealtimeHub {
    sender: broadcast::Sender<ChangeEvent>,
    min_interval: Duration,
}

impl LocalRealtimeHub {
    pub fn new(events_per_second: u32) -> Self {
        let (sender, _) = broadcast::channel(HUB_BUFFER);
        let per_second = events_per_second.max(1);
        Self {
            sender,
            min_interval: Duration::from_millis(1000 / per_second as u64),
        }
    }

    /// Publish a change; returns how many channels were listening.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl RealtimeTransport for LocalRealtimeHub {
    fn open_channel(
        &self,
        spec: ChannelSpec,
        callback: ChangeCallback,
    ) -> BackendResult<Box<dyn RealtimeChannel>> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            BackendError::Realtime("realtime channels need a running tokio runtime".to_string())
        })?;

        let mut receiver = self.sender.subscribe();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let closed = Arc::new(AtomicBool::new(false));
        let task_closed = closed.clone();
        let min_interval = self.min_interval;
        let name = spec.channel_name.clone();

        runtime.spawn(async move {
            debug!("Realtime channel {} listening on {}.{}", spec.channel_name, spec.schema, spec.table);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    received = receiver.recv() => match received {
                        Ok(event) => {
                            if !spec.matches(&event) {
                                continue;
                            }
                            callback(event);
                            tokio::time::sleep(min_interval).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Realtime channel {} dropped {} events", spec.channel_name, skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
            task_closed.store(true, Ordering::SeqCst);
            debug!("Realtime channel {} stopped", spec.channel_name);
        });

        Ok(Box::new(LocalChannel {
            name,
            shutdown: Mutex::new(Some(shutdown_tx)),
            closed,
        }))
    }
}

struct LocalChannel {
    name: String,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    closed: Arc<AtomicBool>,
}

impl RealtimeChannel for LocalChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn unsubscribe(&self) {
        if let Ok(mut guard) = self.shutdown.lock() {
            if let Some(sender) = guard.take() {
                let _ = sender.send(());
            }
        }
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for LocalChannel {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn spec(name: &str, filters: Vec<Filter>) -> ChannelSpec {
        ChannelSpec {
            channel_name: name.to_string(),
            schema: "public".to_string(),
            table: "donations".to_string(),
            filters,
        }
    }

    #[tokio::test]
    async fn test_hub_delivers_matching_events() {
        let hub = LocalRealtimeHub::new(100);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let callback: ChangeCallback = Arc::new(move |event| {
            let _ = tx.send(event);
        });

        let channel = hub
            .open_channel(spec("donations-abc", vec![Filter::eq("church_id", "abc")]), callback)
            .unwrap();

        hub.publish(ChangeEvent::new("public", "members", ChangeEventType::Insert, json!({ "church_id": "abc" })));
        hub.publish(ChangeEvent::new("public", "donations", ChangeEventType::Insert, json!({ "church_id": "xyz" })));
        hub.publish(ChangeEvent::new("public", "donations", ChangeEventType::Delete, json!({ "church_id": "abc", "amount": 1000 })));

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(event.event_type, ChangeEventType::Delete);
        assert_eq!(event.record().unwrap()["amount"], 1000);

        channel.unsubscribe();
        assert!(channel.is_closed());
    }

    #[tokio::test]
    async fn test_unsubscribed_channel_stops_listening() {
        let hub = LocalRealtimeHub::new(100);
        let callback: ChangeCallback = Arc::new(|_| {});
        let channel = hub.open_channel(spec("donations", vec![]), callback).unwrap();
        assert_eq!(hub.listener_count(), 1);

        channel.unsubscribe();
        tokio::time::timeout(Duration::from_secs(2), async {
            while hub.listener_count() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn test_open_without_runtime_fails() {
        let hub = LocalRealtimeHub::new(2);
        let result = hub.open_channel(spec("donations", vec![]), Arc::new(|_| {}));
        assert!(matches!(result, Err(BackendError::Realtime(_))));
    }
}
