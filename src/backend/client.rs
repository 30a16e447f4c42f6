use crate::backend::query::{Filter, SelectQuery};
use crate::backend::realtime::{ChangeEvent, ChangeEventType, LocalRealtimeHub, RealtimeTransport};
use crate::backend::rest::RestBackendClient;
use crate::config::AppConfig;
use crate::errors::{BackendError, BackendResult};
use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Row-level access to the hosted backend.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Read rows matching a query
    async fn select(&self, query: &SelectQuery) -> BackendResult<Vec<Value>>;

    /// Count rows matching the filters without fetching them
    async fn count(&self, table: &str, filters: &[Filter]) -> BackendResult<u64>;

    /// Insert one object or an array of objects; returns the stored rows
    async fn insert(&self, table: &str, rows: Value) -> BackendResult<Vec<Value>>;

    /// Patch matching rows; returns the updated rows
    async fn update(&self, table: &str, filters: &[Filter], changes: Value) -> BackendResult<Vec<Value>>;

    /// Delete matching rows; returns the removed rows
    async fn delete(&self, table: &str, filters: &[Filter]) -> BackendResult<Vec<Value>>;
}

/// Decode backend rows into typed records.
pub fn rows_into<T: DeserializeOwned>(rows: Vec<Value>) -> BackendResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(BackendError::from))
        .collect()
}

/// Encode a typed payload for insert/update.
pub fn to_row<T: Serialize>(value: &T) -> BackendResult<Value> {
    serde_json::to_value(value).map_err(BackendError::from)
}

/// Fixed options the shared client is created with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientOptions {
    pub persist_session: bool,
    pub auto_refresh_token: bool,
    pub detect_session_in_url: bool,
    pub events_per_second: u32,
    pub schema: String,
}

impl ClientOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            persist_session: true,
            auto_refresh_token: true,
            detect_session_in_url: false,
            events_per_second: config.events_per_second,
            schema: config.schema.clone(),
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            persist_session: true,
            auto_refresh_token: true,
            detect_session_in_url: false,
            events_per_second: crate::config::DEFAULT_EVENTS_PER_SECOND,
            schema: crate::config::DEFAULT_SCHEMA.to_string(),
        }
    }
}

/// The single backend handle of the process: row access plus realtime.
pub struct Backend {
    client: Arc<dyn BackendClient>,
    realtime: Arc<dyn RealtimeTransport>,
    options: ClientOptions,
}

impl Backend {
    pub fn new(
        client: Arc<dyn BackendClient>,
        realtime: Arc<dyn RealtimeTransport>,
        options: ClientOptions,
    ) -> Self {
        Self { client, realtime, options }
    }

    /// Build the REST client and the local realtime hub from configuration.
    ///
    /// Writes made through this handle are published to the hub, so channels
    /// opened on it see local changes.
    pub fn connect(config: &AppConfig) -> BackendResult<Self> {
        let options = ClientOptions::from_config(config);
        let rest = Arc::new(RestBackendClient::new(config)?);
        let hub = Arc::new(LocalRealtimeHub::new(options.events_per_second));
        let client = Arc::new(NotifyingClient::new(rest, hub.clone(), &options.schema));
        debug!(
            "Backend client created for {} (schema {}, {} realtime events/s)",
            config.backend_url, options.schema, options.events_per_second
        );
        Ok(Self::new(client, hub, options))
    }

    pub fn client(&self) -> &Arc<dyn BackendClient> {
        &self.client
    }

    pub fn realtime(&self) -> &Arc<dyn RealtimeTransport> {
        &self.realtime
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}

/// Decorator that publishes successful writes to a realtime hub.
pub struct NotifyingClient {
    inner: Arc<dyn BackendClient>,
    hub: Arc<LocalRealtimeHub>,
    schema: String,
}

impl NotifyingClient {
    pub fn new(inner: Arc<dyn BackendClient>, hub: Arc<LocalRealtimeHub>, schema: &str) -> Self {
        Self { inner, hub, schema: schema.to_string() }
    }

    fn publish_all(&self, table: &str, event_type: ChangeEventType, rows: &[Value]) {
        for row in rows {
            self.hub.publish(ChangeEvent::new(&self.schema, table, event_type, row.clone()));
        }
    }
}

#[async_trait]
impl BackendClient for NotifyingClient {
    async fn select(&self, query: &SelectQuery) -> BackendResult<Vec<Value>> {
        self.inner.select(query).await
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> BackendResult<u64> {
        self.inner.count(table, filters).await
    }

    async fn insert(&self, table: &str, rows: Value) -> BackendResult<Vec<Value>> {
        let stored = self.inner.insert(table, rows).await?;
        self.publish_all(table, ChangeEventType::Insert, &stored);
        Ok(stored)
    }

    async fn update(&self, table: &str, filters: &[Filter], changes: Value) -> BackendResult<Vec<Value>> {
        let updated = self.inner.update(table, filters, changes).await?;
        self.publish_all(table, ChangeEventType::Update, &updated);
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> BackendResult<Vec<Value>> {
        let removed = self.inner.delete(table, filters).await?;
        self.publish_all(table, ChangeEventType::Delete, &removed);
        Ok(removed)
    }
}
