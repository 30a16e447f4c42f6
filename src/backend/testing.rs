use crate::backend::client::{Backend, BackendClient, ClientOptions};
use crate::backend::realtime::LocalRealtimeHub;
use crate::backend::query::{compare_rows, Filter, SelectQuery};
use crate::errors::{BackendError, BackendResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory backend for tests. Evaluates the same filters, ordering and
/// limits the REST client would send; embedded joins must already be
/// present on the stored rows.
#[derive(Default)]
pub struct MockBackendClient {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    failures: Mutex<VecDeque<BackendError>>,
    calls: AtomicUsize,
}

impl MockBackendClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.tables.lock().unwrap().insert(table.to_string(), rows);
        self
    }

    /// Make the next call fail with the given error.
    pub fn fail_next(&self, error: BackendError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
    }

    fn begin_call(&self) -> BackendResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn matches_all(filters: &[Filter], row: &Value) -> bool {
    filters.iter().all(|f| f.matches(row))
}

#[async_trait]
impl BackendClient for MockBackendClient {
    async fn select(&self, query: &SelectQuery) -> BackendResult<Vec<Value>> {
        self.begin_call()?;
        let mut rows: Vec<Value> = self
            .rows(&query.table)
            .into_iter()
            .filter(|row| query.matches(row))
            .collect();
        for order in query.order.iter().rev() {
            rows.sort_by(|a, b| compare_rows(a, b, order));
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> BackendResult<u64> {
        self.begin_call()?;
        Ok(self.rows(table).iter().filter(|row| matches_all(filters, row)).count() as u64)
    }

    async fn insert(&self, table: &str, rows: Value) -> BackendResult<Vec<Value>> {
        self.begin_call()?;
        let new_rows = match rows {
            Value::Array(items) => items,
            single => vec![single],
        };
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(new_rows.clone());
        Ok(new_rows)
    }

    async fn update(&self, table: &str, filters: &[Filter], changes: Value) -> BackendResult<Vec<Value>> {
        self.begin_call()?;
        let mut tables = self.tables.lock().unwrap();
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| matches_all(filters, row)) {
                if let (Some(target), Some(patch)) = (row.as_object_mut(), changes.as_object()) {
                    for (key, value) in patch {
                        target.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> BackendResult<Vec<Value>> {
        self.begin_call()?;
        let mut tables = self.tables.lock().unwrap();
        let mut removed = Vec::new();
        if let Some(rows) = tables.get_mut(table) {
            let (gone, kept): (Vec<Value>, Vec<Value>) =
                rows.drain(..).partition(|row| matches_all(filters, row));
            *rows = kept;
            removed = gone;
        }
        Ok(removed)
    }
}

/// Wrap a mock client in a `Backend` with a fast local realtime hub.
pub fn mock_backend(client: Arc<MockBackendClient>) -> (Arc<Backend>, Arc<LocalRealtimeHub>) {
    let hub = Arc::new(LocalRealtimeHub::new(100));
    let backend = Backend::new(client, hub.clone(), ClientOptions::default());
    (Arc::new(backend), hub)
}
