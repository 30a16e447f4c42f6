use chrono::NaiveDate;
use log::debug;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

type CacheKey = (Uuid, NaiveDate);

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Short-lived memory cache for per-church, per-day aggregates.
///
/// Entries are fresh for `ttl`; anything older than twice that is dropped
/// on every lookup. A miss always means recomputing from the records.
pub struct DashboardCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry<V>>>,
}

impl<V: Clone + Send> DashboardCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, church_id: Uuid, date: NaiveDate) -> Option<V> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let max_age = self.ttl * 2;
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.stored_at) <= max_age);
        if entries.len() < before {
            debug!("Evicted {} stale cache entries", before - entries.len());
        }

        entries
            .get(&(church_id, date))
            .filter(|entry| now.duration_since(entry.stored_at) < self.ttl)
            .map(|entry| entry.value.clone())
    }

    pub async fn insert(&self, church_id: Uuid, date: NaiveDate, value: V) {
        self.entries.lock().await.insert(
            (church_id, date),
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Read-through lookup: return the fresh entry, or compute, store and
    /// return a new one. Failed computations are not cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(
        &self,
        church_id: Uuid,
        date: NaiveDate,
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(church_id, date).await {
            debug!("Using cached dashboard data for church {} on {}", church_id, date);
            return Ok(value);
        }

        let value = compute().await?;
        self.insert(church_id, date, value.clone()).await;
        Ok(value)
    }

    /// Drop every entry of a church, e.g. after a donation was recorded.
    pub async fn invalidate(&self, church_id: Uuid) {
        self.entries.lock().await.retain(|(id, _), _| *id != church_id);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<V: Clone + Send> Default for DashboardCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
