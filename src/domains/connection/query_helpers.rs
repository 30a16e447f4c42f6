use crate::errors::is_transient_message;
use futures::future::join_all;
use log::{debug, warn};
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_BATCH_SIZE: usize = 3;
pub const BATCH_PAUSE: Duration = Duration::from_millis(100);
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// How often and how patiently `execute_with_retry` retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// Wait before the attempt following `attempt` (1-based).
    fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Run `query` until it succeeds or `max_retries` attempts have failed.
///
/// Failures whose message mentions a connection or timeout problem wait
/// `base_delay * attempt` before the next attempt; other failures are
/// retried immediately. The last error is returned once attempts run out.
pub async fn execute_with_retry<T, E, F, Fut>(mut query: F, policy: RetryPolicy) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.max_retries.max(1);
    let mut attempt = 1;
    loop {
        match query().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let message = e.to_string();
                warn!("Query attempt {}/{} failed: {}", attempt, attempts, message);
                if attempt >= attempts {
                    return Err(e);
                }
                if is_transient_message(&message) {
                    let delay = policy.delay_after(attempt);
                    debug!("Backing off {:?} before retrying", delay);
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}

/// Run queries in groups of `batch_size`, one group at a time.
///
/// Each group runs concurrently and is awaited as a whole, with a short
/// pause before the next group. Results keep the input order. The first
/// failure (in input order) of a group stops the batch.
pub async fn batch_query<T, E, F, Fut>(queries: Vec<F>, batch_size: usize) -> Result<Vec<T>, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let batch_size = batch_size.max(1);
    let total = queries.len();
    let mut results = Vec::with_capacity(total);
    let mut pending = queries.into_iter().peekable();
    let mut group = 0;

    while pending.peek().is_some() {
        if group > 0 {
            tokio::time::sleep(BATCH_PAUSE).await;
        }
        let chunk: Vec<Fut> = pending.by_ref().take(batch_size).map(|query| query()).collect();
        debug!("Running query batch {} ({} queries)", group + 1, chunk.len());
        for outcome in join_all(chunk).await {
            results.push(outcome?);
        }
        group += 1;
    }

    Ok(results)
}

/// Wrap `f` so that a burst of calls runs it once, `delay` after the last
/// call of the burst.
pub fn debounce_query<A, F, Fut>(f: F, delay: Duration) -> DebouncedQuery<A>
where
    A: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let f = Arc::new(f);
    DebouncedQuery {
        invoke: Arc::new(move |args: A| -> JoinHandle<()> { tokio::spawn(f(args)) }),
        delay,
        pending: Mutex::new(None),
    }
}

type Invoker<A> = Arc<dyn Fn(A) -> JoinHandle<()> + Send + Sync>;

pub struct DebouncedQuery<A> {
    invoke: Invoker<A>,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<A: Send + 'static> DebouncedQuery<A> {
    /// Schedule a call, replacing any call still waiting out its delay.
    ///
    /// Must be called from within a tokio runtime.
    pub fn call(&self, args: A) {
        let invoke = self.invoke.clone();
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached so a later call cannot abort a query already running
            let _ = invoke(args);
        });

        let mut pending = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }
    }

    /// Drop the waiting call, if any.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = pending.take() {
            previous.abort();
        }
    }
}

impl<A> Drop for DebouncedQuery<A> {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(task) = pending.take() {
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BackendError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_calls_exactly_max_retries() {
        let calls = AtomicUsize::new(0);
        let started = Instant::now();

        let result: Result<(), BackendError> = execute_with_retry(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(BackendError::Connection(format!("connection refused #{}", n))) }
            },
            RetryPolicy::default(),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(BackendError::Connection(message)) => assert_eq!(message, "connection refused #3"),
            other => panic!("unexpected result: {:?}", other),
        }
        // 1000ms after the first failure, 2000ms after the second, none after the last
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(3000) && elapsed < Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_errors_retry_without_delay() {
        let calls = AtomicUsize::new(0);
        let started = Instant::now();

        let result: Result<u32, String> = execute_with_retry(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("permission denied for table donations".to_string())
                    } else {
                        Ok(42)
                    }
                }
            },
            RetryPolicy::default(),
        )
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_message_is_case_insensitive() {
        let calls = AtomicUsize::new(0);
        let started = Instant::now();

        let result: Result<(), String> = execute_with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("Request Timeout".to_string()) }
            },
            RetryPolicy::new(2, Duration::from_millis(100)),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100) && elapsed < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_query_keeps_order_and_limits_concurrency() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let queries: Vec<_> = (0..7u64)
            .map(|i| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                move || async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    // Later queries finish first within a group
                    tokio::time::sleep(Duration::from_millis(50 - i * 5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<u64, String>(i * 10)
                }
            })
            .collect();

        let results = batch_query(queries, DEFAULT_BATCH_SIZE).await.unwrap();
        assert_eq!(results, vec![0, 10, 20, 30, 40, 50, 60]);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_batch_query_surfaces_failure() {
        let queries: Vec<_> = (0..4)
            .map(|i| move || async move { if i == 1 { Err("boom".to_string()) } else { Ok(i) } })
            .collect();
        assert_eq!(batch_query(queries, 2).await, Err("boom".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_runs_once_after_quiet_period() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let debounced = debounce_query(
            move |term: String| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(term);
                }
            },
            DEFAULT_DEBOUNCE_DELAY,
        );

        debounced.call("김".to_string());
        tokio::time::sleep(Duration::from_millis(200)).await;
        debounced.call("김철".to_string());
        tokio::time::sleep(Duration::from_millis(200)).await;
        debounced.call("김철수".to_string());

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(seen.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(*seen.lock().unwrap(), vec!["김철수".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_cancel() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let debounced = debounce_query(
            move |_: ()| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
            Duration::from_millis(500),
        );

        debounced.call(());
        debounced.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
