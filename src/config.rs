use crate::errors::{ServiceError, ServiceResult};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_MAX_SUBSCRIPTIONS: usize = 5;
pub const DEFAULT_EVENTS_PER_SECOND: u32 = 2;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Runtime configuration for the backend connection and the report layer.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub anon_key: String,
    pub schema: String,
    pub max_subscriptions: usize,
    pub events_per_second: u32,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub dashboard_cache_ttl: Duration,
}

impl AppConfig {
    pub fn new(backend_url: &str, anon_key: &str) -> Self {
        Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
            max_subscriptions: DEFAULT_MAX_SUBSCRIPTIONS,
            events_per_second: DEFAULT_EVENTS_PER_SECOND,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            dashboard_cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }

    /// Load configuration from the process environment, reading `.env` first
    /// when one is present.
    pub fn from_env() -> ServiceResult<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Used by `from_env` and by tests.
    pub fn from_lookup<F>(lookup: F) -> ServiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = required(&lookup, "SUPABASE_URL")?;
        let anon_key = required(&lookup, "SUPABASE_ANON_KEY")?;

        let mut config = Self::new(&backend_url, &anon_key);
        if let Some(schema) = lookup("SUPABASE_SCHEMA").filter(|s| !s.trim().is_empty()) {
            config.schema = schema;
        }
        config.max_subscriptions =
            optional(&lookup, "MAX_REALTIME_SUBSCRIPTIONS", DEFAULT_MAX_SUBSCRIPTIONS)?;
        config.events_per_second =
            optional(&lookup, "REALTIME_EVENTS_PER_SECOND", DEFAULT_EVENTS_PER_SECOND)?;
        config.request_timeout = Duration::from_secs(optional(
            &lookup,
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        config.connect_timeout = Duration::from_secs(optional(
            &lookup,
            "CONNECT_TIMEOUT_SECS",
            DEFAULT_CONNECT_TIMEOUT_SECS,
        )?);
        config.dashboard_cache_ttl = Duration::from_secs(optional(
            &lookup,
            "DASHBOARD_CACHE_TTL_SECS",
            DEFAULT_CACHE_TTL_SECS,
        )?);

        if config.max_subscriptions == 0 {
            return Err(ServiceError::Configuration(
                "MAX_REALTIME_SUBSCRIPTIONS must be at least 1".to_string(),
            ));
        }
        if config.events_per_second == 0 {
            return Err(ServiceError::Configuration(
                "REALTIME_EVENTS_PER_SECOND must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}

fn required<F>(lookup: &F, key: &str) -> ServiceResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ServiceError::Configuration(format!("{} is not set", key)))
}

fn optional<F, T>(lookup: &F, key: &str, default: T) -> ServiceResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().map_err(|_| {
            ServiceError::Configuration(format!("{} has an invalid value: {}", key, raw))
        }),
        _ => Ok(default),
    }
}
