use crate::backend::Backend;
use crate::config::AppConfig;
use crate::domains::connection::ConnectionManager;
use crate::domains::donation::{BackendDonationRepository, DonationRepository};
use crate::domains::member::{BackendMemberRepository, MemberRepository};
use crate::domains::report::ReportService;
use crate::domains::settings::{BackendSettingsRepository, SettingsRepository, SettingsService};
use crate::errors::{ServiceError, ServiceResult};
use log::{debug, info};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Set up `env_logger`, defaulting `RUST_LOG` to `debug` in debug builds and
/// `info` in release builds. Safe to call more than once.
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        #[cfg(debug_assertions)]
        std::env::set_var("RUST_LOG", "debug");
        #[cfg(not(debug_assertions))]
        std::env::set_var("RUST_LOG", "info");
    }
    let _ = env_logger::try_init();
}

/// Composition root of the application.
///
/// Owns the one backend handle of the process and hands it to every
/// component that needs it. Each part is built on first use and then
/// shared; nothing lives in global state.
pub struct AppContext {
    config: AppConfig,
    backend: OnceCell<Arc<Backend>>,
    connections: OnceCell<Arc<ConnectionManager>>,
    donations: OnceCell<Arc<dyn DonationRepository>>,
    members: OnceCell<Arc<dyn MemberRepository>>,
    settings: OnceCell<Arc<SettingsService>>,
    reports: OnceCell<Arc<ReportService>>,
}

impl AppContext {
    /// Context for `config`. The backend connects on first use.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            backend: OnceCell::new(),
            connections: OnceCell::new(),
            donations: OnceCell::new(),
            members: OnceCell::new(),
            settings: OnceCell::new(),
            reports: OnceCell::new(),
        }
    }

    /// Context around an existing backend handle.
    pub fn with_backend(config: AppConfig, backend: Arc<Backend>) -> Self {
        let context = Self::new(config);
        let _ = context.backend.set(backend);
        context
    }

    /// Start logging and load configuration from the environment.
    pub fn initialize() -> ServiceResult<Self> {
        init_logging();
        info!("Starting church donation core");
        let config = AppConfig::from_env()?;
        debug!("Backend URL: {}", config.backend_url);
        debug!("Subscription ceiling: {}", config.max_subscriptions);
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The shared backend handle, connected on the first call.
    pub fn backend(&self) -> ServiceResult<Arc<Backend>> {
        self.backend
            .get_or_try_init(|| {
                info!("Connecting to backend at {}", self.config.backend_url);
                Backend::connect(&self.config).map(Arc::new).map_err(|e| {
                    ServiceError::ServiceUnavailable(format!("Backend connection failed: {}", e))
                })
            })
            .cloned()
    }

    pub fn connections(&self) -> ServiceResult<Arc<ConnectionManager>> {
        self.connections
            .get_or_try_init(|| {
                Ok::<_, ServiceError>(Arc::new(ConnectionManager::new(
                    self.backend()?,
                    self.config.max_subscriptions,
                )))
            })
            .cloned()
    }

    pub fn donations(&self) -> ServiceResult<Arc<dyn DonationRepository>> {
        self.donations
            .get_or_try_init(|| {
                let repo: Arc<dyn DonationRepository> = Arc::new(BackendDonationRepository::new(self.backend()?));
                Ok::<_, ServiceError>(repo)
            })
            .cloned()
    }

    pub fn members(&self) -> ServiceResult<Arc<dyn MemberRepository>> {
        self.members
            .get_or_try_init(|| {
                let repo: Arc<dyn MemberRepository> = Arc::new(BackendMemberRepository::new(self.backend()?));
                Ok::<_, ServiceError>(repo)
            })
            .cloned()
    }

    pub fn settings(&self) -> ServiceResult<Arc<SettingsService>> {
        self.settings
            .get_or_try_init(|| {
                let repo: Arc<dyn SettingsRepository> = Arc::new(BackendSettingsRepository::new(self.backend()?));
                Ok::<_, ServiceError>(Arc::new(SettingsService::new(repo)))
            })
            .cloned()
    }

    pub fn reports(&self) -> ServiceResult<Arc<ReportService>> {
        self.reports
            .get_or_try_init(|| {
                let service = ReportService::new(
                    self.donations()?,
                    self.members()?,
                    self.config.dashboard_cache_ttl,
                )?;
                Ok::<_, ServiceError>(Arc::new(service))
            })
            .cloned()
    }

    /// Close every live subscription, e.g. before shutting down.
    pub fn shutdown(&self) {
        if let Some(connections) = self.connections.get() {
            let closed = connections.unsubscribe_all();
            info!("Shutdown closed {} subscriptions", closed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{mock_backend, MockBackendClient};
    use crate::backend::{tables, ChangeCallback};

    fn context() -> AppContext {
        let (backend, _) = mock_backend(Arc::new(MockBackendClient::new()));
        AppContext::with_backend(AppConfig::new("https://example.supabase.co", "anon"), backend)
    }

    #[tokio::test]
    async fn test_single_backend_handle() {
        let context = context();
        let backend = context.backend().unwrap();
        let connections = context.connections().unwrap();

        assert!(Arc::ptr_eq(&backend, &context.backend().unwrap()));
        assert!(Arc::ptr_eq(&backend, &connections.client()));
        assert!(Arc::ptr_eq(&connections, &context.connections().unwrap()));
        assert!(Arc::ptr_eq(&context.reports().unwrap(), &context.reports().unwrap()));
        assert_eq!(connections.ceiling(), 5);
    }

    #[tokio::test]
    async fn test_shutdown_closes_subscriptions() {
        let context = context();
        let connections = context.connections().unwrap();
        let callback: ChangeCallback = Arc::new(|_| {});
        connections.subscribe("donations-live", tables::DONATIONS, vec![], callback.clone()).unwrap();
        connections.subscribe("members-live", tables::MEMBERS, vec![], callback).unwrap();

        context.shutdown();
        assert_eq!(connections.status().active_count, 0);
    }
}
