//! Core library of the church donation administration app: a bounded
//! realtime connection manager over the hosted backend, donation report
//! aggregation with CSV and receipt output, and church settings.

pub mod auth;
pub mod backend;
pub mod config;
pub mod context;
pub mod domains;
pub mod errors;
pub mod validation;

pub use config::AppConfig;
pub use context::{init_logging, AppContext};

/// Build the application context from the environment, with logging set up.
pub fn initialize() -> errors::ServiceResult<AppContext> {
    AppContext::initialize()
}
