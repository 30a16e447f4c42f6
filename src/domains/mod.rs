pub mod connection;
pub mod donation;
pub mod member;
pub mod report;
pub mod settings;

pub use connection::ConnectionManager;
pub use report::ReportService;
pub use settings::SettingsService;
