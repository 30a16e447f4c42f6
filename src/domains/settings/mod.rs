pub mod confirm;
pub mod repository;
pub mod service;
pub mod types;

pub use confirm::{ConfirmationPrompt, FixedAnswer};
pub use repository::{BackendSettingsRepository, SettingsRepository};
pub use service::SettingsService;
pub use types::{
    generate_code, CatalogEntry, ChurchInfo, ChurchInfoUpdate, DeleteOutcome, DonationType,
    NewCatalogEntry, Position, PositionStatus,
};
