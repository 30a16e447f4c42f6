pub mod aggregator;
pub mod cache;
pub mod calendar;
pub mod csv_export;
pub mod dashboard;
pub mod receipt;
pub mod service;
pub mod types;

pub use cache::{DashboardCache, DEFAULT_CACHE_TTL};
pub use csv_export::CsvExport;
pub use dashboard::{DashboardSummary, MONTHLY_GOAL};
pub use receipt::ReceiptRenderer;
pub use service::ReportService;
pub use types::{
    DonorSummary, MemberSummary, MonthlyBucket, MonthlyReport, ReportOutput, ReportRequest, ReportType,
    ReportWindow, TopDonor, TypeSummary, WeeklyBucket, YearlyReport,
};
