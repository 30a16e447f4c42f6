use crate::auth::ChurchSession;
use crate::domains::connection::{execute_with_retry, RetryPolicy};
use crate::domains::donation::{DonationFilter, DonationRecord, DonationRepository};
use crate::domains::member::MemberRepository;
use crate::domains::report::aggregator::{
    donation_receipts, member_report, monthly_report, type_report, yearly_report,
};
use crate::domains::report::cache::DashboardCache;
use crate::domains::report::csv_export::{export_report, CsvExport};
use crate::domains::report::dashboard::{build_dashboard, dashboard_window, DashboardSummary};
use crate::domains::report::receipt::ReceiptRenderer;
use crate::domains::report::types::{DonorSummary, ReportOutput, ReportRequest, ReportType, ReportWindow};
use crate::errors::{DomainError, ServiceError, ServiceResult};
use chrono::NaiveDate;
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;

/// Loads donations for a report window and reduces them to report shapes,
/// CSV files, printable receipts and the dashboard summary.
pub struct ReportService {
    donations: Arc<dyn DonationRepository>,
    members: Arc<dyn MemberRepository>,
    cache: DashboardCache<DashboardSummary>,
    renderer: ReceiptRenderer,
    retry: RetryPolicy,
}

impl ReportService {
    pub fn new(
        donations: Arc<dyn DonationRepository>,
        members: Arc<dyn MemberRepository>,
        cache_ttl: Duration,
    ) -> ServiceResult<Self> {
        Ok(Self {
            donations,
            members,
            cache: DashboardCache::new(cache_ttl),
            renderer: ReceiptRenderer::new()?,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn load(&self, filter: DonationFilter) -> ServiceResult<Vec<DonationRecord>> {
        let records = execute_with_retry(|| self.donations.find_by_filter(&filter), self.retry)
            .await
            .map_err(|e| {
                error!("Failed to load donations for church {}: {}", filter.church_id, e);
                e
            })?;
        Ok(records)
    }

    async fn load_window(
        &self,
        session: &ChurchSession,
        request: &ReportRequest,
        window: ReportWindow,
    ) -> ServiceResult<Vec<DonationRecord>> {
        let mut filter = DonationFilter::for_church(session.church_id).between(window.start, window.end);
        if let Some(member_id) = request.member_id {
            filter = filter.member(member_id);
        }
        if let Some(type_id) = request.donation_type_id {
            filter = filter.donation_type(type_id);
        }
        self.load(filter).await
    }

    /// Build the requested report.
    pub async fn generate(&self, session: &ChurchSession, request: &ReportRequest) -> ServiceResult<ReportOutput> {
        let window = request.window()?;
        let records = self.load_window(session, request, window).await?;
        let output = aggregate(request, window, &records)?;
        info!(
            "Generated {} report for church {} ({} donations, {})",
            request.report_type,
            session.church_id,
            records.len(),
            window.period_label()
        );
        Ok(output)
    }

    /// Receipt entries per donor for the requested period.
    pub async fn receipts(&self, session: &ChurchSession, request: &ReportRequest) -> ServiceResult<Vec<DonorSummary>> {
        let request = ReportRequest {
            report_type: ReportType::DonationReceipt,
            ..request.clone()
        };
        match self.generate(session, &request).await? {
            ReportOutput::DonationReceipt(receipts) => Ok(receipts),
            other => Err(DomainError::Report(format!("unexpected {} output", other.report_type())).into()),
        }
    }

    /// The report as a CSV file.
    pub async fn export_csv(
        &self,
        session: &ChurchSession,
        request: &ReportRequest,
        issue_date: NaiveDate,
    ) -> ServiceResult<CsvExport> {
        let window = request.window()?;
        let output = self.generate(session, request).await?;
        export_report(&output, window, issue_date)
    }

    /// Printable receipt for one donor, signed by the session's church.
    pub fn render_receipt(
        &self,
        session: &ChurchSession,
        receipt: &DonorSummary,
        issue_date: NaiveDate,
    ) -> ServiceResult<String> {
        self.renderer.render_receipt(receipt, &session.church_name, issue_date)
    }

    /// Every receipt in one printable document.
    pub fn render_all_receipts(
        &self,
        session: &ChurchSession,
        receipts: &[DonorSummary],
        issue_date: NaiveDate,
    ) -> ServiceResult<String> {
        self.renderer.render_batch(receipts, &session.church_name, issue_date)
    }

    /// Dashboard summary for `today`, served from the cache while fresh.
    pub async fn dashboard(&self, session: &ChurchSession, today: NaiveDate) -> ServiceResult<DashboardSummary> {
        self.cache
            .get_or_try_insert_with(session.church_id, today, || async {
                let (start, end) = dashboard_window(today);
                debug!("Computing dashboard for church {} from {} to {}", session.church_id, start, end);
                let records = self
                    .load(DonationFilter::for_church(session.church_id).between(start, end))
                    .await?;
                let total_members = execute_with_retry(|| self.members.count_active(session.church_id), self.retry)
                    .await?;
                Ok::<_, ServiceError>(build_dashboard(&records, today, total_members as usize))
            })
            .await
    }

    /// Forget cached dashboards of the church, e.g. after new donations.
    pub async fn invalidate_dashboard(&self, session: &ChurchSession) {
        self.cache.invalidate(session.church_id).await;
    }
}

fn aggregate(request: &ReportRequest, window: ReportWindow, records: &[DonationRecord]) -> ServiceResult<ReportOutput> {
    let output = match request.report_type {
        ReportType::Monthly => {
            let (year, month) = request.month()?;
            ReportOutput::Monthly(monthly_report(records, year, month)?)
        }
        ReportType::Yearly => ReportOutput::Yearly(yearly_report(records, request.year()?)?),
        ReportType::Member => ReportOutput::Member(member_report(records)),
        ReportType::Type => ReportOutput::Type(type_report(records)),
        ReportType::DonationReceipt => ReportOutput::DonationReceipt(donation_receipts(records, window)),
    };
    Ok(output)
}
