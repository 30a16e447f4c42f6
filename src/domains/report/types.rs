use crate::domains::donation::DonationRecord;
use crate::errors::{DomainError, DomainResult, ValidationError};
use crate::validation::{parse_year_month, ValidationBuilder};
use crate::domains::report::calendar::{month_bounds, year_bounds};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The five report shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    DonationReceipt,
    Monthly,
    Yearly,
    Member,
    Type,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::DonationReceipt => "donation_receipt",
            ReportType::Monthly => "monthly",
            ReportType::Yearly => "yearly",
            ReportType::Member => "member",
            ReportType::Type => "type",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "donation_receipt" => Ok(ReportType::DonationReceipt),
            "monthly" => Ok(ReportType::Monthly),
            "yearly" => Ok(ReportType::Yearly),
            "member" => Ok(ReportType::Member),
            "type" => Ok(ReportType::Type),
            other => Err(DomainError::Validation(ValidationError::invalid_value(
                "report_type",
                &format!("unknown report type '{}'", other),
            ))),
        }
    }
}

/// What the operator asked for on the report screen.
///
/// Monthly reports use `selected_month` (`YYYY-MM`), yearly reports use
/// `selected_year`; receipts use `selected_year` when set and the explicit
/// date range otherwise; member and type reports use the date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub report_type: ReportType,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub selected_month: Option<String>,
    pub selected_year: Option<i32>,
    pub member_id: Option<Uuid>,
    pub donation_type_id: Option<Uuid>,
}

impl ReportRequest {
    fn empty(report_type: ReportType) -> Self {
        Self {
            report_type,
            start_date: None,
            end_date: None,
            selected_month: None,
            selected_year: None,
            member_id: None,
            donation_type_id: None,
        }
    }

    pub fn monthly(year_month: &str) -> Self {
        Self { selected_month: Some(year_month.to_string()), ..Self::empty(ReportType::Monthly) }
    }

    pub fn yearly(year: i32) -> Self {
        Self { selected_year: Some(year), ..Self::empty(ReportType::Yearly) }
    }

    pub fn receipts(year: i32) -> Self {
        Self { selected_year: Some(year), ..Self::empty(ReportType::DonationReceipt) }
    }

    pub fn ranged(report_type: ReportType, start: NaiveDate, end: NaiveDate) -> Self {
        Self { start_date: Some(start), end_date: Some(end), ..Self::empty(report_type) }
    }

    pub fn with_member(mut self, member_id: Uuid) -> Self {
        self.member_id = Some(member_id);
        self
    }

    pub fn with_donation_type(mut self, donation_type_id: Uuid) -> Self {
        self.donation_type_id = Some(donation_type_id);
        self
    }

    /// `(year, month)` of a monthly request.
    pub fn month(&self) -> DomainResult<(i32, u32)> {
        let value = self
            .selected_month
            .as_deref()
            .ok_or_else(|| ValidationError::required("selected_month"))?;
        parse_year_month(value, "selected_month")
    }

    pub fn year(&self) -> DomainResult<i32> {
        let year = self.selected_year.ok_or_else(|| ValidationError::required("selected_year"))?;
        ValidationBuilder::new("selected_year", Some(year))
            .range(1900, 9999)
            .validate()?;
        Ok(year)
    }

    /// Inclusive date window the donations are loaded for.
    pub fn window(&self) -> DomainResult<ReportWindow> {
        match self.report_type {
            ReportType::Monthly => {
                let (year, month) = self.month()?;
                let (start, end) = month_bounds(year, month)?;
                Ok(ReportWindow { start, end })
            }
            ReportType::Yearly => {
                let (start, end) = year_bounds(self.year()?)?;
                Ok(ReportWindow { start, end })
            }
            ReportType::DonationReceipt if self.selected_year.is_some() => {
                let (start, end) = year_bounds(self.year()?)?;
                Ok(ReportWindow { start, end })
            }
            _ => self.explicit_window(),
        }
    }

    fn explicit_window(&self) -> DomainResult<ReportWindow> {
        let start = self.start_date.ok_or_else(|| ValidationError::required("start_date"))?;
        let end = self.end_date.ok_or_else(|| ValidationError::required("end_date"))?;
        ValidationBuilder::new("start_date", Some(start))
            .not_after(end)
            .validate()?;
        Ok(ReportWindow { start, end })
    }
}

/// Inclusive date range of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// `YYYY-MM-DD ~ YYYY-MM-DD`, as printed on receipts.
    pub fn period_label(&self) -> String {
        format!("{} ~ {}", self.start, self.end)
    }
}

/// One week slot of a monthly report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBucket {
    pub week_number: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total: Decimal,
    pub count: usize,
    pub donations: Vec<DonationRecord>,
    pub daily_breakdown: BTreeMap<NaiveDate, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    /// `YYYY-MM`
    pub month: String,
    pub count: usize,
    pub total: Decimal,
    pub weekly_data: Vec<WeeklyBucket>,
    pub donations: Vec<DonationRecord>,
}

/// One month of a yearly report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    pub month: u32,
    pub month_name: String,
    pub count: usize,
    pub total: Decimal,
    pub donations: Vec<DonationRecord>,
    /// `total / 4`
    pub weekly_average: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyReport {
    pub year: i32,
    pub count: usize,
    pub total: Decimal,
    pub monthly_data: Vec<MonthlyBucket>,
    pub donations: Vec<DonationRecord>,
    /// Year total over the number of months that have donations
    pub monthly_average: Decimal,
}

/// Per-donor totals of the member report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub donor_key: String,
    pub member_id: Option<Uuid>,
    pub member_name: String,
    pub count: usize,
    pub total: Decimal,
    pub percentage: Decimal,
    pub donations: Vec<DonationRecord>,
}

/// Per-type totals of the type report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub type_id: Option<Uuid>,
    pub type_name: String,
    pub count: usize,
    pub total: Decimal,
    pub percentage: Decimal,
    pub donations: Vec<DonationRecord>,
}

/// One donor's receipt data for the period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorSummary {
    pub donor_key: String,
    pub member_id: Option<Uuid>,
    pub display_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub total_amount: Decimal,
    pub donation_count: usize,
    pub period: String,
    pub donations: Vec<DonationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopDonor {
    pub name: String,
    pub amount: Decimal,
    pub percentage: Decimal,
}

/// Aggregated result of one report request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "report_type", content = "data", rename_all = "snake_case")]
pub enum ReportOutput {
    DonationReceipt(Vec<DonorSummary>),
    Monthly(MonthlyReport),
    Yearly(YearlyReport),
    Member(Vec<MemberSummary>),
    Type(Vec<TypeSummary>),
}

impl ReportOutput {
    pub fn report_type(&self) -> ReportType {
        match self {
            ReportOutput::DonationReceipt(_) => ReportType::DonationReceipt,
            ReportOutput::Monthly(_) => ReportType::Monthly,
            ReportOutput::Yearly(_) => ReportType::Yearly,
            ReportOutput::Member(_) => ReportType::Member,
            ReportOutput::Type(_) => ReportType::Type,
        }
    }
}
