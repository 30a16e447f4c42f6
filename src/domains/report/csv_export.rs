use crate::domains::donation::DonationRecord;
use crate::domains::report::types::{
    DonorSummary, MonthlyBucket, MonthlyReport, ReportOutput, ReportWindow, WeeklyBucket, YearlyReport,
};
use crate::errors::{ServiceError, ServiceResult};
use chrono::{Datelike, NaiveDate};
use log::debug;
use rust_decimal::Decimal;

/// UTF-8 byte order mark so spreadsheet apps pick the right encoding.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Types that can be written as one CSV row.
pub trait CsvRecord {
    fn headers() -> Vec<&'static str>;

    fn to_csv(&self) -> Vec<String>;
}

/// A finished CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl CsvExport {
    /// Content without the byte order mark.
    pub fn text(&self) -> String {
        let body = self.content.strip_prefix(UTF8_BOM).unwrap_or(&self.content);
        String::from_utf8_lossy(body).into_owned()
    }
}

/// Amounts are written without trailing zeros: `15000`, `3750.5`.
fn amount(value: Decimal) -> String {
    value.normalize().to_string()
}

/// `2025. 3. 2.`
pub fn short_date(date: NaiveDate) -> String {
    format!("{}. {}. {}.", date.year(), date.month(), date.day())
}

struct DetailRow<'a>(&'a DonationRecord);

impl CsvRecord for DetailRow<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["날짜", "헌금자", "헌금종류", "금액", "헌금방법", "비고"]
    }

    fn to_csv(&self) -> Vec<String> {
        let d = self.0;
        vec![
            d.donation_date.to_string(),
            d.display_name().to_string(),
            d.type_name().to_string(),
            amount(d.amount),
            d.payment_method.clone().unwrap_or_default(),
            d.notes.clone().unwrap_or_default(),
        ]
    }
}

impl CsvRecord for WeeklyBucket {
    fn headers() -> Vec<&'static str> {
        vec!["주차", "기간", "건수", "금액"]
    }

    fn to_csv(&self) -> Vec<String> {
        vec![
            format!("{}주차", self.week_number),
            format!("{} ~ {}", self.start_date, self.end_date),
            self.count.to_string(),
            amount(self.total),
        ]
    }
}

impl CsvRecord for MonthlyBucket {
    fn headers() -> Vec<&'static str> {
        vec!["월", "건수", "금액", "주간평균"]
    }

    fn to_csv(&self) -> Vec<String> {
        vec![
            self.month_name.clone(),
            self.count.to_string(),
            amount(self.total),
            amount(self.weekly_average),
        ]
    }
}

struct ReceiptRow<'a> {
    receipt: &'a DonorSummary,
    issued: &'a str,
}

impl CsvRecord for ReceiptRow<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["성명", "기간", "기부건수", "총액", "발행일자"]
    }

    fn to_csv(&self) -> Vec<String> {
        vec![
            self.receipt.display_name.clone(),
            self.receipt.period.clone(),
            self.receipt.donation_count.to_string(),
            amount(self.receipt.total_amount),
            self.issued.to_string(),
        ]
    }
}

/// Builds one CSV file out of titled tables.
struct CsvDocument {
    buffer: Vec<u8>,
}

impl CsvDocument {
    fn new() -> Self {
        Self { buffer: UTF8_BOM.to_vec() }
    }

    /// A blank line followed by a bare title line.
    fn section(&mut self, title: &str) {
        self.buffer.extend_from_slice(format!("\n{}\n", title).as_bytes());
    }

    fn table<R: CsvRecord>(&mut self, rows: impl IntoIterator<Item = R>) -> ServiceResult<()> {
        let mut wtr = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(&mut self.buffer);

        wtr.write_record(R::headers()).map_err(|e| ServiceError::Export(e.to_string()))?;
        for row in rows {
            wtr.write_record(row.to_csv()).map_err(|e| ServiceError::Export(e.to_string()))?;
        }
        wtr.flush().map_err(|e| ServiceError::Export(e.to_string()))?;
        Ok(())
    }

    fn finish(self, file_name: String) -> CsvExport {
        debug!("Built {} ({} bytes)", file_name, self.buffer.len());
        CsvExport {
            file_name,
            content: self.buffer,
        }
    }
}

/// Week summary, then every donation of the month.
pub fn export_monthly(report: &MonthlyReport) -> ServiceResult<CsvExport> {
    let mut doc = CsvDocument::new();
    doc.table(report.weekly_data.iter().cloned())?;
    doc.section("일자별 상세");
    doc.table(report.donations.iter().map(DetailRow))?;
    Ok(doc.finish(format!("월별보고서_{}.csv", report.month)))
}

/// Month summary, then every donation of the year.
pub fn export_yearly(report: &YearlyReport) -> ServiceResult<CsvExport> {
    let mut doc = CsvDocument::new();
    doc.table(report.monthly_data.iter().cloned())?;
    doc.section("전체 상세");
    doc.table(report.donations.iter().map(DetailRow))?;
    Ok(doc.finish(format!("연간보고서_{}년.csv", report.year)))
}

/// Donation details of each group in turn, under one header.
pub fn export_details<'a>(
    report_type: &str,
    groups: impl IntoIterator<Item = &'a [DonationRecord]>,
    window: ReportWindow,
) -> ServiceResult<CsvExport> {
    let mut doc = CsvDocument::new();
    doc.table(groups.into_iter().flat_map(|donations| donations.iter().map(DetailRow)))?;
    Ok(doc.finish(format!("헌금보고서_{}_{}_{}.csv", report_type, window.start, window.end)))
}

/// One line per donor receipt.
pub fn export_receipts(
    receipts: &[DonorSummary],
    window: ReportWindow,
    issue_date: NaiveDate,
) -> ServiceResult<CsvExport> {
    let issued = short_date(issue_date);
    let mut doc = CsvDocument::new();
    doc.table(receipts.iter().map(|receipt| ReceiptRow { receipt, issued: &issued }))?;

    let label = if window.start.year() == window.end.year() {
        format!("{}년", window.start.year())
    } else {
        format!("{}_{}", window.start, window.end)
    };
    Ok(doc.finish(format!("기부금영수증_{}.csv", label)))
}

/// CSV file for any report.
pub fn export_report(output: &ReportOutput, window: ReportWindow, issue_date: NaiveDate) -> ServiceResult<CsvExport> {
    match output {
        ReportOutput::Monthly(report) => export_monthly(report),
        ReportOutput::Yearly(report) => export_yearly(report),
        ReportOutput::Member(members) => export_details(
            output.report_type().as_str(),
            members.iter().map(|m| m.donations.as_slice()),
            window,
        ),
        ReportOutput::Type(types) => export_details(
            output.report_type().as_str(),
            types.iter().map(|t| t.donations.as_slice()),
            window,
        ),
        ReportOutput::DonationReceipt(receipts) => export_receipts(receipts, window, issue_date),
    }
}
