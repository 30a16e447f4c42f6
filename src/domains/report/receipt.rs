//! Printable donation receipts (A4 HTML).

use crate::domains::report::types::DonorSummary;
use crate::errors::{ServiceError, ServiceResult};
use crate::domains::report::csv_export::short_date;
use chrono::{Datelike, NaiveDate};
use handlebars::Handlebars;
use log::debug;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;

const RECEIPT: &str = "receipt";
const RECEIPT_BATCH: &str = "receipt_batch";

const RECEIPT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>기부금 영수증</title>
  <style>
    @page { size: A4; margin: 20mm; }
    body { font-family: 'Malgun Gothic', sans-serif; margin: 0; padding: 20px; line-height: 1.6; }
    .container { max-width: 210mm; margin: 0 auto; }
    .receipt-number { text-align: right; margin-bottom: 20px; font-size: 14px; }
    .header { text-align: center; margin-bottom: 40px; padding-bottom: 20px; border-bottom: 3px double #000; }
    .title { font-size: 28px; font-weight: bold; margin: 20px 0; letter-spacing: 10px; }
    .church-info { margin-top: 15px; font-size: 14px; }
    .info-table { width: 100%; border-collapse: collapse; margin: 30px 0; }
    .info-table td { padding: 12px; border: 1px solid #333; font-size: 14px; }
    .info-table .label { width: 30%; background-color: #f5f5f5; font-weight: bold; text-align: center; }
    .info-table .value { padding-left: 20px; }
    .amount-box { margin: 40px 0; padding: 20px; background-color: #f9f9f9; border: 2px solid #333; text-align: center; }
    .amount-label { font-size: 16px; margin-bottom: 10px; }
    .amount-value { font-size: 24px; font-weight: bold; }
    .purpose { margin: 30px 0; padding: 20px; border: 1px solid #ddd; }
    .purpose-title { font-weight: bold; margin-bottom: 10px; }
    .signature { margin-top: 60px; text-align: center; }
    .signature-date { margin-bottom: 40px; font-size: 16px; }
    .signature-church { font-size: 18px; font-weight: bold; margin-bottom: 10px; }
    .signature-line { display: inline-block; width: 200px; border-bottom: 1px solid #000; margin: 0 10px; }
    .seal-area { display: inline-block; width: 60px; height: 60px; border: 2px solid #333; border-radius: 50%; margin-left: 20px; vertical-align: middle; text-align: center; line-height: 56px; font-size: 12px; color: #999; }
    .footer { margin-top: 40px; padding-top: 20px; border-top: 1px solid #ddd; font-size: 12px; color: #666; text-align: center; }
    @media print { body { margin: 0; } .container { width: 100%; } }
  </style>
</head>
<body>
  <div class="container">
    <div class="receipt-number">No. {{receipt_no}}</div>
    <div class="header">
      <div class="title">기 부 금 영 수 증</div>
      <div class="church-info"><strong>{{church_name}}</strong></div>
    </div>
    <div class="content">
      <table class="info-table">
        <tr><td class="label">성명 (단체명)</td><td class="value">{{name}}</td></tr>
        <tr><td class="label">주소</td><td class="value">{{address}}</td></tr>
        <tr><td class="label">전화번호</td><td class="value">{{phone}}</td></tr>
        <tr><td class="label">기부 기간</td><td class="value">{{period}}</td></tr>
        <tr><td class="label">기부 건수</td><td class="value">{{count}}건</td></tr>
      </table>
      <div class="amount-box">
        <div class="amount-label">기부금 총액</div>
        <div class="amount-value">{{total}}</div>
      </div>
      <div class="purpose">
        <div class="purpose-title">기부 목적</div>
        <div>{{purpose}}</div>
      </div>
    </div>
    <div class="signature">
      <div class="signature-date">발행일자: {{issued}}</div>
      <p style="margin: 30px 0;">위와 같이 기부금을 영수하였음을 증명합니다.</p>
      <div style="margin-top: 40px;">
        <div class="signature-church">{{church_name}}</div>
        <div style="margin-top: 20px;">
          <span>담임목사</span>
          <span class="signature-line"></span>
          <span class="seal-area">인</span>
        </div>
      </div>
    </div>
    <div class="footer">
      <p>* 이 영수증은 소득공제용으로 사용하실 수 있습니다.</p>
      <p>* 문의: {{church_name}}</p>
    </div>
  </div>
</body>
</html>
"#;

const RECEIPT_BATCH_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>기부금 영수증 일괄 출력</title>
  <style>
    @page { size: A4; margin: 20mm; }
    body { font-family: 'Malgun Gothic', sans-serif; margin: 0; }
    .page { page-break-after: always; padding: 20px; }
    .page:last-child { page-break-after: auto; }
    .header { text-align: center; margin-bottom: 40px; padding-bottom: 20px; border-bottom: 3px double #000; }
    .title { font-size: 28px; font-weight: bold; margin: 20px 0; letter-spacing: 10px; }
    .info-table { width: 100%; border-collapse: collapse; margin: 30px 0; }
    .info-table td { padding: 12px; border: 1px solid #333; font-size: 14px; }
    .info-table .label { width: 30%; background-color: #f5f5f5; font-weight: bold; text-align: center; }
    .amount-box { margin: 40px 0; padding: 20px; background-color: #f9f9f9; border: 2px solid #333; text-align: center; }
    .amount-value { font-size: 24px; font-weight: bold; }
  </style>
</head>
<body>
{{#each pages}}
  <div class="page">
    <div class="header">
      <div class="title">기 부 금 영 수 증</div>
      <div>{{../church_name}}</div>
    </div>
    <table class="info-table">
      <tr><td class="label">성명</td><td>{{name}}</td></tr>
      <tr><td class="label">기부 기간</td><td>{{period}}</td></tr>
      <tr><td class="label">기부 건수</td><td>{{count}}건</td></tr>
    </table>
    <div class="amount-box">
      <div>기부금 총액</div>
      <div class="amount-value">{{total}}</div>
    </div>
    <div style="text-align: center; margin-top: 50px;">
      <p>위와 같이 기부금을 영수하였음을 증명합니다.</p>
      <p style="margin-top: 30px;">{{../issued}}</p>
      <p style="margin-top: 30px; font-weight: bold;">{{../church_name}}</p>
    </div>
  </div>
{{/each}}
</body>
</html>
"#;

/// Statutory basis printed on every receipt.
pub const DONATION_PURPOSE: &str = "종교단체 기부금 (소득세법 제34조 및 법인세법 제24조)";

const MISSING: &str = "-";

/// `₩1,234,567`. Won has no minor unit, so amounts are rounded.
pub fn format_krw(value: Decimal) -> String {
    let rounded = value.round();
    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-₩{}", grouped)
    } else {
        format!("₩{}", grouped)
    }
}

/// `2025년 3월 2일`
pub fn long_date(date: NaiveDate) -> String {
    format!("{}년 {}월 {}일", date.year(), date.month(), date.day())
}

/// `2025-0042`, with a random serial.
pub fn receipt_number(year: i32) -> String {
    let serial: u32 = rand::rng().random_range(0..10000);
    format!("{}-{:04}", year, serial)
}

#[derive(Serialize)]
struct ReceiptView<'a> {
    receipt_no: &'a str,
    church_name: &'a str,
    name: &'a str,
    address: &'a str,
    phone: &'a str,
    period: &'a str,
    count: usize,
    total: String,
    purpose: &'a str,
    issued: String,
}

#[derive(Serialize)]
struct BatchPage<'a> {
    name: &'a str,
    period: &'a str,
    count: usize,
    total: String,
}

#[derive(Serialize)]
struct BatchView<'a> {
    church_name: &'a str,
    issued: String,
    pages: Vec<BatchPage<'a>>,
}

/// Renders receipts from the registered templates. Values are HTML-escaped.
pub struct ReceiptRenderer {
    registry: Handlebars<'static>,
}

impl ReceiptRenderer {
    pub fn new() -> ServiceResult<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry
            .register_template_string(RECEIPT, RECEIPT_TEMPLATE)
            .map_err(|e| ServiceError::Export(format!("Invalid receipt template: {}", e)))?;
        registry
            .register_template_string(RECEIPT_BATCH, RECEIPT_BATCH_TEMPLATE)
            .map_err(|e| ServiceError::Export(format!("Invalid batch receipt template: {}", e)))?;
        Ok(Self { registry })
    }

    /// One receipt document with a fresh receipt number.
    pub fn render_receipt(
        &self,
        receipt: &DonorSummary,
        church_name: &str,
        issue_date: NaiveDate,
    ) -> ServiceResult<String> {
        let number = receipt_number(issue_date.year());
        self.render_numbered_receipt(receipt, church_name, issue_date, &number)
    }

    pub fn render_numbered_receipt(
        &self,
        receipt: &DonorSummary,
        church_name: &str,
        issue_date: NaiveDate,
        receipt_no: &str,
    ) -> ServiceResult<String> {
        let view = ReceiptView {
            receipt_no,
            church_name,
            name: &receipt.display_name,
            address: receipt.address.as_deref().unwrap_or(MISSING),
            phone: receipt.phone.as_deref().unwrap_or(MISSING),
            period: &receipt.period,
            count: receipt.donation_count,
            total: format_krw(receipt.total_amount),
            purpose: DONATION_PURPOSE,
            issued: long_date(issue_date),
        };
        debug!("Rendering receipt {} for {}", receipt_no, receipt.display_name);
        self.registry
            .render(RECEIPT, &view)
            .map_err(|e| ServiceError::Export(format!("Failed to render receipt: {}", e)))
    }

    /// All receipts in one document, one per printed page.
    pub fn render_batch(
        &self,
        receipts: &[DonorSummary],
        church_name: &str,
        issue_date: NaiveDate,
    ) -> ServiceResult<String> {
        let view = BatchView {
            church_name,
            issued: short_date(issue_date),
            pages: receipts
                .iter()
                .map(|r| BatchPage {
                    name: &r.display_name,
                    period: &r.period,
                    count: r.donation_count,
                    total: format_krw(r.total_amount),
                })
                .collect(),
        };
        debug!("Rendering {} receipts for batch printing", view.pages.len());
        self.registry
            .render(RECEIPT_BATCH, &view)
            .map_err(|e| ServiceError::Export(format!("Failed to render receipts: {}", e)))
    }
}
