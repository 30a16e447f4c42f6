//! Pure reductions from a flat donation list to the report shapes.
//!
//! Every function here is deterministic in its input. Sums use `Decimal`
//! so repeated aggregation never drifts.

use crate::domains::donation::DonationRecord;
use crate::domains::report::calendar::{month_bounds, month_name, week_of_month, week_range, weeks_in_month, year_bounds};
use crate::domains::report::types::{
    DonorSummary, MemberSummary, MonthlyBucket, MonthlyReport, ReportWindow, TopDonor, TypeSummary,
    WeeklyBucket, YearlyReport,
};
use crate::errors::DomainResult;
use chrono::Datelike;
use log::debug;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use uuid::Uuid;

/// Number of entries kept by `top_donors`.
pub const TOP_DONOR_LIMIT: usize = 10;

/// Share of `part` in `total` as a percentage with two decimals; zero when
/// the total is zero.
pub fn percentage(part: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    (part * Decimal::ONE_HUNDRED / total).round_dp(2)
}

pub fn sum_amounts<'a>(records: impl IntoIterator<Item = &'a DonationRecord>) -> Decimal {
    records.into_iter().map(|r| r.amount).sum()
}

fn in_window<'a>(records: &'a [DonationRecord], window: ReportWindow) -> Vec<&'a DonationRecord> {
    let kept: Vec<_> = records.iter().filter(|r| window.contains(r.donation_date)).collect();
    if kept.len() != records.len() {
        debug!(
            "Ignoring {} donations outside {}",
            records.len() - kept.len(),
            window.period_label()
        );
    }
    kept
}

/// Groups records by key, keeping groups in order of first appearance.
fn group_by<'a, K, F>(records: impl IntoIterator<Item = &'a DonationRecord>, key: F) -> Vec<(K, Vec<&'a DonationRecord>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&DonationRecord) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&DonationRecord>)> = Vec::new();
    for record in records {
        let k = key(record);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(record),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![record]));
            }
        }
    }
    groups
}

fn owned(records: &[&DonationRecord]) -> Vec<DonationRecord> {
    records.iter().map(|r| (*r).clone()).collect()
}

/// Month view split into Sunday-first weeks. Empty weeks are left out.
pub fn monthly_report(records: &[DonationRecord], year: i32, month: u32) -> DomainResult<MonthlyReport> {
    let (start, end) = month_bounds(year, month)?;
    let records = in_window(records, ReportWindow { start, end });

    let mut weekly_data = Vec::new();
    for week in 1..=weeks_in_month(year, month)? {
        let (start_date, end_date) = week_range(year, month, week)?;
        let donations: Vec<&DonationRecord> = records
            .iter()
            .copied()
            .filter(|r| week_of_month(r.donation_date) == week)
            .collect();
        if donations.is_empty() {
            continue;
        }

        let mut daily_breakdown = BTreeMap::new();
        for donation in &donations {
            *daily_breakdown.entry(donation.donation_date).or_insert(Decimal::ZERO) += donation.amount;
        }
        weekly_data.push(WeeklyBucket {
            week_number: week,
            start_date,
            end_date,
            total: sum_amounts(donations.iter().copied()),
            count: donations.len(),
            donations: owned(&donations),
            daily_breakdown,
        });
    }

    Ok(MonthlyReport {
        month: format!("{:04}-{:02}", year, month),
        count: records.len(),
        total: sum_amounts(records.iter().copied()),
        weekly_data,
        donations: owned(&records),
    })
}

/// Year view with all twelve months, empty ones included.
pub fn yearly_report(records: &[DonationRecord], year: i32) -> DomainResult<YearlyReport> {
    let (start, end) = year_bounds(year)?;
    let records = in_window(records, ReportWindow { start, end });
    let four = Decimal::from(4);

    let monthly_data: Vec<MonthlyBucket> = (1..=12)
        .map(|month| {
            let donations: Vec<&DonationRecord> = records
                .iter()
                .copied()
                .filter(|r| r.donation_date.month() == month)
                .collect();
            let total = sum_amounts(donations.iter().copied());
            MonthlyBucket {
                month,
                month_name: month_name(month),
                count: donations.len(),
                total,
                donations: owned(&donations),
                weekly_average: total / four,
            }
        })
        .collect();

    let total = sum_amounts(records.iter().copied());
    let months_with_data = monthly_data.iter().filter(|m| m.count > 0).count();
    let monthly_average = if months_with_data > 0 {
        (total / Decimal::from(months_with_data)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    Ok(YearlyReport {
        year,
        count: records.len(),
        total,
        monthly_data,
        donations: owned(&records),
        monthly_average,
    })
}

/// Totals per donor, largest first.
pub fn member_report(records: &[DonationRecord]) -> Vec<MemberSummary> {
    let period_total = sum_amounts(records);
    let mut summaries: Vec<MemberSummary> = group_by(records, DonationRecord::donor_key)
        .into_iter()
        .map(|(donor_key, donations)| {
            let first = donations[0];
            let total = sum_amounts(donations.iter().copied());
            MemberSummary {
                donor_key,
                member_id: first.member_id,
                member_name: first.display_name().to_string(),
                count: donations.len(),
                total,
                percentage: percentage(total, period_total),
                donations: owned(&donations),
            }
        })
        .collect();
    summaries.sort_by(|a, b| b.total.cmp(&a.total));
    summaries
}

/// Totals per donation type, largest first. Donations without a type share
/// one group.
pub fn type_report(records: &[DonationRecord]) -> Vec<TypeSummary> {
    let period_total = sum_amounts(records);
    let mut summaries: Vec<TypeSummary> = group_by(records, |r| r.donation_type_id)
        .into_iter()
        .map(|(type_id, donations)| {
            let total = sum_amounts(donations.iter().copied());
            TypeSummary {
                type_id,
                type_name: donations[0].type_name().to_string(),
                count: donations.len(),
                total,
                percentage: percentage(total, period_total),
                donations: owned(&donations),
            }
        })
        .collect();
    summaries.sort_by(|a, b| b.total.cmp(&a.total));
    summaries
}

/// One receipt entry per donor for the period, largest total first.
/// Contact details come from the donor's first donation.
pub fn donation_receipts(records: &[DonationRecord], window: ReportWindow) -> Vec<DonorSummary> {
    let period = window.period_label();
    let mut receipts: Vec<DonorSummary> = group_by(records, DonationRecord::donor_key)
        .into_iter()
        .map(|(donor_key, donations)| {
            let first = donations[0];
            DonorSummary {
                donor_key,
                member_id: first.member_id,
                display_name: first.display_name().to_string(),
                phone: first.phone().map(str::to_string),
                address: first.address().map(str::to_string),
                total_amount: sum_amounts(donations.iter().copied()),
                donation_count: donations.len(),
                period: period.clone(),
                donations: owned(&donations),
            }
        })
        .collect();
    receipts.sort_by(|a, b| b.total_amount.cmp(&a.total_amount));
    receipts
}

/// The `limit` largest donors with their share of the whole list.
/// Truncation happens after the full grouping and sort.
pub fn top_donors(records: &[DonationRecord], limit: usize) -> Vec<TopDonor> {
    let period_total = sum_amounts(records);
    let mut donors: Vec<TopDonor> = group_by(records, DonationRecord::donor_key)
        .into_iter()
        .map(|(_, donations)| {
            let amount = sum_amounts(donations.iter().copied());
            TopDonor {
                name: donations[0].display_name().to_string(),
                amount,
                percentage: percentage(amount, period_total),
            }
        })
        .collect();
    donors.sort_by(|a, b| b.amount.cmp(&a.amount));
    donors.truncate(limit);
    donors
}

/// Receipt entry of a registered member.
pub fn find_receipt(receipts: &[DonorSummary], member_id: Uuid) -> Option<&DonorSummary> {
    receipts.iter().find(|r| r.member_id == Some(member_id))
}
