use crate::domains::donation::DonationRecord;
use crate::domains::report::aggregator::{percentage, sum_amounts, top_donors, TOP_DONOR_LIMIT};
use crate::domains::report::calendar::{start_of_month, start_of_week, weekday_label, WEEKDAY_LABELS};
use crate::domains::report::types::TopDonor;
use chrono::{Datelike, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Monthly giving target shown on the dashboard.
pub const MONTHLY_GOAL: Decimal = dec!(10000000);

pub const RECENT_DONATION_LIMIT: usize = 10;

/// Donation times are shown in Korea Standard Time.
const KST_OFFSET_SECS: i32 = 9 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentDonation {
    pub id: Uuid,
    pub date: NaiveDate,
    pub name: String,
    pub type_name: String,
    pub amount: Decimal,
    /// `HH:MM` of the entry time, empty when unknown
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeShare {
    pub type_name: String,
    pub amount: Decimal,
    pub count: usize,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAmount {
    pub day: String,
    pub amount: Decimal,
}

/// Everything the dashboard screen shows for one church and day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub date: NaiveDate,
    pub monthly_donation: Decimal,
    pub weekly_donation: Decimal,
    pub today_donation: Decimal,
    pub top_donors: Vec<TopDonor>,
    pub recent_donations: Vec<RecentDonation>,
    pub donation_by_type: Vec<TypeShare>,
    pub weekly_trend: Vec<DailyAmount>,
    pub goal_progress: Decimal,
    pub monthly_goal: Decimal,
    pub total_members: usize,
}

/// Dates the dashboard needs loaded: the current month and the current
/// week, which may start in the previous month.
pub fn dashboard_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (start_of_month(today).min(start_of_week(today)), today)
}

/// Build the summary from donations covering `dashboard_window(today)`,
/// newest first.
pub fn build_dashboard(records: &[DonationRecord], today: NaiveDate, total_members: usize) -> DashboardSummary {
    let month_start = start_of_month(today);
    let week_start = start_of_week(today);

    let month: Vec<DonationRecord> = records
        .iter()
        .filter(|r| r.donation_date >= month_start && r.donation_date <= today)
        .cloned()
        .collect();
    let week: Vec<&DonationRecord> = records
        .iter()
        .filter(|r| r.donation_date >= week_start && r.donation_date <= today)
        .collect();

    let monthly_donation = sum_amounts(&month);
    let weekly_donation = sum_amounts(week.iter().copied());
    let today_donation = sum_amounts(records.iter().filter(|r| r.donation_date == today));

    let goal_progress = percentage(monthly_donation, MONTHLY_GOAL).min(Decimal::ONE_HUNDRED);

    DashboardSummary {
        date: today,
        monthly_donation,
        weekly_donation,
        today_donation,
        top_donors: top_donors(&month, TOP_DONOR_LIMIT),
        recent_donations: recent_donations(&month),
        donation_by_type: donation_by_type(&month, monthly_donation),
        weekly_trend: weekly_trend(&week),
        goal_progress,
        monthly_goal: MONTHLY_GOAL,
        total_members,
    }
}

fn recent_donations(records: &[DonationRecord]) -> Vec<RecentDonation> {
    let kst = FixedOffset::east_opt(KST_OFFSET_SECS);
    records
        .iter()
        .take(RECENT_DONATION_LIMIT)
        .map(|r| RecentDonation {
            id: r.id,
            date: r.donation_date,
            name: r.display_name().to_string(),
            type_name: r.type_name().to_string(),
            amount: r.amount,
            time: match (r.created_at, kst) {
                (Some(at), Some(offset)) => at.with_timezone(&offset).format("%H:%M").to_string(),
                _ => String::new(),
            },
        })
        .collect()
}

/// Totals per type name, largest first.
fn donation_by_type(records: &[DonationRecord], month_total: Decimal) -> Vec<TypeShare> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, (Decimal, usize)> = HashMap::new();
    for record in records {
        let name = record.type_name();
        let entry = totals.entry(name.to_string()).or_insert_with(|| {
            order.push(name.to_string());
            (Decimal::ZERO, 0)
        });
        entry.0 += record.amount;
        entry.1 += 1;
    }

    let mut shares: Vec<TypeShare> = order
        .into_iter()
        .filter_map(|name| {
            let (amount, count) = totals.get(&name).copied()?;
            Some(TypeShare {
                percentage: percentage(amount, month_total),
                type_name: name,
                amount,
                count,
            })
        })
        .collect();
    shares.sort_by(|a, b| b.amount.cmp(&a.amount));
    shares
}

/// Sunday..Saturday totals of the current week.
fn weekly_trend(records: &[&DonationRecord]) -> Vec<DailyAmount> {
    let mut by_day: HashMap<&str, Decimal> = HashMap::new();
    for record in records {
        *by_day.entry(weekday_label(record.donation_date.weekday())).or_insert(Decimal::ZERO) += record.amount;
    }
    WEEKDAY_LABELS
        .iter()
        .map(|day| DailyAmount {
            day: day.to_string(),
            amount: by_day.get(day).copied().unwrap_or(Decimal::ZERO),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::report::aggregator::tests::{donation, named, typed};
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_reaches_back_to_sunday() {
        // Wednesday 2025-10-01: the week began on Sunday 2025-09-28
        assert_eq!(dashboard_window(date(2025, 10, 1)), (date(2025, 9, 28), date(2025, 10, 1)));
        assert_eq!(dashboard_window(date(2025, 10, 15)), (date(2025, 10, 1), date(2025, 10, 15)));
    }

    #[test]
    fn test_build_dashboard() {
        let today = date(2025, 10, 1);
        let offering = uuid::Uuid::new_v4();
        let mut latest = typed(named(donation("2025-10-01", dec!(30000)), "김영희"), offering, "감사헌금");
        latest.created_at = Some(Utc.with_ymd_and_hms(2025, 10, 1, 1, 5, 0).unwrap());
        let records = vec![
            latest,
            named(donation("2025-10-01", dec!(20000)), "이철수"),
            named(donation("2025-09-28", dec!(50000)), "김영희"),
        ];

        let summary = build_dashboard(&records, today, 42);

        assert_eq!(summary.monthly_donation, dec!(50000));
        assert_eq!(summary.weekly_donation, dec!(100000));
        assert_eq!(summary.today_donation, dec!(50000));
        assert_eq!(summary.total_members, 42);

        // September's gift counts for the week but not for the month views
        assert_eq!(summary.top_donors.len(), 2);
        assert_eq!(summary.top_donors[0].name, "김영희");
        assert_eq!(summary.top_donors[0].percentage, dec!(60));
        assert_eq!(summary.recent_donations.len(), 2);
        assert_eq!(summary.recent_donations[0].time, "10:05");
        assert_eq!(summary.recent_donations[1].time, "");

        assert_eq!(summary.donation_by_type[0].type_name, "감사헌금");
        assert_eq!(summary.donation_by_type[0].percentage, dec!(60));
        assert_eq!(summary.donation_by_type[1].type_name, "기타");

        let trend: Vec<_> = summary.weekly_trend.iter().map(|d| d.day.as_str()).collect();
        assert_eq!(trend, WEEKDAY_LABELS.to_vec());
        assert_eq!(summary.weekly_trend[0].amount, dec!(50000));
        assert_eq!(summary.weekly_trend[3].amount, dec!(50000));

        assert_eq!(summary.goal_progress, dec!(0.5));
    }

    #[test]
    fn test_goal_progress_is_capped() {
        let today = date(2025, 10, 15);
        let records = vec![donation("2025-10-05", dec!(25000000))];
        let summary = build_dashboard(&records, today, 0);
        assert_eq!(summary.goal_progress, Decimal::ONE_HUNDRED);

        let empty = build_dashboard(&[], today, 0);
        assert_eq!(empty.goal_progress, Decimal::ZERO);
        assert!(empty.top_donors.is_empty());
        assert!(empty.weekly_trend.iter().all(|d| d.amount.is_zero()));
    }
}
