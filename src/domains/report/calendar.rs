use crate::errors::{DomainResult, ValidationError};
use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Day labels for a Sunday-first week.
pub const WEEKDAY_LABELS: [&str; 7] = ["일", "월", "화", "수", "목", "금", "토"];

/// A month never spans more than six Sunday-first weeks.
pub const MAX_WEEKS_IN_MONTH: u32 = 6;

/// First and last day of a month.
pub fn month_bounds(year: i32, month: u32) -> DomainResult<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ValidationError::range("month", 1, 12))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| ValidationError::invalid_value("year", "out of supported range"))?;
    let last = next
        .pred_opt()
        .ok_or_else(|| ValidationError::invalid_value("year", "out of supported range"))?;
    Ok((first, last))
}

/// January 1st and December 31st of a year.
pub fn year_bounds(year: i32) -> DomainResult<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1);
    let end = NaiveDate::from_ymd_opt(year, 12, 31);
    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(ValidationError::invalid_value("year", "out of supported range").into()),
    }
}

/// 1-based week of the month, weeks starting on Sunday. Day 1 is always in
/// week 1; the first Sunday after it opens week 2.
pub fn week_of_month(date: NaiveDate) -> u32 {
    let first_weekday = date
        .with_day(1)
        .map(|first| first.weekday().num_days_from_sunday())
        .unwrap_or(0);
    (date.day() + first_weekday).div_ceil(7)
}

/// How many week slots the month needs (4 to 6).
pub fn weeks_in_month(year: i32, month: u32) -> DomainResult<u32> {
    let (_, last) = month_bounds(year, month)?;
    Ok(week_of_month(last))
}

/// Dates covered by `week` of a month, clipped to the month itself.
pub fn week_range(year: i32, month: u32, week: u32) -> DomainResult<(NaiveDate, NaiveDate)> {
    let (first, last) = month_bounds(year, month)?;
    let weeks = week_of_month(last);
    if week == 0 || week > weeks {
        return Err(ValidationError::range("week", 1, weeks).into());
    }

    let offset = first.weekday().num_days_from_sunday();
    // Sunday on or before the first day, then whole weeks from there
    let week_sunday = first - Days::new(offset as u64) + Days::new(7 * (week as u64 - 1));
    let week_saturday = week_sunday + Days::new(6);
    Ok((week_sunday.max(first), week_saturday.min(last)))
}

/// The Sunday that opens the week containing `date`.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Days::new(date.weekday().num_days_from_sunday() as u64)
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn weekday_label(weekday: Weekday) -> &'static str {
    WEEKDAY_LABELS[weekday.num_days_from_sunday() as usize]
}

/// `"3월"`
pub fn month_name(month: u32) -> String {
    format!("{}월", month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(month_bounds(2024, 2).unwrap(), (date(2024, 2, 1), date(2024, 2, 29)));
        assert_eq!(month_bounds(2025, 12).unwrap(), (date(2025, 12, 1), date(2025, 12, 31)));
        assert!(month_bounds(2025, 13).is_err());
        assert!(month_bounds(2025, 0).is_err());
    }

    #[test]
    fn test_week_of_month() {
        // June 2025 starts on a Sunday
        assert_eq!(week_of_month(date(2025, 6, 1)), 1);
        assert_eq!(week_of_month(date(2025, 6, 7)), 1);
        assert_eq!(week_of_month(date(2025, 6, 8)), 2);
        assert_eq!(week_of_month(date(2025, 6, 30)), 5);

        // March 2025 starts on a Saturday
        assert_eq!(week_of_month(date(2025, 3, 1)), 1);
        assert_eq!(week_of_month(date(2025, 3, 2)), 2);
        assert_eq!(week_of_month(date(2025, 3, 31)), 6);
    }

    #[test]
    fn test_weeks_never_exceed_six() {
        for year in 2000..2040 {
            for month in 1..=12 {
                let weeks = weeks_in_month(year, month).unwrap();
                assert!((4..=MAX_WEEKS_IN_MONTH).contains(&weeks), "{}-{} has {} weeks", year, month, weeks);
            }
        }
        // February 2015 starts on Sunday and has exactly four weeks
        assert_eq!(weeks_in_month(2015, 2).unwrap(), 4);
    }

    #[test]
    fn test_week_range_is_clipped() {
        assert_eq!(week_range(2025, 3, 1).unwrap(), (date(2025, 3, 1), date(2025, 3, 1)));
        assert_eq!(week_range(2025, 3, 2).unwrap(), (date(2025, 3, 2), date(2025, 3, 8)));
        assert_eq!(week_range(2025, 3, 6).unwrap(), (date(2025, 3, 30), date(2025, 3, 31)));
        assert!(week_range(2025, 3, 7).is_err());
        assert!(week_range(2025, 3, 0).is_err());
    }

    #[test]
    fn test_start_of_week_and_labels() {
        // 2025-03-05 is a Wednesday
        assert_eq!(start_of_week(date(2025, 3, 5)), date(2025, 3, 2));
        assert_eq!(start_of_week(date(2025, 3, 2)), date(2025, 3, 2));
        assert_eq!(start_of_month(date(2025, 3, 5)), date(2025, 3, 1));
        assert_eq!(weekday_label(Weekday::Sun), "일");
        assert_eq!(weekday_label(Weekday::Sat), "토");
        assert_eq!(month_name(11), "11월");
    }
}
