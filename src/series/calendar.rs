//! Calendar-month arithmetic on month-end dates

use chrono::{Datelike, NaiveDate};

/// Last day of the given calendar month
///
/// Saturates to `NaiveDate::MAX` for months outside chrono's supported range.
pub fn month_end(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Month-end date of the month containing `date`
pub fn month_end_of(date: NaiveDate) -> NaiveDate {
    month_end(date.year(), date.month())
}

/// Whether `date` is the last day of its month
pub fn is_month_end(date: NaiveDate) -> bool {
    month_end_of(date) == date
}

/// Signed number of calendar months from `from` to `to`
///
/// Only year and month matter: 2025-05-31 to 2025-08-01 is 3.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
}

/// Month-end `n` months after the month containing `date`
pub fn add_months(date: NaiveDate, n: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + n as i32;
    month_end(total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
}

/// `count` consecutive month-ends starting the month after `last`
pub fn following_month_ends(last: NaiveDate, count: usize) -> Vec<NaiveDate> {
    (1..=count as u32).map(|n| add_months(last, n)).collect()
}
