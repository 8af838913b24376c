//! Forecast horizon construction.
//!
//! Future dates are generated strictly after the last history date. Anchored
//! frequencies snap to their anchor: `YearEnd` always yields December 31 and
//! `MonthEnd` the last day of a month, regardless of the history's own day.

use chrono::{Datelike, Duration, NaiveDate};

use crate::domain::Frequency;
use crate::error::AppError;

/// Smallest date on the `freq` grid that is strictly after `d`.
pub fn next_after(freq: Frequency, d: NaiveDate) -> Option<NaiveDate> {
    match freq {
        Frequency::Day => d.checked_add_signed(Duration::days(1)),
        Frequency::Week => d.checked_add_signed(Duration::days(7)),
        Frequency::MonthEnd => {
            let eom = end_of_month(d.year(), d.month())?;
            if eom > d {
                Some(eom)
            } else {
                let (y, m) = if d.month() == 12 {
                    (d.year() + 1, 1)
                } else {
                    (d.year(), d.month() + 1)
                };
                end_of_month(y, m)
            }
        }
        Frequency::YearEnd => {
            let eoy = NaiveDate::from_ymd_opt(d.year(), 12, 31)?;
            if eoy > d {
                Some(eoy)
            } else {
                NaiveDate::from_ymd_opt(d.year() + 1, 12, 31)
            }
        }
    }
}

/// `periods` dates after `last`, spaced by `freq`.
pub fn future_dates(last: NaiveDate, periods: usize, freq: Frequency) -> Result<Vec<NaiveDate>, AppError> {
    let mut out = Vec::with_capacity(periods);
    let mut cur = last;
    for _ in 0..periods {
        cur = next_after(freq, cur).ok_or_else(|| {
            AppError::input(format!("Forecast horizon runs past the supported date range after {cur}."))
        })?;
        out.push(cur);
    }
    Ok(out)
}

fn end_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    first_next.pred_opt()
}
