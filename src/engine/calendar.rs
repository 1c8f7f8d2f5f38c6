use crate::engine::query::TemporalUnit;
use chrono::{Datelike, Days, Months, NaiveDate};

/// First day of the period `offset` units away from the one `reference` falls in.
///
/// Periods are calendar aligned: month -1 from 2024-03-15 starts on 2024-02-01, not 2024-02-15.
/// Returns [None] when the result falls outside of what chrono can represent.
pub fn period_start(reference: NaiveDate, unit: TemporalUnit, offset: i32) -> Option<NaiveDate> {
    match unit {
        TemporalUnit::Day => shift_days(reference, offset),
        TemporalUnit::Month => {
            let first_of_month = reference.with_day(1)?;
            let months = Months::new(offset.unsigned_abs());

            if offset < 0 {
                first_of_month.checked_sub_months(months)
            } else {
                first_of_month.checked_add_months(months)
            }
        }
        TemporalUnit::Year => NaiveDate::from_ymd_opt(reference.year().checked_add(offset)?, 1, 1),
    }
}

/// The half open range `[start, end)` covering periods `from` through `to`.
pub fn period_range(
    reference: NaiveDate,
    unit: TemporalUnit,
    from: i32,
    to: i32,
) -> Option<(NaiveDate, NaiveDate)> {
    let start = period_start(reference, unit, from)?;
    let end = period_start(reference, unit, to.checked_add(1)?)?;

    Some((start, end))
}

fn shift_days(reference: NaiveDate, offset: i32) -> Option<NaiveDate> {
    let days = Days::new(u64::from(offset.unsigned_abs()));

    if offset < 0 {
        reference.checked_sub_days(days)
    } else {
        reference.checked_add_days(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_month_periods_are_calendar_aligned() {
        let reference = date(2024, 3, 15);

        assert_eq!(Some(date(2024, 3, 1)), period_start(reference, TemporalUnit::Month, 0));
        assert_eq!(Some(date(2024, 2, 1)), period_start(reference, TemporalUnit::Month, -1));
        assert_eq!(Some(date(2023, 12, 1)), period_start(reference, TemporalUnit::Month, -3));
        assert_eq!(Some(date(2024, 4, 1)), period_start(reference, TemporalUnit::Month, 1));
    }

    #[test]
    fn test_month_boundaries_from_the_end_of_a_month() {
        // 31st of March minus one month must not trip over February.
        let reference = date(2024, 3, 31);

        assert_eq!(
            Some((date(2024, 2, 1), date(2024, 3, 1))),
            period_range(reference, TemporalUnit::Month, -1, -1)
        );
    }

    #[test]
    fn test_days_and_years() {
        let reference = date(2024, 3, 1);

        assert_eq!(
            Some((date(2024, 2, 29), date(2024, 3, 1))),
            period_range(reference, TemporalUnit::Day, -1, -1)
        );
        assert_eq!(
            Some((date(2022, 1, 1), date(2025, 1, 1))),
            period_range(reference, TemporalUnit::Year, -2, 0)
        );
    }

    #[test]
    fn test_overflow() {
        let reference = date(2024, 3, 1);

        assert_eq!(None, period_start(reference, TemporalUnit::Year, i32::MIN));
        assert_eq!(None, period_start(reference, TemporalUnit::Month, -2_000_000_000));
        assert_eq!(None, period_range(reference, TemporalUnit::Day, 0, i32::MAX));
    }
}
