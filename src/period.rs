use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::AnalyticsError;
use crate::models::{Granularity, Period};

/// The educational year rolls over on August 1, not January 1.
pub const EDUCATIONAL_YEAR_MONTH: u32 = 8;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Resolves a relative period token against `today`.
///
/// `1W` resolves to the Sunday-start week containing `today` with
/// day-of-week buckets; the longer tokens resolve to trailing windows with
/// one bucket per calendar day.
pub fn resolve_token(token: &str, today: NaiveDate) -> Result<Period, AnalyticsError> {
    let days = match token {
        "1W" => return Ok(week_period(None, today)),
        "1M" => 30,
        "3M" => 90,
        "6M" => 180,
        "1Y" => 365,
        other => return Err(AnalyticsError::InvalidPeriod(other.to_string())),
    };

    Ok(Period {
        start: today - Duration::days(days),
        end: today,
        granularity: Granularity::Day,
    })
}

/// The 7-day window of the week containing `anchor` (default: today),
/// starting on Sunday.
pub fn week_period(anchor: Option<NaiveDate>, today: NaiveDate) -> Period {
    let anchor = anchor.unwrap_or(today);
    let start = anchor - Duration::days(anchor.weekday().num_days_from_sunday() as i64);
    Period {
        start,
        end: start + Duration::days(6),
        granularity: Granularity::DayOfWeek,
    }
}

/// An explicit historical range, bucketed by day.
pub fn explicit_range(start: NaiveDate, end: NaiveDate) -> Result<Period, AnalyticsError> {
    if start > end {
        return Err(AnalyticsError::InvalidPeriod(format!(
            "range start {start} is after end {end}"
        )));
    }
    Ok(Period {
        start,
        end,
        granularity: Granularity::Day,
    })
}

/// August 1 of the educational year containing `today`.
pub fn educational_year_start(today: NaiveDate) -> NaiveDate {
    let rollover = NaiveDate::from_ymd_opt(today.year(), EDUCATIONAL_YEAR_MONTH, 1)
        .unwrap_or(today);
    if today >= rollover {
        rollover
    } else {
        NaiveDate::from_ymd_opt(today.year() - 1, EDUCATIONAL_YEAR_MONTH, 1).unwrap_or(today)
    }
}

/// UTC instant bounds for a period: midnight at the start of `start` up to
/// (exclusive) midnight after `end`.
pub fn utc_bounds(period: &Period) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = period.start.and_time(NaiveTime::MIN).and_utc();
    let until = (period.end + Duration::days(1))
        .and_time(NaiveTime::MIN)
        .and_utc();
    (from, until)
}

/// Year-to-date window for the current educational year, bucketed by month.
pub fn educational_year(today: NaiveDate) -> Period {
    Period {
        start: educational_year_start(today),
        end: today,
        granularity: Granularity::Month,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn tokens_resolve_to_trailing_windows() {
        let today = date(2026, 3, 15);
        for (token, days) in [("1M", 30), ("3M", 90), ("6M", 180), ("1Y", 365)] {
            let period = resolve_token(token, today).unwrap();
            assert_eq!(period.end, today);
            assert_eq!(period.start, today - Duration::days(days));
            assert_eq!(period.granularity, Granularity::Day);
        }
    }

    #[test]
    fn unknown_token_is_rejected() {
        let err = resolve_token("2W", date(2026, 3, 15)).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidPeriod(_)));
    }

    #[test]
    fn week_token_uses_day_of_week_buckets() {
        let period = resolve_token("1W", date(2026, 3, 15)).unwrap();
        assert_eq!(period.granularity, Granularity::DayOfWeek);
    }

    #[test]
    fn week_anchors_to_sunday() {
        // 2026-03-18 is a Wednesday; its week starts Sunday 2026-03-15.
        let period = week_period(Some(date(2026, 3, 18)), date(2026, 1, 1));
        assert_eq!(period.start, date(2026, 3, 15));
        assert_eq!(period.end, date(2026, 3, 21));
    }

    #[test]
    fn week_anchored_on_sunday_stays_put() {
        let period = week_period(Some(date(2026, 3, 15)), date(2026, 1, 1));
        assert_eq!(period.start, date(2026, 3, 15));
    }

    #[test]
    fn educational_year_rolls_over_on_august_first() {
        assert_eq!(educational_year_start(date(2026, 7, 31)), date(2025, 8, 1));
        assert_eq!(educational_year_start(date(2026, 8, 1)), date(2026, 8, 1));
        assert_eq!(educational_year_start(date(2026, 12, 25)), date(2026, 8, 1));
        assert_eq!(educational_year_start(date(2027, 2, 10)), date(2026, 8, 1));
    }

    #[test]
    fn educational_year_runs_to_today() {
        let today = date(2026, 2, 10);
        let period = educational_year(today);
        assert_eq!(period.start, date(2025, 8, 1));
        assert_eq!(period.end, today);
        assert_eq!(period.granularity, Granularity::Month);
    }

    #[test]
    fn inverted_explicit_range_is_rejected() {
        let err = explicit_range(date(2026, 3, 2), date(2026, 3, 1)).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidPeriod(_)));
    }
}
