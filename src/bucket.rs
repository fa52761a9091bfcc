use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{Granularity, Period};

const DAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Number of months in the educational reporting year (Aug through Jun;
/// July is the gap between years).
const EDUCATIONAL_YEAR_MONTHS: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketKey {
    Day(NaiveDate),
    DayOfWeek(NaiveDate),
    Month { year: i32, month: u32 },
}

impl BucketKey {
    pub fn label(&self) -> String {
        match self {
            BucketKey::Day(day) => day.to_string(),
            BucketKey::DayOfWeek(day) => {
                DAY_LABELS[day.weekday().num_days_from_sunday() as usize].to_string()
            }
            BucketKey::Month { month, .. } => MONTH_LABELS[(*month - 1) as usize].to_string(),
        }
    }
}

/// The ordered, zero-fill bucket keys covering the whole period. Emitted
/// before any data is placed so sparse periods never show gaps.
pub fn bucket_keys(period: &Period) -> Vec<BucketKey> {
    match period.granularity {
        Granularity::Day => {
            let len = (period.end - period.start).num_days() + 1;
            (0..len)
                .map(|offset| BucketKey::Day(period.start + Duration::days(offset)))
                .collect()
        }
        Granularity::DayOfWeek => (0..7)
            .map(|offset| BucketKey::DayOfWeek(period.start + Duration::days(offset)))
            .collect(),
        Granularity::Month => {
            // Fixed Aug..Jun sequence anchored to the educational year the
            // period starts in.
            let year = period.start.year();
            (0..EDUCATIONAL_YEAR_MONTHS)
                .map(|offset| {
                    let month0 = (8 - 1 + offset as u32) % 12;
                    BucketKey::Month {
                        year: year + ((8 - 1 + offset as u32) / 12) as i32,
                        month: month0 + 1,
                    }
                })
                .collect()
        }
    }
}

/// Assigns a calendar day to its bucket index within the period, or `None`
/// when the day falls outside every bucket.
pub fn assign(period: &Period, day: NaiveDate) -> Option<usize> {
    match period.granularity {
        Granularity::Day => {
            let offset = (day - period.start).num_days();
            let len = (period.end - period.start).num_days() + 1;
            (0..len).contains(&offset).then_some(offset as usize)
        }
        Granularity::DayOfWeek => {
            let offset = (day - period.start).num_days();
            (0..7).contains(&offset).then_some(offset as usize)
        }
        Granularity::Month => {
            let year = period.start.year();
            match (day.year() - year, day.month()) {
                (0, month) if month >= 8 => Some((month - 8) as usize),
                (1, month) if month <= 6 => Some((month + 4) as usize),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day_period(start: NaiveDate, end: NaiveDate) -> Period {
        Period {
            start,
            end,
            granularity: Granularity::Day,
        }
    }

    #[test]
    fn day_buckets_cover_every_calendar_day() {
        let period = day_period(date(2026, 2, 1), date(2026, 3, 3));
        let keys = bucket_keys(&period);
        assert_eq!(keys.len(), 31);
        assert_eq!(keys[0], BucketKey::Day(date(2026, 2, 1)));
        assert_eq!(keys[30], BucketKey::Day(date(2026, 3, 3)));
        // Contiguous, no gaps.
        for (offset, key) in keys.iter().enumerate() {
            assert_eq!(
                *key,
                BucketKey::Day(date(2026, 2, 1) + Duration::days(offset as i64))
            );
        }
    }

    #[test]
    fn day_assignment_matches_offsets() {
        let period = day_period(date(2026, 2, 1), date(2026, 2, 28));
        assert_eq!(assign(&period, date(2026, 2, 1)), Some(0));
        assert_eq!(assign(&period, date(2026, 2, 14)), Some(13));
        assert_eq!(assign(&period, date(2026, 1, 31)), None);
        assert_eq!(assign(&period, date(2026, 3, 1)), None);
    }

    #[test]
    fn week_buckets_run_sunday_through_saturday() {
        let period = Period {
            start: date(2026, 3, 15), // a Sunday
            end: date(2026, 3, 21),
            granularity: Granularity::DayOfWeek,
        };
        let labels: Vec<String> = bucket_keys(&period).iter().map(BucketKey::label).collect();
        assert_eq!(labels, ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]);
        assert_eq!(assign(&period, date(2026, 3, 18)), Some(3)); // Wednesday
        assert_eq!(assign(&period, date(2026, 3, 22)), None);
    }

    #[test]
    fn educational_year_has_eleven_months_august_first() {
        let period = Period {
            start: date(2025, 8, 1),
            end: date(2026, 2, 10),
            granularity: Granularity::Month,
        };
        let labels: Vec<String> = bucket_keys(&period).iter().map(BucketKey::label).collect();
        assert_eq!(
            labels,
            ["Aug", "Sep", "Oct", "Nov", "Dec", "Jan", "Feb", "Mar", "Apr", "May", "Jun"]
        );
    }

    #[test]
    fn month_assignment_splits_educational_years() {
        let period = Period {
            start: date(2025, 8, 1),
            end: date(2026, 6, 30),
            granularity: Granularity::Month,
        };
        // July 31 belongs to the previous educational year, August 1 to this
        // one.
        assert_eq!(assign(&period, date(2025, 7, 31)), None);
        assert_eq!(assign(&period, date(2025, 8, 1)), Some(0));
        assert_eq!(assign(&period, date(2025, 12, 15)), Some(4));
        assert_eq!(assign(&period, date(2026, 1, 15)), Some(5));
        assert_eq!(assign(&period, date(2026, 6, 30)), Some(10));
        assert_eq!(assign(&period, date(2026, 7, 1)), None);
        assert_eq!(assign(&period, date(2026, 8, 1)), None);
    }
}
