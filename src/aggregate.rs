use tracing::warn;

use crate::bucket;
use crate::models::{BucketRollup, Category, CategoryBucket, DayDetail, Period, PointTransaction};

/// Rolls transactions up into the period's zero-filled buckets.
///
/// Deducted and withdrawn totals are normalized to non-negative magnitudes
/// at this boundary; legacy rows store the sign inconsistently. Entries with
/// an unrecognized category are excluded from the categorized totals but
/// their stored value still flows into `net_total` and the detail list.
pub fn rollup(period: &Period, transactions: &[PointTransaction]) -> Vec<BucketRollup> {
    let mut buckets: Vec<BucketRollup> = bucket::bucket_keys(period)
        .iter()
        .map(|key| BucketRollup {
            label: key.label(),
            awarded_total: 0,
            deducted_total: 0,
            withdrawn_total: 0,
            net_total: 0,
            day_detail: Vec::new(),
        })
        .collect();

    for tx in transactions {
        let day = tx.occurred_at.date_naive();
        let Some(index) = bucket::assign(period, day) else {
            continue;
        };
        let entry = &mut buckets[index];

        match Category::parse(&tx.category) {
            Some(Category::Award) => {
                entry.awarded_total += tx.points.abs();
                entry.net_total += tx.points.abs();
            }
            Some(Category::Deduct) => {
                entry.deducted_total += tx.points.abs();
                entry.net_total -= tx.points.abs();
            }
            Some(Category::Withdraw) => {
                entry.withdrawn_total += tx.points.abs();
                entry.net_total -= tx.points.abs();
            }
            Some(Category::Feedback) => {}
            None => {
                warn!(
                    transaction = %tx.id,
                    category = %tx.category,
                    "unrecognized category; excluded from categorized totals"
                );
                entry.net_total += tx.points;
            }
        }

        entry.day_detail.push(DayDetail {
            day,
            category: tx.category.clone(),
            points: tx.points,
        });
    }

    buckets
}

/// Per-bucket totals for a single category.
pub fn category_series(
    period: &Period,
    transactions: &[PointTransaction],
    category: Category,
) -> Vec<CategoryBucket> {
    let mut buckets: Vec<CategoryBucket> = bucket::bucket_keys(period)
        .iter()
        .map(|key| CategoryBucket {
            label: key.label(),
            total_points: 0,
        })
        .collect();

    for tx in transactions {
        if Category::parse(&tx.category) != Some(category) {
            continue;
        }
        if let Some(index) = bucket::assign(period, tx.occurred_at.date_naive()) {
            buckets[index].total_points += tx.points.abs();
        }
    }

    buckets
}

/// Category totals without bucketing, for lifetime summaries.
pub fn category_totals(transactions: &[PointTransaction]) -> (i64, i64, i64) {
    let mut awarded = 0;
    let mut deducted = 0;
    let mut withdrawn = 0;

    for tx in transactions {
        match Category::parse(&tx.category) {
            Some(Category::Award) => awarded += tx.points.abs(),
            Some(Category::Deduct) => deducted += tx.points.abs(),
            Some(Category::Withdraw) => withdrawn += tx.points.abs(),
            _ => {}
        }
    }

    (awarded, deducted, withdrawn)
}
