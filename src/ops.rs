//! The read operations consumed by the presentation layer. Each one
//! composes the same three pure steps: resolve scope, resolve period, then
//! bucketize/aggregate the fetched window. All operations are read-only and
//! idempotent; a concurrent append simply may not be visible yet.

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    BucketRollup, Category, CategoryBucket, DayDetail, FeedbackRecord, HistoricalSeries, Period,
    PointTransaction, RankingEntry, ScopeDescriptor, SubjectSummary,
};
use crate::ranking::{self, RankBy};
use crate::{aggregate, db, period, scope};

async fn fetch_scoped(
    pool: &PgPool,
    scope: &ScopeDescriptor,
    period: &Period,
    subject_ids: Option<&[Uuid]>,
) -> anyhow::Result<Vec<PointTransaction>> {
    let (from, until) = period::utc_bounds(period);
    let allowlist: Option<Vec<Uuid>> = match subject_ids {
        Some(ids) => Some(ids.to_vec()),
        None => scope
            .subject_allowlist
            .as_ref()
            .map(|ids| ids.iter().copied().collect()),
    };
    db::fetch_transactions(pool, scope.school_id, from, until, allowlist.as_deref()).await
}

/// Monthly rollup for the current educational year, scoped to the
/// principal's visibility.
pub async fn year_rollup(pool: &PgPool, principal: Uuid) -> anyhow::Result<Vec<BucketRollup>> {
    let scope = scope::resolve(pool, principal).await?;
    let period = period::educational_year(period::today());
    let transactions = fetch_scoped(pool, &scope, &period, None).await?;
    Ok(aggregate::rollup(&period, &transactions))
}

/// Same shape as [`year_rollup`] but for one explicitly named subject. The
/// subject must pass the principal's allow-list check.
pub async fn year_rollup_for_subject(
    pool: &PgPool,
    principal: Uuid,
    subject_id: Uuid,
) -> anyhow::Result<Vec<BucketRollup>> {
    let scope = scope::resolve(pool, principal).await?;
    scope::authorize_subject(&scope, principal, subject_id)?;
    let period = period::educational_year(period::today());
    let transactions = fetch_scoped(pool, &scope, &period, Some(&[subject_id])).await?;
    Ok(aggregate::rollup(&period, &transactions))
}

/// Seven Sun..Sat buckets for one category in the week containing
/// `start_date` (default: today).
pub async fn week_rollup(
    pool: &PgPool,
    principal: Uuid,
    start_date: Option<NaiveDate>,
    category: Category,
) -> anyhow::Result<Vec<CategoryBucket>> {
    let scope = scope::resolve(pool, principal).await?;
    let period = period::week_period(start_date, period::today());
    let transactions = fetch_scoped(pool, &scope, &period, None).await?;
    Ok(aggregate::category_series(&period, &transactions, category))
}

/// Per-day totals for a relative period token, plus the raw contributing
/// transactions for drill-down.
pub async fn historical_series(
    pool: &PgPool,
    principal: Uuid,
    token: &str,
    category: Category,
) -> anyhow::Result<HistoricalSeries> {
    let scope = scope::resolve(pool, principal).await?;
    let period = period::resolve_token(token, period::today())?;
    let transactions = fetch_scoped(pool, &scope, &period, None).await?;
    let buckets = aggregate::category_series(&period, &transactions, category);
    let raw = transactions
        .iter()
        .filter(|tx| Category::parse(&tx.category) == Some(category))
        .map(|tx| DayDetail {
            day: tx.occurred_at.date_naive(),
            category: tx.category.clone(),
            points: tx.points,
        })
        .collect();
    Ok(HistoricalSeries {
        buckets,
        transactions: raw,
    })
}

/// Leaderboard over a lookback window (default: the current week),
/// recomputed from the ledger on every request. Zero-activity roster
/// entries still appear.
pub async fn ranking(
    pool: &PgPool,
    principal: Uuid,
    by: RankBy,
    category: Category,
    token: Option<&str>,
) -> anyhow::Result<Vec<RankingEntry>> {
    let scope = scope::resolve(pool, principal).await?;
    let period = match token {
        Some(token) => period::resolve_token(token, period::today())?,
        None => period::week_period(None, period::today()),
    };
    let transactions = fetch_scoped(pool, &scope, &period, None).await?;

    let roster = match by {
        RankBy::Actor => db::fetch_staff_names(pool, scope.school_id).await?,
        RankBy::Subject => db::fetch_students(pool, scope.school_id)
            .await?
            .into_iter()
            .filter(|s| scope.permits(s.id))
            .map(|s| s.full_name)
            .collect(),
    };

    Ok(ranking::rank(&roster, &transactions, by, category))
}

/// Category totals for one subject since the educational-year start, with
/// the subject's feedback records.
pub async fn subject_lifetime_summary(
    pool: &PgPool,
    principal: Uuid,
    subject_id: Uuid,
) -> anyhow::Result<SubjectSummary> {
    let scope = scope::resolve(pool, principal).await?;
    scope::authorize_subject(&scope, principal, subject_id)?;

    let today = period::today();
    let period = period::explicit_range(period::educational_year_start(today), today)?;
    let transactions = fetch_scoped(pool, &scope, &period, Some(&[subject_id])).await?;

    let (awarded_total, deducted_total, withdrawn_total) =
        aggregate::category_totals(&transactions);
    let feedback = transactions
        .iter()
        .filter(|tx| Category::parse(&tx.category) == Some(Category::Feedback))
        .map(|tx| FeedbackRecord {
            actor_name: tx.actor_name.clone(),
            occurred_at: tx.occurred_at,
        })
        .collect();

    let subject_name = match db::fetch_student_name(pool, subject_id).await? {
        Some(name) => name,
        None => transactions
            .first()
            .map(|tx| tx.subject_name.clone())
            .unwrap_or_default(),
    };

    Ok(SubjectSummary {
        subject_name,
        awarded_total,
        deducted_total,
        withdrawn_total,
        feedback,
    })
}
