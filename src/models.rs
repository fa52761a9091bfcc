use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One entry in the append-only points ledger. `actor_name` and
/// `subject_name` are snapshots taken at submission time; renaming a person
/// never rewrites history.
#[derive(Debug, Clone)]
pub struct PointTransaction {
    pub id: Uuid,
    pub school_id: Uuid,
    pub form_id: Uuid,
    /// Raw stored value. Legacy rows hold sentinels like "N/A"; parse with
    /// [`Category::parse`] and treat failures as data-quality warnings.
    pub category: String,
    pub actor_id: Uuid,
    pub actor_name: String,
    pub subject_id: Uuid,
    pub subject_name: String,
    /// Magnitude by convention, but legacy rows are sometimes stored signed.
    /// Sign semantics come from `category`, not from this value.
    pub points: i64,
    pub occurred_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Category {
    Award,
    Deduct,
    Withdraw,
    Feedback,
}

impl Category {
    pub fn parse(raw: &str) -> Option<Category> {
        match raw {
            "award" => Some(Category::Award),
            "deduct" => Some(Category::Deduct),
            "withdraw" => Some(Category::Withdraw),
            "feedback" => Some(Category::Feedback),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Teacher,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            "admin" => Some(Role::Admin),
            "teacher" => Some(Role::Teacher),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StaffRecord {
    pub id: Uuid,
    pub school_id: Option<Uuid>,
    pub full_name: String,
    pub role: Role,
    /// None marks a "special" teacher with no grade assignment; they see the
    /// whole school.
    pub grade: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: Uuid,
    pub school_id: Uuid,
    pub full_name: String,
    pub grade: i32,
}

/// Visibility scope derived from a principal. `subject_allowlist` is absent
/// for whole-school visibility (admins, special teachers).
#[derive(Debug, Clone)]
pub struct ScopeDescriptor {
    pub school_id: Uuid,
    pub subject_allowlist: Option<HashSet<Uuid>>,
}

impl ScopeDescriptor {
    pub fn permits(&self, subject_id: Uuid) -> bool {
        match &self.subject_allowlist {
            Some(allowlist) => allowlist.contains(&subject_id),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    DayOfWeek,
    Month,
}

/// Resolved reporting window. `start` and `end` are inclusive calendar days
/// in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: Granularity,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayDetail {
    pub day: NaiveDate,
    pub category: String,
    pub points: i64,
}

/// Per-bucket rollup across all categories. Deducted and withdrawn totals
/// are reported as non-negative magnitudes regardless of stored sign.
#[derive(Debug, Clone, Serialize)]
pub struct BucketRollup {
    pub label: String,
    pub awarded_total: i64,
    pub deducted_total: i64,
    pub withdrawn_total: i64,
    pub net_total: i64,
    pub day_detail: Vec<DayDetail>,
}

/// Per-bucket total for a single category, used by week rollups and
/// historical series.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryBucket {
    pub label: String,
    pub total_points: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingEntry {
    pub name: String,
    pub total_points: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoricalSeries {
    pub buckets: Vec<CategoryBucket>,
    pub transactions: Vec<DayDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRecord {
    pub actor_name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectSummary {
    pub subject_name: String,
    pub awarded_total: i64,
    pub deducted_total: i64,
    pub withdrawn_total: i64,
    pub feedback: Vec<FeedbackRecord>,
}
