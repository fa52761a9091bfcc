use uuid::Uuid;

/// Failures detected before any ledger query runs. Aggregation-time
/// anomalies (unknown categories) are recovered locally and never surface
/// here.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("principal {principal} is not authorized: {reason}")]
    NotAuthorized { principal: Uuid, reason: String },
    #[error("invalid period: {0}")]
    InvalidPeriod(String),
}

impl AnalyticsError {
    pub fn not_authorized(principal: Uuid, reason: impl Into<String>) -> Self {
        AnalyticsError::NotAuthorized {
            principal,
            reason: reason.into(),
        }
    }
}
