use leadscout_client::ClientError;
use leadscout_core::{CoreError, KeywordBudgetViolation};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The brand has used its monthly scrape jobs. Recoverable by upgrading.
    #[error(
        "monthly scrape limit reached: {used_jobs} of {monthly_limit} jobs used, {remaining_jobs} remaining"
    )]
    Quota {
        remaining_jobs: u32,
        used_jobs: u32,
        monthly_limit: u32,
    },

    /// The quota check itself failed; submission is denied until it succeeds.
    #[error("could not verify scrape quota: {reason}")]
    QuotaUnavailable { reason: String },

    /// One or more queued jobs exceed the per-prospect keyword budget.
    #[error("{} prospect(s) exceed the keyword limit", .0.len())]
    Validation(Vec<KeywordBudgetViolation>),

    #[error("backend request failed: {0}")]
    Backend(#[source] ClientError),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// The prospect or post no longer exists, possibly deleted elsewhere.
    #[error("{what} not found")]
    NotFound { what: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<ClientError> for EngineError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound { url } => EngineError::NotFound { what: url },
            other => EngineError::Backend(other),
        }
    }
}

impl EngineError {
    /// Returns `true` when sending the same request again may succeed without
    /// the user changing anything.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Backend(_)
                | EngineError::Timeout { .. }
                | EngineError::QuotaUnavailable { .. }
        )
    }

    /// Returns `true` for both a quota denial and an unverifiable quota.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            EngineError::Quota { .. } | EngineError::QuotaUnavailable { .. }
        )
    }
}
