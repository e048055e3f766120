use std::time::Duration;

use crate::limits::Limits;

/// Upper bound on a single back-off sleep between client retries.
pub const MAX_RETRY_DELAY_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// What the triage board does with an optimistic status change when the
/// backend rejects the post action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Restore the post to `Pending`.
    Rollback,
    /// Keep the new status, flag it unconfirmed and retry it later.
    #[default]
    MarkUnconfirmed,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Rollback => write!(f, "rollback"),
            FailurePolicy::MarkUnconfirmed => write!(f, "mark_unconfirmed"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub env: Environment,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub triage_failure_policy: FailurePolicy,
    pub limits: Limits,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[redacted]"))
            .field("env", &self.env)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("triage_failure_policy", &self.triage_failure_policy)
            .field("limits", &self.limits)
            .finish()
    }
}

impl AppConfig {
    /// Deadline for one engine operation, covering every client attempt.
    ///
    /// Each of the `max_retries + 1` attempts may use the full request
    /// timeout, and each back-off sleep may reach 125 % of its scheduled
    /// delay. A server `Retry-After` longer than the schedule is not covered.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        let per_attempt_ms = self.request_timeout_secs.saturating_mul(1_000);
        let attempts_ms = per_attempt_ms.saturating_mul(u64::from(self.max_retries) + 1);
        let backoff_ms: u64 = (0..self.max_retries)
            .map(|retry| {
                let scheduled = self
                    .retry_backoff_base_ms
                    .saturating_mul(1u64 << retry.min(10))
                    .min(MAX_RETRY_DELAY_MS);
                scheduled + scheduled / 4
            })
            .fold(0, u64::saturating_add);
        Duration::from_millis(attempts_ms.saturating_add(backoff_ms))
    }
}
