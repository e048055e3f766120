//! Subscription quota check in front of batch scrape submission.
//!
//! The gate fails closed: if the backend cannot be asked, submission is
//! denied rather than allowed.

use std::time::Duration;

use leadscout_core::SubscriptionQuota;
use serde::Serialize;
use uuid::Uuid;

use crate::backend::{call, Backend};
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaDecision {
    Granted(SubscriptionQuota),
    Denied(SubscriptionQuota),
    /// The check itself failed or timed out.
    Unavailable { reason: String },
}

impl QuotaDecision {
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, QuotaDecision::Granted(_))
    }

    /// # Errors
    ///
    /// Returns [`EngineError::Quota`] for a denial and
    /// [`EngineError::QuotaUnavailable`] when the check could not complete.
    pub fn into_result(self) -> Result<SubscriptionQuota, EngineError> {
        match self {
            QuotaDecision::Granted(quota) => Ok(quota),
            QuotaDecision::Denied(quota) => Err(EngineError::Quota {
                remaining_jobs: quota.remaining_jobs(),
                used_jobs: quota.scrape_jobs_this_month,
                monthly_limit: quota.monthly_limit,
            }),
            QuotaDecision::Unavailable { reason } => Err(EngineError::QuotaUnavailable { reason }),
        }
    }
}

/// What the paywall needs to explain a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaywallSignal {
    pub remaining_jobs: u32,
    pub used_jobs: u32,
    pub monthly_limit: u32,
}

impl PaywallSignal {
    #[must_use]
    pub fn from_error(err: &EngineError) -> Option<Self> {
        match err {
            EngineError::Quota {
                remaining_jobs,
                used_jobs,
                monthly_limit,
            } => Some(Self {
                remaining_jobs: *remaining_jobs,
                used_jobs: *used_jobs,
                monthly_limit: *monthly_limit,
            }),
            _ => None,
        }
    }
}

pub struct QuotaGate {
    brand_id: Uuid,
    timeout: Duration,
    fallback_monthly_limit: u32,
    last_quota: Option<SubscriptionQuota>,
}

impl QuotaGate {
    #[must_use]
    pub fn new(brand_id: Uuid, timeout: Duration) -> Self {
        Self {
            brand_id,
            timeout,
            fallback_monthly_limit: 0,
            last_quota: None,
        }
    }

    /// Monthly limit to assume when the backend reports a limit of zero.
    #[must_use]
    pub fn with_fallback_monthly_limit(mut self, limit: u32) -> Self {
        self.fallback_monthly_limit = limit;
        self
    }

    /// Ask the backend whether the brand may run more scrape jobs.
    ///
    /// Both the backend's `hasAccess` flag and the derived remaining count
    /// must allow it.
    pub async fn check_access<B: Backend + ?Sized>(&mut self, backend: &B) -> QuotaDecision {
        match call("quota check", self.timeout, backend.check_quota(self.brand_id)).await {
            Ok(response) => {
                let mut quota = response.quota();
                if quota.monthly_limit == 0 && self.fallback_monthly_limit > 0 {
                    tracing::debug!(
                        brand_id = %self.brand_id,
                        fallback = self.fallback_monthly_limit,
                        "backend reported no monthly limit, using configured limit"
                    );
                    quota.monthly_limit = self.fallback_monthly_limit;
                }
                self.last_quota = Some(quota);
                if response.has_access && quota.has_access() {
                    tracing::debug!(
                        brand_id = %self.brand_id,
                        remaining_jobs = quota.remaining_jobs(),
                        "scrape quota granted"
                    );
                    QuotaDecision::Granted(quota)
                } else {
                    tracing::info!(
                        brand_id = %self.brand_id,
                        used_jobs = quota.scrape_jobs_this_month,
                        monthly_limit = quota.monthly_limit,
                        "scrape quota exhausted"
                    );
                    QuotaDecision::Denied(quota)
                }
            }
            Err(err) => {
                tracing::warn!(
                    brand_id = %self.brand_id,
                    error = %err,
                    "quota check failed, denying submission"
                );
                QuotaDecision::Unavailable {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Quota from the most recent successful check.
    #[must_use]
    pub fn last_quota(&self) -> Option<SubscriptionQuota> {
        self.last_quota
    }

    #[must_use]
    pub fn remaining_jobs(&self) -> Option<u32> {
        self.last_quota.map(|q| q.remaining_jobs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{quota, FakeBackend};
    use leadscout_client::QuotaResponse;

    fn gate() -> QuotaGate {
        QuotaGate::new(Uuid::new_v4(), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn grants_when_jobs_remain() {
        let backend = FakeBackend::new();
        backend.state().quota = quota(40, 100);
        let mut gate = gate();
        let decision = gate.check_access(&backend).await;
        assert!(decision.is_granted());
        assert_eq!(gate.remaining_jobs(), Some(60));
    }

    #[tokio::test]
    async fn denies_exhausted_quota_with_paywall_numbers() {
        let backend = FakeBackend::new();
        backend.state().quota = quota(100, 100);
        let mut gate = gate();
        let err = gate.check_access(&backend).await.into_result().unwrap_err();
        let signal = PaywallSignal::from_error(&err).expect("quota error");
        assert_eq!(
            signal,
            PaywallSignal {
                remaining_jobs: 0,
                used_jobs: 100,
                monthly_limit: 100
            }
        );
    }

    #[tokio::test]
    async fn backend_flag_can_deny_despite_remaining_jobs() {
        let backend = FakeBackend::new();
        let mut response = quota(10, 100);
        response.has_access = false;
        backend.state().quota = response;
        let decision = gate().check_access(&backend).await;
        assert!(matches!(decision, QuotaDecision::Denied(_)));
    }

    #[tokio::test]
    async fn zero_backend_limit_falls_back_to_configured_limit() {
        let backend = FakeBackend::new();
        backend.state().quota = QuotaResponse {
            has_access: true,
            remaining_jobs: 0,
            used_jobs: 40,
            monthly_limit: 0,
        };
        let mut gate = gate().with_fallback_monthly_limit(100);
        let decision = gate.check_access(&backend).await;
        assert_eq!(decision, QuotaDecision::Granted(SubscriptionQuota::new(40, 100)));
        assert_eq!(gate.remaining_jobs(), Some(60));
    }

    #[tokio::test]
    async fn zero_backend_limit_without_fallback_denies() {
        let backend = FakeBackend::new();
        backend.state().quota = QuotaResponse {
            has_access: true,
            remaining_jobs: 0,
            used_jobs: 0,
            monthly_limit: 0,
        };
        let decision = gate().check_access(&backend).await;
        assert!(matches!(decision, QuotaDecision::Denied(_)));
    }

    #[tokio::test]
    async fn fails_closed_when_check_errors() {
        let backend = FakeBackend::new();
        backend.state().quota_fails = true;
        let mut gate = gate();
        let decision = gate.check_access(&backend).await;
        assert!(!decision.is_granted());
        assert!(matches!(
            decision.into_result(),
            Err(EngineError::QuotaUnavailable { .. })
        ));
        assert!(gate.last_quota().is_none());
    }

    #[tokio::test]
    async fn fails_closed_on_timeout() {
        let backend = FakeBackend::new();
        backend.state().delay = Some(Duration::from_secs(2));
        let decision = gate().check_access(&backend).await;
        match decision {
            QuotaDecision::Unavailable { reason } => {
                assert!(reason.contains("timed out"), "{reason}");
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }
}
