//! User-facing messages for engine failures.

use serde::Serialize;

use crate::error::EngineError;
use crate::quota_gate::PaywallSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

/// What the user can do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    Retry,
    RemoveKeywords,
    UpgradePlan,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: ToastLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<SuggestedAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paywall: Option<PaywallSignal>,
}

impl Notification {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Info,
            message: message.into(),
            action: None,
            paywall: None,
        }
    }

    #[must_use]
    pub fn from_error(err: &EngineError) -> Self {
        let (level, message, action) = match err {
            EngineError::Quota {
                used_jobs,
                monthly_limit,
                ..
            } => (
                ToastLevel::Warning,
                format!(
                    "You've used {used_jobs} of {monthly_limit} scrape jobs this month. \
                     Upgrade your plan to run more."
                ),
                Some(SuggestedAction::UpgradePlan),
            ),
            EngineError::QuotaUnavailable { .. } => (
                ToastLevel::Error,
                "Couldn't verify your subscription. Nothing was submitted; please try again."
                    .to_string(),
                Some(SuggestedAction::Retry),
            ),
            EngineError::Validation(violations) => {
                let detail = violations
                    .iter()
                    .map(|v| {
                        format!(
                            "'{}' would have {} keywords (max {}), remove {}",
                            v.problem_to_solve,
                            v.total,
                            v.max,
                            v.total.saturating_sub(v.max)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                (
                    ToastLevel::Warning,
                    format!("Too many keywords: {detail}."),
                    Some(SuggestedAction::RemoveKeywords),
                )
            }
            EngineError::Backend(_) | EngineError::Timeout { .. } => (
                ToastLevel::Error,
                "Couldn't reach Leadscout. Your changes are kept; please try again.".to_string(),
                Some(SuggestedAction::Retry),
            ),
            EngineError::NotFound { .. } => (
                ToastLevel::Warning,
                "That item no longer exists. Refreshing your prospects.".to_string(),
                Some(SuggestedAction::Refresh),
            ),
            EngineError::Core(core) => (ToastLevel::Warning, core.to_string(), None),
        };
        Self {
            level,
            message,
            action,
            paywall: PaywallSignal::from_error(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscout_core::{CoreError, KeywordBudgetViolation};
    use uuid::Uuid;

    #[test]
    fn quota_denial_points_to_upgrade_with_paywall() {
        let n = Notification::from_error(&EngineError::Quota {
            remaining_jobs: 0,
            used_jobs: 100,
            monthly_limit: 100,
        });
        assert_eq!(n.level, ToastLevel::Warning);
        assert_eq!(n.action, Some(SuggestedAction::UpgradePlan));
        assert!(n.message.contains("100 of 100"));
        assert_eq!(n.paywall.map(|p| p.remaining_jobs), Some(0));
    }

    #[test]
    fn validation_names_each_prospect_and_overflow() {
        let n = Notification::from_error(&EngineError::Validation(vec![
            KeywordBudgetViolation {
                prospect_id: Uuid::new_v4(),
                problem_to_solve: "Late invoices".to_string(),
                existing: 2,
                new: 29,
                total: 31,
                max: 30,
            },
        ]));
        assert_eq!(n.action, Some(SuggestedAction::RemoveKeywords));
        assert!(n.message.contains("'Late invoices' would have 31 keywords (max 30), remove 1"));
        assert!(n.paywall.is_none());
    }

    #[test]
    fn network_failures_suggest_retry() {
        let n = Notification::from_error(&EngineError::Timeout {
            operation: "batch submission",
            timeout_ms: 30_000,
        });
        assert_eq!(n.level, ToastLevel::Error);
        assert_eq!(n.action, Some(SuggestedAction::Retry));
    }

    #[test]
    fn core_errors_use_their_message() {
        let n = Notification::from_error(&EngineError::Core(CoreError::ProspectLimit {
            existing: 3,
            max: 3,
        }));
        assert_eq!(n.message, CoreError::ProspectLimit { existing: 3, max: 3 }.to_string());
        assert!(n.action.is_none());
    }

    #[test]
    fn serializes_without_empty_fields() {
        let value = serde_json::to_value(Notification::info("Batch submitted")).unwrap();
        assert_eq!(value["level"], "info");
        assert!(value.get("action").is_none());
        assert!(value.get("paywall").is_none());
    }
}
