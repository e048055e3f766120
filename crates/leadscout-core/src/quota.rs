use serde::{Deserialize, Serialize};

/// Brand-scoped monthly scrape-job allowance.
///
/// The counter is owned by the backend; this is a cached read of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionQuota {
    pub scrape_jobs_this_month: u32,
    pub monthly_limit: u32,
}

impl SubscriptionQuota {
    #[must_use]
    pub fn new(scrape_jobs_this_month: u32, monthly_limit: u32) -> Self {
        Self {
            scrape_jobs_this_month,
            monthly_limit,
        }
    }

    #[must_use]
    pub fn remaining_jobs(&self) -> u32 {
        self.monthly_limit.saturating_sub(self.scrape_jobs_this_month)
    }

    #[must_use]
    pub fn has_access(&self) -> bool {
        self.remaining_jobs() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_jobs_never_goes_negative() {
        assert_eq!(SubscriptionQuota::new(40, 100).remaining_jobs(), 60);
        assert_eq!(SubscriptionQuota::new(100, 100).remaining_jobs(), 0);
        assert_eq!(SubscriptionQuota::new(130, 100).remaining_jobs(), 0);
    }

    #[test]
    fn access_requires_remaining_jobs() {
        assert!(SubscriptionQuota::new(99, 100).has_access());
        assert!(!SubscriptionQuota::new(100, 100).has_access());
    }
}
