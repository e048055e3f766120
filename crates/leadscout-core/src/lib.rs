//! Domain model for Leadscout: prospects, sourced Reddit posts, scrape jobs,
//! subscription quotas, keyword ranking, and environment configuration.

pub mod app_config;
pub mod config;
pub mod keywords;
pub mod limits;
pub mod posts;
pub mod prospects;
pub mod quota;
pub mod scrape_job;

use thiserror::Error;
use uuid::Uuid;

pub use app_config::{AppConfig, Environment, FailurePolicy, MAX_RETRY_DELAY_MS};
pub use config::{load_app_config, load_app_config_from_env};
pub use keywords::{normalize_keyword, rank_keywords, RankedKeywords};
pub use limits::Limits;
pub use posts::{IngestedPost, Post, PostCounts, PostStatus, ReviewableItem, TriageAction};
pub use prospects::{ensure_prospect_capacity, Prospect};
pub use quota::SubscriptionQuota;
pub use scrape_job::{KeywordBudgetViolation, ScrapeJob, ScrapeJobPatch};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error(
        "prospect {prospect_id} would hold {total} keywords (max {max}); remove some before adding more"
    )]
    KeywordLimit {
        prospect_id: Uuid,
        total: usize,
        max: usize,
    },

    #[error("keyword must not be empty")]
    EmptyKeyword,

    #[error("brand already has {existing} prospects (max {max})")]
    ProspectLimit { existing: usize, max: usize },
}
