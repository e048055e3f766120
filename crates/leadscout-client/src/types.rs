//! Request and response bodies for the Leadscout backend.
//!
//! Request bodies are camelCase on the wire; prospects and posts come back in
//! the backend's snake_case record shape (see `leadscout_core`).

use leadscout_core::{Post, ScrapeJob, SubscriptionQuota, TriageAction};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `POST /scrape-jobs/batch`: every queued job in one request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeBatchRequest {
    pub brand_id: Uuid,
    pub brand_offerings: Vec<String>,
    pub scrape_jobs: Vec<ScrapeJob>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeBatchResponse {
    /// Number of jobs the scraping service accepted.
    pub accepted: usize,
}

/// `GET /brands/{brandId}/quota`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaResponse {
    pub has_access: bool,
    pub remaining_jobs: u32,
    pub used_jobs: u32,
    pub monthly_limit: u32,
}

impl QuotaResponse {
    #[must_use]
    pub fn quota(&self) -> SubscriptionQuota {
        SubscriptionQuota::new(self.used_jobs, self.monthly_limit)
    }
}

/// `POST /posts/action`. The backend treats a repeated action as a no-op.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostActionRequest {
    pub post: Post,
    pub action: TriageAction,
    pub brand_id: Uuid,
    pub prospect_id: Uuid,
}

/// `POST /brands/{brandId}/prospects`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProspectRequest {
    pub problem_to_solve: String,
    pub keywords: Vec<String>,
}

/// `POST /prospects/keywords/delete`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteKeywordsRequest {
    pub brand_id: Uuid,
    pub prospect_id: Uuid,
    pub keywords: Vec<String>,
}

/// `POST /prospects/delete`. Irreversible; cascades to posts and keywords.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProspectRequest {
    pub brand_id: Uuid,
    pub prospect_id: Uuid,
}

/// Error body the backend sends with non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(alias = "error")]
    pub(crate) message: String,
}
