//! The seam between the engine and the Leadscout backend.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use leadscout_client::{
    ClientError, CreateProspectRequest, DeleteKeywordsRequest, DeleteProspectRequest,
    LeadscoutClient, PostActionRequest, QuotaResponse, ScrapeBatchRequest, ScrapeBatchResponse,
};
use leadscout_core::Prospect;
use uuid::Uuid;

use crate::error::EngineError;

/// Backend operations the engine depends on. [`LeadscoutClient`] is the
/// production implementation.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn submit_scrape_batch(
        &self,
        request: &ScrapeBatchRequest,
    ) -> Result<ScrapeBatchResponse, ClientError>;

    async fn check_quota(&self, brand_id: Uuid) -> Result<QuotaResponse, ClientError>;

    async fn post_action(&self, request: &PostActionRequest) -> Result<(), ClientError>;

    async fn list_prospects(&self, brand_id: Uuid) -> Result<Vec<Prospect>, ClientError>;

    async fn create_prospect(
        &self,
        brand_id: Uuid,
        request: &CreateProspectRequest,
    ) -> Result<Prospect, ClientError>;

    async fn delete_keywords(&self, request: &DeleteKeywordsRequest) -> Result<(), ClientError>;

    async fn delete_prospect(&self, request: &DeleteProspectRequest) -> Result<(), ClientError>;
}

#[async_trait]
impl Backend for LeadscoutClient {
    async fn submit_scrape_batch(
        &self,
        request: &ScrapeBatchRequest,
    ) -> Result<ScrapeBatchResponse, ClientError> {
        LeadscoutClient::submit_scrape_batch(self, request).await
    }

    async fn check_quota(&self, brand_id: Uuid) -> Result<QuotaResponse, ClientError> {
        LeadscoutClient::check_quota(self, brand_id).await
    }

    async fn post_action(&self, request: &PostActionRequest) -> Result<(), ClientError> {
        LeadscoutClient::post_action(self, request).await
    }

    async fn list_prospects(&self, brand_id: Uuid) -> Result<Vec<Prospect>, ClientError> {
        LeadscoutClient::list_prospects(self, brand_id).await
    }

    async fn create_prospect(
        &self,
        brand_id: Uuid,
        request: &CreateProspectRequest,
    ) -> Result<Prospect, ClientError> {
        LeadscoutClient::create_prospect(self, brand_id, request).await
    }

    async fn delete_keywords(&self, request: &DeleteKeywordsRequest) -> Result<(), ClientError> {
        LeadscoutClient::delete_keywords(self, request).await
    }

    async fn delete_prospect(&self, request: &DeleteProspectRequest) -> Result<(), ClientError> {
        LeadscoutClient::delete_prospect(self, request).await
    }
}

/// Await a backend call under a client-side deadline.
///
/// A timeout is reported as [`EngineError::Timeout`] and treated like any
/// other network failure by callers.
///
/// # Errors
///
/// Returns the converted backend error, or [`EngineError::Timeout`].
pub(crate) async fn call<T, F>(
    operation: &'static str,
    timeout: Duration,
    request: F,
) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result.map_err(EngineError::from),
        Err(_) => Err(EngineError::Timeout {
            operation,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
