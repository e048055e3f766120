//! HTTP client for the Leadscout backend REST API.
//!
//! Wraps `reqwest` with bearer-token auth, typed request/response bodies and
//! status-code mapping. Idempotent calls (quota checks, post actions,
//! deletions, listings) are retried on transient failures; batch scrape
//! submission and prospect creation are sent once and left to the caller.

use std::time::Duration;

use leadscout_core::{AppConfig, Prospect};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ClientError;
use crate::retry::retry_with_backoff;
use crate::types::{
    ApiErrorBody, CreateProspectRequest, DeleteKeywordsRequest, DeleteProspectRequest,
    PostActionRequest, QuotaResponse, ScrapeBatchRequest, ScrapeBatchResponse,
};

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_BASE_MS: u64 = 500;

/// Client for the Leadscout backend.
///
/// Use [`LeadscoutClient::from_config`] in production or
/// [`LeadscoutClient::with_base_url`] to point at a mock server in tests.
pub struct LeadscoutClient {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl LeadscoutClient {
    /// Creates a client from application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`ClientError::InvalidBaseUrl`] if the configured URL is invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        Ok(Self::with_base_url(
            &config.api_base_url,
            config.request_timeout_secs,
            &config.user_agent,
        )?
        .with_api_token(config.api_token.clone())
        .with_retry_policy(config.max_retries, config.retry_backoff_base_ms))
    }

    /// Creates a client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`ClientError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // A trailing slash makes Url::join append to the path instead of
        // replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ClientError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            api_token: None,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        })
    }

    #[must_use]
    pub fn with_api_token(mut self, api_token: Option<String>) -> Self {
        self.api_token = api_token;
        self
    }

    /// `max_retries` is the number of additional attempts after the first
    /// failure; `0` disables retries.
    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Submits every queued scrape job as one batch. Sent exactly once.
    ///
    /// # Errors
    ///
    /// - [`ClientError::UnexpectedStatus`] if the backend rejects the batch.
    /// - [`ClientError::Http`] on network failure or timeout.
    /// - [`ClientError::Deserialize`] if the acknowledgement does not parse.
    pub async fn submit_scrape_batch(
        &self,
        request: &ScrapeBatchRequest,
    ) -> Result<ScrapeBatchResponse, ClientError> {
        let url = self.endpoint("scrape-jobs/batch")?;
        let body = self.send(Method::POST, &url, Some(request), false).await?;
        decode(&body, "scrape-jobs/batch")
    }

    /// Reads the brand's monthly scrape-job usage.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotFound`] if the brand does not exist.
    /// - [`ClientError::Http`] / [`ClientError::UnexpectedStatus`] after retries.
    /// - [`ClientError::Deserialize`] if the body does not parse.
    pub async fn check_quota(&self, brand_id: Uuid) -> Result<QuotaResponse, ClientError> {
        let url = self.endpoint(&format!("brands/{brand_id}/quota"))?;
        let body = self.send::<()>(Method::GET, &url, None, true).await?;
        decode(&body, &format!("quota(brand={brand_id})"))
    }

    /// Records a triage action for one post.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotFound`] if the post or prospect is gone.
    /// - [`ClientError::Http`] / [`ClientError::UnexpectedStatus`] after retries.
    pub async fn post_action(&self, request: &PostActionRequest) -> Result<(), ClientError> {
        let url = self.endpoint("posts/action")?;
        self.send(Method::POST, &url, Some(request), true).await?;
        Ok(())
    }

    /// Lists a brand's prospects with their sourced posts.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotFound`] if the brand does not exist.
    /// - [`ClientError::Http`] / [`ClientError::UnexpectedStatus`] after retries.
    /// - [`ClientError::Deserialize`] if the body does not parse.
    pub async fn list_prospects(&self, brand_id: Uuid) -> Result<Vec<Prospect>, ClientError> {
        let url = self.endpoint(&format!("brands/{brand_id}/prospects"))?;
        let body = self.send::<()>(Method::GET, &url, None, true).await?;
        decode(&body, &format!("prospects(brand={brand_id})"))
    }

    /// Creates a prospect. Sent exactly once.
    ///
    /// # Errors
    ///
    /// - [`ClientError::UnexpectedStatus`] if the backend rejects it.
    /// - [`ClientError::Http`] on network failure or timeout.
    /// - [`ClientError::Deserialize`] if the created prospect does not parse.
    pub async fn create_prospect(
        &self,
        brand_id: Uuid,
        request: &CreateProspectRequest,
    ) -> Result<Prospect, ClientError> {
        let url = self.endpoint(&format!("brands/{brand_id}/prospects"))?;
        let body = self.send(Method::POST, &url, Some(request), false).await?;
        decode(&body, &format!("create_prospect(brand={brand_id})"))
    }

    /// Removes keywords from a prospect.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotFound`] if the prospect is gone.
    /// - [`ClientError::Http`] / [`ClientError::UnexpectedStatus`] after retries.
    pub async fn delete_keywords(
        &self,
        request: &DeleteKeywordsRequest,
    ) -> Result<(), ClientError> {
        let url = self.endpoint("prospects/keywords/delete")?;
        self.send(Method::POST, &url, Some(request), true).await?;
        Ok(())
    }

    /// Deletes a prospect together with its posts and keywords.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotFound`] if the prospect is already gone.
    /// - [`ClientError::Http`] / [`ClientError::UnexpectedStatus`] after retries.
    pub async fn delete_prospect(
        &self,
        request: &DeleteProspectRequest,
    ) -> Result<(), ClientError> {
        let url = self.endpoint("prospects/delete")?;
        self.send(Method::POST, &url, Some(request), true).await?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url.join(path).map_err(|e| ClientError::InvalidBaseUrl {
            base_url: self.base_url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &Url,
        body: Option<&B>,
        idempotent: bool,
    ) -> Result<String, ClientError> {
        let max_retries = if idempotent { self.max_retries } else { 0 };
        retry_with_backoff(max_retries, self.backoff_base_ms, || {
            let method = method.clone();
            async move { self.send_once(method, url, body).await }
        })
        .await
    }

    /// Sends one request and maps non-2xx statuses to typed errors.
    async fn send_once<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &Url,
        body: Option<&B>,
    ) -> Result<String, ClientError> {
        let mut request = self.client.request(method, url.clone());
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                url: url.to_string(),
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(0);
            return Err(ClientError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
                message: error_message(&text),
            });
        }

        Ok(response.text().await?)
    }
}

fn decode<T: DeserializeOwned>(body: &str, context: &str) -> Result<T, ClientError> {
    serde_json::from_str(body).map_err(|e| ClientError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

/// Pulls `message`/`error` out of a JSON error body, falling back to the raw
/// text (truncated) for HTML or plain-text error pages.
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        return parsed.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_owned()
    } else {
        trimmed.chars().take(200).collect()
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
