//! In-memory [`Backend`] for unit tests.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadscout_client::{
    ClientError, CreateProspectRequest, DeleteKeywordsRequest, DeleteProspectRequest,
    PostActionRequest, QuotaResponse, ScrapeBatchRequest, ScrapeBatchResponse,
};
use leadscout_core::{Post, PostStatus, Prospect};
use uuid::Uuid;

use crate::backend::Backend;

pub(crate) struct FakeState {
    pub(crate) prospects: Vec<Prospect>,
    pub(crate) quota: QuotaResponse,
    pub(crate) quota_fails: bool,
    pub(crate) submit_fails: bool,
    /// Number of upcoming post actions that fail with a 503.
    pub(crate) post_action_failures: u32,
    pub(crate) post_action_not_found: bool,
    pub(crate) delay: Option<Duration>,
    pub(crate) submitted: Vec<ScrapeBatchRequest>,
    pub(crate) post_actions: Vec<PostActionRequest>,
    pub(crate) quota_checks: u32,
    pub(crate) deleted_keywords: Vec<DeleteKeywordsRequest>,
    pub(crate) deleted_prospects: Vec<Uuid>,
}

pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                prospects: Vec::new(),
                quota: quota(10, 100),
                quota_fails: false,
                submit_fails: false,
                post_action_failures: 0,
                post_action_not_found: false,
                delay: None,
                submitted: Vec::new(),
                post_actions: Vec::new(),
                quota_checks: 0,
                deleted_keywords: Vec::new(),
                deleted_prospects: Vec::new(),
            }),
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake backend mutex poisoned")
    }

    async fn pause(&self) {
        let delay = self.state().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

pub(crate) fn quota(used: u32, limit: u32) -> QuotaResponse {
    QuotaResponse {
        has_access: used < limit,
        remaining_jobs: limit.saturating_sub(used),
        used_jobs: used,
        monthly_limit: limit,
    }
}

pub(crate) fn server_error() -> ClientError {
    ClientError::UnexpectedStatus {
        status: 503,
        url: "http://backend.test".to_owned(),
        message: "unavailable".to_owned(),
    }
}

pub(crate) fn post(thing_id: &str, author: &str, created: i64) -> Post {
    Post {
        thing_id: thing_id.to_string(),
        subreddit: "freelance".to_string(),
        author: author.to_string(),
        title: format!("post {thing_id}"),
        content: String::new(),
        created_utc: DateTime::<Utc>::from_timestamp(created, 0).unwrap(),
        score: 1,
        reply_count: 0,
        permalink: format!("/r/freelance/comments/{thing_id}"),
        status: PostStatus::Pending,
        suggested_agent_reply: None,
    }
}

pub(crate) fn prospect(problem: &str, keywords: &[&str]) -> Prospect {
    let mut p = Prospect::new(Uuid::new_v4(), problem);
    p.keywords = keywords.iter().map(|k| (*k).to_string()).collect();
    p
}

#[async_trait]
impl Backend for FakeBackend {
    async fn submit_scrape_batch(
        &self,
        request: &ScrapeBatchRequest,
    ) -> Result<ScrapeBatchResponse, ClientError> {
        self.pause().await;
        let mut state = self.state();
        if state.submit_fails {
            return Err(server_error());
        }
        state.submitted.push(request.clone());
        Ok(ScrapeBatchResponse {
            accepted: request.scrape_jobs.len(),
        })
    }

    async fn check_quota(&self, _brand_id: Uuid) -> Result<QuotaResponse, ClientError> {
        self.pause().await;
        let mut state = self.state();
        state.quota_checks += 1;
        if state.quota_fails {
            return Err(server_error());
        }
        Ok(state.quota)
    }

    async fn post_action(&self, request: &PostActionRequest) -> Result<(), ClientError> {
        self.pause().await;
        let mut state = self.state();
        if state.post_action_not_found {
            return Err(ClientError::NotFound {
                url: "http://backend.test/posts/action".to_owned(),
            });
        }
        if state.post_action_failures > 0 {
            state.post_action_failures -= 1;
            return Err(server_error());
        }
        state.post_actions.push(request.clone());
        Ok(())
    }

    async fn list_prospects(&self, _brand_id: Uuid) -> Result<Vec<Prospect>, ClientError> {
        self.pause().await;
        Ok(self.state().prospects.clone())
    }

    async fn create_prospect(
        &self,
        _brand_id: Uuid,
        request: &CreateProspectRequest,
    ) -> Result<Prospect, ClientError> {
        self.pause().await;
        let mut created = Prospect::new(Uuid::new_v4(), request.problem_to_solve.clone());
        created.keywords.clone_from(&request.keywords);
        self.state().prospects.push(created.clone());
        Ok(created)
    }

    async fn delete_keywords(&self, request: &DeleteKeywordsRequest) -> Result<(), ClientError> {
        self.pause().await;
        self.state().deleted_keywords.push(request.clone());
        Ok(())
    }

    async fn delete_prospect(&self, request: &DeleteProspectRequest) -> Result<(), ClientError> {
        self.pause().await;
        let mut state = self.state();
        let before = state.prospects.len();
        state.prospects.retain(|p| p.id != request.prospect_id);
        if before == state.prospects.len() {
            return Err(ClientError::NotFound {
                url: "http://backend.test/prospects/delete".to_owned(),
            });
        }
        state.deleted_prospects.push(request.prospect_id);
        Ok(())
    }
}
