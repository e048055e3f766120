//! One brand's working state: cached prospects, their triage boards, the
//! scrape-job queue and the quota gate, all behind a single [`Backend`].

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;

use indexmap::IndexMap;
use leadscout_client::{CreateProspectRequest, DeleteKeywordsRequest, DeleteProspectRequest};
use leadscout_core::{
    ensure_prospect_capacity, normalize_keyword, AppConfig, CoreError, FailurePolicy, Limits, Post,
    PostCounts, Prospect, ScrapeJob, ScrapeJobPatch, TriageAction,
};
use uuid::Uuid;

use crate::backend::{call, Backend};
use crate::error::EngineError;
use crate::notification::Notification;
use crate::queue::{BatchSubmissionOutcome, ScrapeJobQueue, SubmitContext};
use crate::quota_gate::{PaywallSignal, QuotaGate};
use crate::triage::{RetryReport, TriageBoard, TriageContext, TriageOutcome};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub brand_id: Uuid,
    pub brand_name: String,
    pub brand_offerings: Vec<String>,
    pub limits: Limits,
    /// Deadline for each backend operation, client retries included.
    pub operation_timeout: Duration,
    pub failure_policy: FailurePolicy,
}

impl SessionConfig {
    #[must_use]
    pub fn from_app_config(
        config: &AppConfig,
        brand_id: Uuid,
        brand_name: impl Into<String>,
        brand_offerings: Vec<String>,
    ) -> Self {
        Self {
            brand_id,
            brand_name: brand_name.into(),
            brand_offerings,
            limits: config.limits,
            operation_timeout: config.operation_timeout(),
            failure_policy: config.triage_failure_policy,
        }
    }
}

pub struct Session<B> {
    backend: B,
    config: SessionConfig,
    prospects: IndexMap<Uuid, Prospect>,
    boards: HashMap<Uuid, TriageBoard>,
    queue: ScrapeJobQueue,
    quota_gate: QuotaGate,
}

fn prospect_not_found(prospect_id: Uuid) -> EngineError {
    EngineError::NotFound {
        what: format!("prospect {prospect_id}"),
    }
}

/// Mirror the board into the cached prospect: statuses are copied and posts
/// the board dropped are dropped here too.
fn sync_cached_posts(board: &TriageBoard, prospect: &mut Prospect) {
    prospect.sourced_reddit_posts.retain_mut(|cached| match board.post(&cached.thing_id) {
        Some(post) => {
            cached.status = post.status;
            true
        }
        None => false,
    });
}

impl<B: Backend> Session<B> {
    #[must_use]
    pub fn new(backend: B, config: SessionConfig) -> Self {
        let quota_gate = QuotaGate::new(config.brand_id, config.operation_timeout)
            .with_fallback_monthly_limit(config.limits.monthly_scrape_limit);
        Self {
            backend,
            config,
            prospects: IndexMap::new(),
            boards: HashMap::new(),
            queue: ScrapeJobQueue::new(),
            quota_gate,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn prospects(&self) -> impl Iterator<Item = &Prospect> {
        self.prospects.values()
    }

    #[must_use]
    pub fn prospect(&self, prospect_id: Uuid) -> Option<&Prospect> {
        self.prospects.get(&prospect_id)
    }

    #[must_use]
    pub fn board(&self, prospect_id: Uuid) -> Option<&TriageBoard> {
        self.boards.get(&prospect_id)
    }

    #[must_use]
    pub fn queue(&self) -> &ScrapeJobQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut ScrapeJobQueue {
        &mut self.queue
    }

    #[must_use]
    pub fn quota_gate(&self) -> &QuotaGate {
        &self.quota_gate
    }

    #[must_use]
    pub fn post_counts(&self, prospect_id: Uuid) -> Option<PostCounts> {
        self.boards.get(&prospect_id).map(TriageBoard::counts)
    }

    #[must_use]
    pub fn pending_stack(&self, prospect_id: Uuid) -> Vec<&Post> {
        self.boards
            .get(&prospect_id)
            .map(TriageBoard::pending_stack)
            .unwrap_or_default()
    }

    fn submit_context(&self) -> SubmitContext {
        SubmitContext {
            brand_id: self.config.brand_id,
            brand_offerings: self.config.brand_offerings.clone(),
            limits: self.config.limits,
            timeout: self.config.operation_timeout,
        }
    }

    fn triage_context(&self) -> TriageContext {
        TriageContext {
            brand_id: self.config.brand_id,
            timeout: self.config.operation_timeout,
            policy: self.config.failure_policy,
        }
    }

    /// Refetch the brand's prospects and reconcile every triage board.
    ///
    /// Prospects that disappeared on the backend lose their board and any
    /// queued scrape job. Returns the number of prospects now cached.
    ///
    /// # Errors
    ///
    /// Returns the backend or timeout error; local state is left unchanged.
    pub async fn refresh(&mut self) -> Result<usize, EngineError> {
        let listed = call(
            "prospect refresh",
            self.config.operation_timeout,
            self.backend.list_prospects(self.config.brand_id),
        )
        .await?;

        let mut prospects: IndexMap<Uuid, Prospect> =
            listed.into_iter().map(|p| (p.id, p)).collect();

        for prospect in prospects.values_mut() {
            match self.boards.get_mut(&prospect.id) {
                Some(board) => {
                    board.reconcile_with(prospect.sourced_reddit_posts.clone());
                    sync_cached_posts(board, prospect);
                }
                None => {
                    self.boards
                        .insert(prospect.id, TriageBoard::from_prospect(prospect));
                }
            }
        }
        self.boards.retain(|id, _| prospects.contains_key(id));

        let orphaned: Vec<Uuid> = self
            .queue
            .jobs()
            .map(|job| job.prospect_id)
            .filter(|id| !prospects.contains_key(id))
            .collect();
        for prospect_id in orphaned {
            tracing::warn!(%prospect_id, "prospect vanished, dropping its queued scrape job");
            self.queue.remove_job(prospect_id);
        }

        self.prospects = prospects;
        tracing::debug!(
            brand_id = %self.config.brand_id,
            prospects = self.prospects.len(),
            "prospects refreshed"
        );
        Ok(self.prospects.len())
    }

    /// Create a prospect after checking the brand's prospect and keyword
    /// limits locally.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Core`] when a limit would be exceeded, and the
    /// backend or timeout error when creation fails. Creation is never
    /// retried automatically.
    pub async fn create_prospect<S: AsRef<str>>(
        &mut self,
        problem_to_solve: &str,
        keywords: &[S],
    ) -> Result<&Prospect, EngineError> {
        let limits = self.config.limits;
        ensure_prospect_capacity(self.prospects.len(), limits.max_prospects_per_brand)?;

        let mut draft = Prospect::new(Uuid::nil(), problem_to_solve.trim());
        draft.add_keywords(keywords, limits.max_keywords_per_prospect)?;

        let request = CreateProspectRequest {
            problem_to_solve: draft.problem_to_solve,
            keywords: draft.keywords,
        };
        let created = call(
            "prospect creation",
            self.config.operation_timeout,
            self.backend.create_prospect(self.config.brand_id, &request),
        )
        .await?;

        tracing::info!(
            brand_id = %self.config.brand_id,
            prospect_id = %created.id,
            keywords = created.keywords.len(),
            "prospect created"
        );
        self.boards
            .insert(created.id, TriageBoard::from_prospect(&created));
        let (index, _) = self.prospects.insert_full(created.id, created);
        Ok(&self.prospects[index])
    }

    /// Open (or return) the prospect's scrape job with its best keywords
    /// preselected.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown prospect.
    pub fn open_keyword_job(&mut self, prospect_id: Uuid) -> Result<&ScrapeJob, EngineError> {
        let prospect = self
            .prospects
            .get(&prospect_id)
            .ok_or_else(|| prospect_not_found(prospect_id))?;
        let brand_name = &self.config.brand_name;
        let limits = &self.config.limits;
        Ok(self.queue.upsert_job(
            prospect_id,
            || ScrapeJob::for_prospect(brand_name, prospect, limits),
            |_| {},
        ))
    }

    /// Add a keyword to the prospect's scrape job, opening the job first if
    /// needed. Returns `false` when the job already has the keyword.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown prospect and
    /// [`CoreError::EmptyKeyword`] for a blank keyword.
    pub fn add_keyword(&mut self, prospect_id: Uuid, keyword: &str) -> Result<bool, EngineError> {
        let keyword = normalize_keyword(keyword).ok_or(CoreError::EmptyKeyword)?;
        let prospect = self
            .prospects
            .get(&prospect_id)
            .ok_or_else(|| prospect_not_found(prospect_id))?;
        let brand_name = &self.config.brand_name;
        let limits = &self.config.limits;
        let mut added = false;
        self.queue.upsert_job(
            prospect_id,
            || ScrapeJob::for_prospect(brand_name, prospect, limits),
            |job| added = job.add_keyword(&keyword),
        );
        Ok(added)
    }

    /// Delete keywords from a prospect on the backend, then locally.
    ///
    /// A queued job for the prospect loses the keywords too. Returns how many
    /// keywords the cached prospect lost.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown prospect and the
    /// backend or timeout error when the deletion fails.
    pub async fn delete_keywords<S: AsRef<str>>(
        &mut self,
        prospect_id: Uuid,
        keywords: &[S],
    ) -> Result<usize, EngineError> {
        if !self.prospects.contains_key(&prospect_id) {
            return Err(prospect_not_found(prospect_id));
        }
        let doomed: Vec<String> = keywords
            .iter()
            .filter_map(|k| normalize_keyword(k.as_ref()))
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        let request = DeleteKeywordsRequest {
            brand_id: self.config.brand_id,
            prospect_id,
            keywords: doomed.clone(),
        };
        call(
            "keyword deletion",
            self.config.operation_timeout,
            self.backend.delete_keywords(&request),
        )
        .await?;

        let removed = self
            .prospects
            .get_mut(&prospect_id)
            .map_or(0, |p| p.remove_keywords(&doomed));

        if let Some(job) = self.queue.get_job(prospect_id) {
            let doomed: HashSet<&str> = doomed.iter().map(String::as_str).collect();
            let keep = |list: &[String]| -> Vec<String> {
                list.iter()
                    .filter(|k| {
                        normalize_keyword(k).is_some_and(|k| !doomed.contains(k.as_str()))
                    })
                    .cloned()
                    .collect()
            };
            let patch = ScrapeJobPatch {
                keywords: Some(keep(&job.keywords)),
                existing_prospect_keywords: Some(keep(&job.existing_prospect_keywords)),
                ..ScrapeJobPatch::default()
            };
            self.queue.update_job(prospect_id, patch);
        }

        tracing::info!(%prospect_id, removed, "keywords deleted");
        Ok(removed)
    }

    /// Delete a prospect on the backend, then drop its cache entry, triage
    /// board and queued job. A prospect already gone on the backend is
    /// still removed locally.
    ///
    /// # Errors
    ///
    /// Returns the backend or timeout error; local state is left unchanged.
    pub async fn delete_prospect(&mut self, prospect_id: Uuid) -> Result<(), EngineError> {
        let request = DeleteProspectRequest {
            brand_id: self.config.brand_id,
            prospect_id,
        };
        match call(
            "prospect deletion",
            self.config.operation_timeout,
            self.backend.delete_prospect(&request),
        )
        .await
        {
            Ok(()) => {}
            Err(EngineError::NotFound { .. }) => {
                tracing::warn!(%prospect_id, "prospect already deleted on the backend");
            }
            Err(err) => return Err(err),
        }

        self.prospects.shift_remove(&prospect_id);
        self.boards.remove(&prospect_id);
        self.queue.remove_job(prospect_id);
        tracing::info!(%prospect_id, "prospect deleted");
        Ok(())
    }

    /// Submit the queue as one batch and refresh prospects on success.
    ///
    /// A failed refresh after an accepted batch is logged, not returned.
    ///
    /// # Errors
    ///
    /// See [`ScrapeJobQueue::submit_all`].
    pub async fn submit_queue(&mut self) -> Result<BatchSubmissionOutcome, EngineError> {
        let ctx = self.submit_context();
        let outcome = self
            .queue
            .submit_all(&mut self.quota_gate, &self.backend, &ctx)
            .await?;
        if matches!(outcome, BatchSubmissionOutcome::Submitted { .. }) {
            if let Err(err) = self.refresh().await {
                tracing::warn!(error = %err, "refresh after batch submission failed");
            }
        }
        Ok(outcome)
    }

    /// Submit the queue; on a quota denial hand the paywall signal to
    /// `upgrade` and, if it reports an upgrade, submit exactly once more.
    ///
    /// # Errors
    ///
    /// Returns the first error when it is not a quota denial or the upgrade
    /// did not happen, otherwise the second attempt's error.
    pub async fn submit_queue_with_upgrade<F, Fut>(
        &mut self,
        upgrade: F,
    ) -> Result<BatchSubmissionOutcome, EngineError>
    where
        F: FnOnce(PaywallSignal) -> Fut,
        Fut: Future<Output = bool>,
    {
        let err = match self.submit_queue().await {
            Ok(outcome) => return Ok(outcome),
            Err(err) => err,
        };
        let Some(signal) = PaywallSignal::from_error(&err) else {
            return Err(err);
        };
        if !upgrade(signal).await {
            return Err(err);
        }
        tracing::info!(brand_id = %self.config.brand_id, "plan upgraded, resubmitting queue");
        self.submit_queue().await
    }

    /// Triage one post of a prospect.
    ///
    /// The board is authoritative; the cached prospect's posts are updated
    /// to match it whether or not the backend call succeeded.
    ///
    /// # Errors
    ///
    /// See [`TriageBoard::act`]; also [`EngineError::NotFound`] for an
    /// unknown prospect.
    pub async fn triage(
        &mut self,
        prospect_id: Uuid,
        thing_id: &str,
        action: TriageAction,
    ) -> Result<TriageOutcome, EngineError> {
        let ctx = self.triage_context();
        let board = self
            .boards
            .get_mut(&prospect_id)
            .ok_or_else(|| prospect_not_found(prospect_id))?;
        let result = board.act(thing_id, action, &self.backend, &ctx).await;
        if let Some(prospect) = self.prospects.get_mut(&prospect_id) {
            sync_cached_posts(board, prospect);
        }
        result
    }

    /// Re-send unconfirmed post actions on every board.
    pub async fn retry_unconfirmed(&mut self) -> RetryReport {
        let ctx = self.triage_context();
        let mut total = RetryReport::default();
        for (prospect_id, board) in &mut self.boards {
            let report = board.retry_unconfirmed(&self.backend, &ctx).await;
            if let Some(prospect) = self.prospects.get_mut(prospect_id) {
                sync_cached_posts(board, prospect);
            }
            total.confirmed += report.confirmed;
            total.still_unconfirmed += report.still_unconfirmed;
            total.dropped += report.dropped;
        }
        total
    }

    /// Turn a failure into a message for the user.
    #[must_use]
    pub fn notify(&self, err: &EngineError) -> Notification {
        let notification = Notification::from_error(err);
        tracing::debug!(
            level = ?notification.level,
            action = ?notification.action,
            error = %err,
            "user notified"
        );
        notification
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
