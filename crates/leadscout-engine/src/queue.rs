//! Per-prospect scrape-job queue and its batch submission.
//!
//! Jobs are keyed by prospect id in insertion order. Submission is all or
//! nothing: the quota and every job's keyword budget are checked before the
//! single batch request goes out, and the queue is only cleared once the
//! backend has accepted it.

use std::time::Duration;

use indexmap::IndexMap;
use leadscout_client::ScrapeBatchRequest;
use leadscout_core::{KeywordBudgetViolation, Limits, ScrapeJob, ScrapeJobPatch};
use uuid::Uuid;

use crate::backend::{call, Backend};
use crate::error::EngineError;
use crate::quota_gate::QuotaGate;

/// Visibility of the queue drawer.
///
/// Closing the drawer keeps queued jobs; only [`ScrapeJobQueue::clear_all`]
/// or a successful submission drops them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrawerState {
    #[default]
    Closed,
    Open,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmissionProgress {
    #[default]
    Idle,
    Submitting {
        jobs: usize,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSubmissionOutcome {
    /// Nothing was queued; no request was sent.
    Empty,
    Submitted {
        jobs: usize,
        accepted: usize,
        /// Display-only estimate of posts the batch may surface.
        estimated_posts: u64,
    },
}

/// Brand-level data every batch submission needs.
#[derive(Debug, Clone)]
pub struct SubmitContext {
    pub brand_id: Uuid,
    pub brand_offerings: Vec<String>,
    pub limits: Limits,
    pub timeout: Duration,
}

#[derive(Debug, Default)]
pub struct ScrapeJobQueue {
    jobs: IndexMap<Uuid, ScrapeJob>,
    drawer: DrawerState,
    progress: SubmissionProgress,
}

impl ScrapeJobQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job for its prospect.
    ///
    /// Callers are expected to check [`Self::get_job`] first and use
    /// [`Self::update_job`] for an existing entry; a second `add_job` for the
    /// same prospect replaces the first.
    pub fn add_job(&mut self, job: ScrapeJob) {
        let prospect_id = job.prospect_id;
        if self.jobs.insert(prospect_id, job).is_some() {
            tracing::warn!(%prospect_id, "add_job replaced an existing scrape job");
        } else {
            tracing::debug!(%prospect_id, "scrape job queued");
        }
        self.drawer = DrawerState::Open;
    }

    /// Create the job with `create` if the prospect has none, then apply
    /// `update` to it. Opens the drawer.
    pub fn upsert_job<C, U>(&mut self, prospect_id: Uuid, create: C, update: U) -> &ScrapeJob
    where
        C: FnOnce() -> ScrapeJob,
        U: FnOnce(&mut ScrapeJob),
    {
        self.drawer = DrawerState::Open;
        let job = self.jobs.entry(prospect_id).or_insert_with(|| {
            tracing::debug!(%prospect_id, "scrape job created on first edit");
            create()
        });
        update(job);
        job
    }

    /// Merge `patch` into the prospect's job. Returns `false` (and changes
    /// nothing) when no job is queued for it. Leaves the drawer as it is.
    pub fn update_job(&mut self, prospect_id: Uuid, patch: ScrapeJobPatch) -> bool {
        let Some(job) = self.jobs.get_mut(&prospect_id) else {
            return false;
        };
        patch.apply_to(job);
        tracing::debug!(%prospect_id, "scrape job updated");
        true
    }

    /// Drop the prospect's job. Idempotent.
    pub fn remove_job(&mut self, prospect_id: Uuid) -> Option<ScrapeJob> {
        self.jobs.shift_remove(&prospect_id)
    }

    pub fn clear_all(&mut self) {
        self.jobs.clear();
        self.progress = SubmissionProgress::Idle;
    }

    #[must_use]
    pub fn get_job(&self, prospect_id: Uuid) -> Option<&ScrapeJob> {
        self.jobs.get(&prospect_id)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &ScrapeJob> {
        self.jobs.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    #[must_use]
    pub fn drawer(&self) -> DrawerState {
        self.drawer
    }

    pub fn open(&mut self) {
        self.drawer = DrawerState::Open;
    }

    /// Hide the drawer without discarding anything.
    pub fn close(&mut self) {
        self.drawer = DrawerState::Closed;
    }

    #[must_use]
    pub fn progress(&self) -> &SubmissionProgress {
        &self.progress
    }

    /// Sum of display estimates over all queued jobs.
    #[must_use]
    pub fn estimated_posts(&self, posts_per_keyword: u32) -> u64 {
        self.jobs
            .values()
            .map(|job| job.estimated_posts(posts_per_keyword))
            .sum()
    }

    /// Check every job's keyword budget and collect all violations.
    ///
    /// # Errors
    ///
    /// Returns every [`KeywordBudgetViolation`] found, in queue order.
    pub fn validate(&self, max_keywords: usize) -> Result<(), Vec<KeywordBudgetViolation>> {
        let violations: Vec<_> = self
            .jobs
            .values()
            .filter_map(|job| job.check_budget(max_keywords).err())
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Submit every queued job as one batch.
    ///
    /// The queue is untouched by every error path.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Quota`] / [`EngineError::QuotaUnavailable`] when the
    ///   quota gate denies or cannot verify access.
    /// - [`EngineError::Validation`] when any job is over its keyword budget.
    /// - [`EngineError::Backend`] / [`EngineError::Timeout`] when the batch
    ///   request fails.
    pub async fn submit_all<B: Backend + ?Sized>(
        &mut self,
        gate: &mut QuotaGate,
        backend: &B,
        ctx: &SubmitContext,
    ) -> Result<BatchSubmissionOutcome, EngineError> {
        if self.jobs.is_empty() {
            return Ok(BatchSubmissionOutcome::Empty);
        }

        gate.check_access(backend).await.into_result()?;

        self.validate(ctx.limits.max_keywords_per_prospect)
            .map_err(EngineError::Validation)?;

        let request = ScrapeBatchRequest {
            brand_id: ctx.brand_id,
            brand_offerings: ctx.brand_offerings.clone(),
            scrape_jobs: self.jobs.values().cloned().collect(),
        };
        let jobs = request.scrape_jobs.len();
        let estimated_posts = self.estimated_posts(ctx.limits.posts_per_keyword);
        self.progress = SubmissionProgress::Submitting { jobs };

        match call(
            "batch submission",
            ctx.timeout,
            backend.submit_scrape_batch(&request),
        )
        .await
        {
            Ok(ack) => {
                tracing::info!(
                    brand_id = %ctx.brand_id,
                    jobs,
                    accepted = ack.accepted,
                    estimated_posts,
                    "scrape batch submitted"
                );
                self.jobs.clear();
                self.progress = SubmissionProgress::Idle;
                self.drawer = DrawerState::Closed;
                Ok(BatchSubmissionOutcome::Submitted {
                    jobs,
                    accepted: ack.accepted,
                    estimated_posts,
                })
            }
            Err(err) => {
                tracing::warn!(
                    brand_id = %ctx.brand_id,
                    jobs,
                    error = %err,
                    "scrape batch submission failed, keeping queue"
                );
                self.progress = SubmissionProgress::Failed {
                    message: err.to_string(),
                };
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod tests;
