//! Optimistic post triage for one prospect.
//!
//! A swipe changes the post's status locally first, then the action is sent
//! to the backend. When the backend call fails the configured
//! [`FailurePolicy`] decides whether the local change is rolled back or kept
//! and queued for [`TriageBoard::retry_unconfirmed`].

use std::collections::HashMap;
use std::time::Duration;

use futures::future::join_all;
use indexmap::IndexMap;
use leadscout_client::PostActionRequest;
use leadscout_core::{
    FailurePolicy, IngestedPost, Post, PostCounts, PostStatus, Prospect, ReviewableItem,
    TriageAction,
};
use uuid::Uuid;

use crate::backend::{call, Backend};
use crate::error::EngineError;

/// Whether the backend has acknowledged a post's current status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Confirmation {
    #[default]
    Confirmed,
    InFlight,
    Unconfirmed { attempts: u32, last_error: String },
}

impl Confirmation {
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Confirmation::Confirmed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageOutcome {
    Applied { from: PostStatus, to: PostStatus },
    /// The post already has the status this action leads to.
    AlreadyApplied,
    /// The post was already triaged the other way.
    Rejected { current: PostStatus },
}

#[derive(Debug, Clone)]
pub struct TriageContext {
    pub brand_id: Uuid,
    pub timeout: Duration,
    pub policy: FailurePolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub confirmed: usize,
    pub still_unconfirmed: usize,
    /// Posts the backend no longer knows; removed locally.
    pub dropped: usize,
}

#[derive(Debug, Clone)]
pub struct TriageBoard {
    prospect_id: Uuid,
    posts: IndexMap<String, Post>,
    confirmations: HashMap<String, Confirmation>,
}

fn action_for(status: PostStatus) -> Option<TriageAction> {
    match status {
        PostStatus::Pending => None,
        PostStatus::Actioned => Some(TriageAction::Queue),
        PostStatus::Ignore => Some(TriageAction::Ignore),
    }
}

fn not_found(thing_id: &str) -> EngineError {
    EngineError::NotFound {
        what: format!("post {thing_id}"),
    }
}

impl TriageBoard {
    #[must_use]
    pub fn new(prospect_id: Uuid, posts: Vec<Post>) -> Self {
        Self {
            prospect_id,
            posts: posts
                .into_iter()
                .map(|post| (post.thing_id.clone(), post))
                .collect(),
            confirmations: HashMap::new(),
        }
    }

    #[must_use]
    pub fn from_prospect(prospect: &Prospect) -> Self {
        Self::new(prospect.id, prospect.sourced_reddit_posts.clone())
    }

    #[must_use]
    pub fn prospect_id(&self) -> Uuid {
        self.prospect_id
    }

    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        self.posts.values()
    }

    #[must_use]
    pub fn post(&self, thing_id: &str) -> Option<&Post> {
        self.posts.get(thing_id)
    }

    #[must_use]
    pub fn confirmation(&self, thing_id: &str) -> Option<Confirmation> {
        if !self.posts.contains_key(thing_id) {
            return None;
        }
        Some(self.confirmations.get(thing_id).cloned().unwrap_or_default())
    }

    #[must_use]
    pub fn unconfirmed_count(&self) -> usize {
        self.confirmations
            .values()
            .filter(|c| matches!(c, Confirmation::Unconfirmed { .. }))
            .count()
    }

    /// Add freshly ingested posts the board does not have yet.
    ///
    /// Records without a title or permalink are skipped. Returns how many
    /// posts were added.
    pub fn ingest<I>(&mut self, raw: I) -> usize
    where
        I: IntoIterator<Item = IngestedPost>,
    {
        let mut added = 0;
        for item in raw.into_iter().filter_map(ReviewableItem::from_ingested) {
            let post = item.into_post();
            if self.posts.contains_key(&post.thing_id) {
                continue;
            }
            self.posts.insert(post.thing_id.clone(), post);
            added += 1;
        }
        added
    }

    /// Change a post's status locally.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] when the board has no such post.
    pub fn apply_local(
        &mut self,
        thing_id: &str,
        action: TriageAction,
    ) -> Result<TriageOutcome, EngineError> {
        let post = self
            .posts
            .get_mut(thing_id)
            .ok_or_else(|| not_found(thing_id))?;
        let from = post.status;
        match from.transition(action) {
            Some(to) => {
                post.status = to;
                Ok(TriageOutcome::Applied { from, to })
            }
            None if from == action.target_status() => Ok(TriageOutcome::AlreadyApplied),
            None => Ok(TriageOutcome::Rejected { current: from }),
        }
    }

    /// Apply `action` optimistically and tell the backend.
    ///
    /// Repeating an action already applied sends nothing. If the backend no
    /// longer has the post it is dropped from the board.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown or deleted post, and
    /// the backend or timeout error when the call fails. On failure the
    /// local status is rolled back under [`FailurePolicy::Rollback`] and kept
    /// as unconfirmed under [`FailurePolicy::MarkUnconfirmed`].
    pub async fn act<B: Backend + ?Sized>(
        &mut self,
        thing_id: &str,
        action: TriageAction,
        backend: &B,
        ctx: &TriageContext,
    ) -> Result<TriageOutcome, EngineError> {
        let outcome = self.apply_local(thing_id, action)?;
        let TriageOutcome::Applied { from, .. } = outcome else {
            return Ok(outcome);
        };
        let Some(post) = self.posts.get(thing_id) else {
            return Err(not_found(thing_id));
        };

        let request = PostActionRequest {
            post: post.clone(),
            action,
            brand_id: ctx.brand_id,
            prospect_id: self.prospect_id,
        };
        self.confirmations
            .insert(thing_id.to_string(), Confirmation::InFlight);

        match call("post action", ctx.timeout, backend.post_action(&request)).await {
            Ok(()) => {
                self.confirmations
                    .insert(thing_id.to_string(), Confirmation::Confirmed);
                tracing::debug!(
                    prospect_id = %self.prospect_id,
                    thing_id,
                    %action,
                    "post action confirmed"
                );
                Ok(outcome)
            }
            Err(err @ EngineError::NotFound { .. }) => {
                tracing::warn!(
                    prospect_id = %self.prospect_id,
                    thing_id,
                    "post no longer exists on the backend, dropping it"
                );
                self.posts.shift_remove(thing_id);
                self.confirmations.remove(thing_id);
                Err(err)
            }
            Err(err) => {
                match ctx.policy {
                    FailurePolicy::Rollback => {
                        if let Some(post) = self.posts.get_mut(thing_id) {
                            post.status = from;
                        }
                        self.confirmations.remove(thing_id);
                        tracing::warn!(
                            prospect_id = %self.prospect_id,
                            thing_id,
                            %action,
                            error = %err,
                            "post action failed, rolled back"
                        );
                    }
                    FailurePolicy::MarkUnconfirmed => {
                        self.confirmations.insert(
                            thing_id.to_string(),
                            Confirmation::Unconfirmed {
                                attempts: 1,
                                last_error: err.to_string(),
                            },
                        );
                        tracing::warn!(
                            prospect_id = %self.prospect_id,
                            thing_id,
                            %action,
                            error = %err,
                            "post action failed, kept as unconfirmed"
                        );
                    }
                }
                Err(err)
            }
        }
    }

    /// Re-send every unconfirmed post action concurrently.
    pub async fn retry_unconfirmed<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        ctx: &TriageContext,
    ) -> RetryReport {
        let mut pending = Vec::new();
        for (thing_id, confirmation) in &self.confirmations {
            let Confirmation::Unconfirmed { attempts, .. } = confirmation else {
                continue;
            };
            let Some(post) = self.posts.get(thing_id) else {
                continue;
            };
            let Some(action) = action_for(post.status) else {
                continue;
            };
            pending.push((
                thing_id.clone(),
                *attempts,
                PostActionRequest {
                    post: post.clone(),
                    action,
                    brand_id: ctx.brand_id,
                    prospect_id: self.prospect_id,
                },
            ));
        }
        for (thing_id, _, _) in &pending {
            self.confirmations
                .insert(thing_id.clone(), Confirmation::InFlight);
        }

        let results = join_all(pending.iter().map(|(_, _, request)| {
            call("post action", ctx.timeout, backend.post_action(request))
        }))
        .await;

        let mut report = RetryReport::default();
        for ((thing_id, attempts, _), result) in pending.into_iter().zip(results) {
            match result {
                Ok(()) => {
                    self.confirmations.insert(thing_id, Confirmation::Confirmed);
                    report.confirmed += 1;
                }
                Err(EngineError::NotFound { .. }) => {
                    self.posts.shift_remove(&thing_id);
                    self.confirmations.remove(&thing_id);
                    report.dropped += 1;
                }
                Err(err) => {
                    self.confirmations.insert(
                        thing_id,
                        Confirmation::Unconfirmed {
                            attempts: attempts + 1,
                            last_error: err.to_string(),
                        },
                    );
                    report.still_unconfirmed += 1;
                }
            }
        }

        if report != RetryReport::default() {
            tracing::info!(
                prospect_id = %self.prospect_id,
                confirmed = report.confirmed,
                still_unconfirmed = report.still_unconfirmed,
                dropped = report.dropped,
                "retried unconfirmed post actions"
            );
        }
        report
    }

    #[must_use]
    pub fn counts(&self) -> PostCounts {
        PostCounts::tally(self.posts.values().map(|p| (p.status, p.author.as_str())))
    }

    /// Pending posts, newest first.
    #[must_use]
    pub fn pending_stack(&self) -> Vec<&Post> {
        let mut stack: Vec<&Post> = self
            .posts
            .values()
            .filter(|p| p.status == PostStatus::Pending)
            .collect();
        stack.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        stack
    }

    /// Replace the board's posts with a fresh server listing.
    ///
    /// Local statuses the backend has not acknowledged yet win over the
    /// server's, so a refresh never undoes an unconfirmed swipe.
    pub fn reconcile_with(&mut self, server_posts: Vec<Post>) {
        let mut posts: IndexMap<String, Post> = server_posts
            .into_iter()
            .map(|post| (post.thing_id.clone(), post))
            .collect();

        let mut confirmations = HashMap::new();
        for (thing_id, confirmation) in self.confirmations.drain() {
            if confirmation.is_confirmed() {
                continue;
            }
            let (Some(server), Some(local)) =
                (posts.get_mut(&thing_id), self.posts.get(&thing_id))
            else {
                continue;
            };
            if server.status == local.status {
                continue;
            }
            server.status = local.status;
            confirmations.insert(thing_id, confirmation);
        }

        self.posts = posts;
        self.confirmations = confirmations;
    }
}

#[cfg(test)]
#[path = "triage_test.rs"]
mod tests;
