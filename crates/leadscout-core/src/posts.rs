//! Sourced Reddit posts and their triage status.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Triage status of a sourced post.
///
/// The backend still emits `REPLY` and `SUGGESTED_REPLY` for engaged posts;
/// both collapse into [`PostStatus::Actioned`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    #[default]
    Pending,
    #[serde(alias = "REPLY", alias = "SUGGESTED_REPLY")]
    Actioned,
    Ignore,
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostStatus::Pending => write!(f, "PENDING"),
            PostStatus::Actioned => write!(f, "ACTIONED"),
            PostStatus::Ignore => write!(f, "IGNORE"),
        }
    }
}

/// A user decision on a pending post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageAction {
    /// Swipe right, "add to engage", or a submitted reply.
    Queue,
    /// Swipe left.
    Ignore,
}

impl TriageAction {
    /// Status a pending post ends up in after this action.
    #[must_use]
    pub fn target_status(self) -> PostStatus {
        match self {
            TriageAction::Queue => PostStatus::Actioned,
            TriageAction::Ignore => PostStatus::Ignore,
        }
    }
}

impl std::fmt::Display for TriageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriageAction::Queue => write!(f, "queue"),
            TriageAction::Ignore => write!(f, "ignore"),
        }
    }
}

impl PostStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, PostStatus::Pending)
    }

    /// Next status for `action`, or `None` when the post is already terminal.
    #[must_use]
    pub fn transition(self, action: TriageAction) -> Option<PostStatus> {
        match self {
            PostStatus::Pending => Some(action.target_status()),
            PostStatus::Actioned | PostStatus::Ignore => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub thing_id: String,
    pub subreddit: String,
    pub author: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_utc: DateTime<Utc>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub reply_count: u32,
    pub permalink: String,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_agent_reply: Option<String>,
}

impl Post {
    #[must_use]
    pub fn url(&self) -> String {
        format!("https://reddit.com{}", self.permalink)
    }
}

/// A post as the ingestion service reports it, before it becomes reviewable.
///
/// Listing payloads leave most fields optional and use Reddit's own names
/// (`ups`, `num_comments`, `selftext`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestedPost {
    pub thing_id: String,
    pub subreddit: Option<String>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub selftext: Option<String>,
    pub created_utc: Option<i64>,
    pub ups: Option<i64>,
    pub num_comments: Option<u32>,
    pub permalink: Option<String>,
    pub status: Option<PostStatus>,
    pub suggested_agent_reply: Option<String>,
}

/// Anything the review stack can show.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewableItem {
    Post(Post),
    /// A post the reply agent has already drafted a response for.
    SuggestedReply { post: Post, reply: String },
}

impl ReviewableItem {
    /// Convert an ingestion record into a reviewable item.
    ///
    /// Returns `None` when the record has no title or permalink, which is how
    /// Reddit marks removed submissions.
    #[must_use]
    pub fn from_ingested(raw: IngestedPost) -> Option<Self> {
        let title = raw
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())?
            .to_string();
        let permalink = raw.permalink.filter(|p| !p.is_empty())?;
        let content = match raw.selftext.as_deref() {
            Some(body) if body != "[deleted]" && body != "[removed]" => body.to_string(),
            _ => String::new(),
        };
        let created_utc = raw
            .created_utc
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or_default();

        let reply = raw.suggested_agent_reply.filter(|r| !r.trim().is_empty());
        let post = Post {
            thing_id: raw.thing_id,
            subreddit: raw.subreddit.unwrap_or_default(),
            author: raw.author.unwrap_or_else(|| "[deleted]".to_string()),
            title,
            content,
            created_utc,
            score: raw.ups.unwrap_or(0),
            reply_count: raw.num_comments.unwrap_or(0),
            permalink,
            status: raw.status.unwrap_or_default(),
            suggested_agent_reply: reply.clone(),
        };

        Some(match reply {
            Some(reply) => ReviewableItem::SuggestedReply { post, reply },
            None => ReviewableItem::Post(post),
        })
    }

    #[must_use]
    pub fn post(&self) -> &Post {
        match self {
            ReviewableItem::Post(post) | ReviewableItem::SuggestedReply { post, .. } => post,
        }
    }

    #[must_use]
    pub fn into_post(self) -> Post {
        match self {
            ReviewableItem::Post(post) | ReviewableItem::SuggestedReply { post, .. } => post,
        }
    }
}

/// Status partition of a prospect's posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostCounts {
    pub pending: usize,
    pub actioned: usize,
    pub ignored: usize,
    pub total: usize,
    /// Distinct authors among pending posts ("potential customers").
    pub unique_pending_authors: usize,
    pub unique_actioned_authors: usize,
}

impl PostCounts {
    /// Count statuses and distinct authors in one pass.
    pub fn tally<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = (PostStatus, &'a str)>,
    {
        let mut counts = Self::default();
        let mut pending_authors = HashSet::new();
        let mut actioned_authors = HashSet::new();
        for (status, author) in statuses {
            counts.total += 1;
            match status {
                PostStatus::Pending => {
                    counts.pending += 1;
                    pending_authors.insert(author);
                }
                PostStatus::Actioned => {
                    counts.actioned += 1;
                    actioned_authors.insert(author);
                }
                PostStatus::Ignore => counts.ignored += 1,
            }
        }
        counts.unique_pending_authors = pending_authors.len();
        counts.unique_actioned_authors = actioned_authors.len();
        counts
    }

    #[must_use]
    pub fn from_posts(posts: &[Post]) -> Self {
        Self::tally(posts.iter().map(|p| (p.status, p.author.as_str())))
    }

    /// `pending + actioned + ignored == total`.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pending + self.actioned + self.ignored == self.total
    }
}
