use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keywords::{normalize_keyword, rank_keywords, RankedKeywords};
use crate::posts::{Post, PostCounts};
use crate::CoreError;

/// A problem statement the user wants to validate against Reddit demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prospect {
    pub id: Uuid,
    pub problem_to_solve: String,
    /// Insertion-ordered, unique.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub keywords_to_engaged_count: HashMap<String, u32>,
    #[serde(default)]
    pub sourced_reddit_posts: Vec<Post>,
    #[serde(default)]
    pub last_refresh_time: Option<DateTime<Utc>>,
}

impl Prospect {
    #[must_use]
    pub fn new(id: Uuid, problem_to_solve: impl Into<String>) -> Self {
        Self {
            id,
            problem_to_solve: problem_to_solve.into(),
            keywords: Vec::new(),
            keywords_to_engaged_count: HashMap::new(),
            sourced_reddit_posts: Vec::new(),
            last_refresh_time: None,
        }
    }

    /// Append keywords after normalizing them, skipping ones already present.
    ///
    /// Nothing is added when the result would exceed `max_keywords`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::KeywordLimit`] when the prospect would hold more
    /// than `max_keywords` keywords.
    pub fn add_keywords<S: AsRef<str>>(
        &mut self,
        raw: &[S],
        max_keywords: usize,
    ) -> Result<usize, CoreError> {
        let existing = self.normalized_keywords();
        let mut seen: HashSet<String> = existing.iter().cloned().collect();
        let fresh: Vec<String> = raw
            .iter()
            .filter_map(|k| normalize_keyword(k.as_ref()))
            .filter(|k| seen.insert(k.clone()))
            .collect();

        let total = existing.len() + fresh.len();
        if total > max_keywords {
            return Err(CoreError::KeywordLimit {
                prospect_id: self.id,
                total,
                max: max_keywords,
            });
        }

        let added = fresh.len();
        self.keywords.extend(fresh);
        Ok(added)
    }

    /// Remove keywords and their engagement history. Returns how many were
    /// actually removed; unknown keywords are ignored.
    pub fn remove_keywords<S: AsRef<str>>(&mut self, raw: &[S]) -> usize {
        let doomed: HashSet<String> = raw
            .iter()
            .filter_map(|k| normalize_keyword(k.as_ref()))
            .collect();
        let is_doomed = |k: &str| normalize_keyword(k).is_some_and(|k| doomed.contains(&k));
        let before = self.keywords.len();
        self.keywords.retain(|k| !is_doomed(k));
        self.keywords_to_engaged_count.retain(|k, _| !is_doomed(k));
        before - self.keywords.len()
    }

    /// Keywords in their canonical form, deduplicated, in insertion order.
    ///
    /// The backend may hand back keywords in any casing; everything that
    /// compares keywords goes through this.
    #[must_use]
    pub fn normalized_keywords(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.keywords
            .iter()
            .filter_map(|k| normalize_keyword(k))
            .filter(|k| seen.insert(k.clone()))
            .collect()
    }

    /// Engagement counts keyed by canonical keyword. Counts for keys that
    /// normalize to the same keyword are summed.
    #[must_use]
    pub fn normalized_engagement_counts(&self) -> HashMap<String, u32> {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for (keyword, count) in &self.keywords_to_engaged_count {
            if let Some(keyword) = normalize_keyword(keyword) {
                let total = counts.entry(keyword).or_default();
                *total = total.saturating_add(*count);
            }
        }
        counts
    }

    #[must_use]
    pub fn ranked_keywords(&self) -> RankedKeywords {
        rank_keywords(
            &self.normalized_keywords(),
            &self.normalized_engagement_counts(),
        )
    }

    #[must_use]
    pub fn post_counts(&self) -> PostCounts {
        PostCounts::from_posts(&self.sourced_reddit_posts)
    }

    #[must_use]
    pub fn find_post(&self, thing_id: &str) -> Option<&Post> {
        self.sourced_reddit_posts
            .iter()
            .find(|p| p.thing_id == thing_id)
    }
}

/// Check that a brand can take one more prospect.
///
/// # Errors
///
/// Returns [`CoreError::ProspectLimit`] when `existing` already meets `max`.
pub fn ensure_prospect_capacity(existing: usize, max: usize) -> Result<(), CoreError> {
    if existing >= max {
        return Err(CoreError::ProspectLimit { existing, max });
    }
    Ok(())
}
