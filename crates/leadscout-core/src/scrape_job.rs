//! Per-prospect scrape job: what to search for and how much to pull.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::keywords::normalize_keyword;
use crate::limits::Limits;
use crate::prospects::Prospect;

/// A scrape configuration for one prospect, held client-side until the queue
/// is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeJob {
    pub prospect_id: Uuid,
    pub brand_name: String,
    pub problem_to_solve: String,
    /// Keywords to scrape with, ordered and unique.
    pub keywords: Vec<String>,
    /// Snapshot of the prospect's keywords when the job was opened.
    pub existing_prospect_keywords: Vec<String>,
    /// Keywords with proven engagement.
    pub set_keywords: Vec<String>,
    pub other_keywords: Vec<String>,
    pub keyword_engagement_counts: HashMap<String, u32>,
    pub num_posts: u32,
}

/// A job whose keyword total is over the per-prospect budget.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error(
    "prospect {prospect_id} ('{problem_to_solve}') would have {total} keywords \
     ({existing} existing + {new} new), max is {max}"
)]
pub struct KeywordBudgetViolation {
    pub prospect_id: Uuid,
    pub problem_to_solve: String,
    pub existing: usize,
    pub new: usize,
    pub total: usize,
    pub max: usize,
}

/// Partial update merged into an existing job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeJobPatch {
    pub keywords: Option<Vec<String>>,
    pub num_posts: Option<u32>,
    pub brand_name: Option<String>,
    pub problem_to_solve: Option<String>,
    /// Replacement snapshot, used when keywords were deleted from the
    /// prospect while the job was queued.
    pub existing_prospect_keywords: Option<Vec<String>>,
}

impl ScrapeJobPatch {
    #[must_use]
    pub fn keywords<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self {
            keywords: Some(keywords.iter().map(|k| k.as_ref().to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn apply_to(self, job: &mut ScrapeJob) {
        if let Some(keywords) = self.keywords {
            job.keywords.clear();
            for keyword in keywords {
                job.add_keyword(&keyword);
            }
        }
        if let Some(num_posts) = self.num_posts {
            job.num_posts = Limits::clamp_num_posts(num_posts);
        }
        if let Some(brand_name) = self.brand_name {
            job.brand_name = brand_name;
        }
        if let Some(problem) = self.problem_to_solve {
            job.problem_to_solve = problem;
        }
        if let Some(existing) = self.existing_prospect_keywords {
            job.existing_prospect_keywords = existing;
        }
    }
}

impl ScrapeJob {
    /// Open a job for `prospect`, preselecting its best-performing keywords.
    #[must_use]
    pub fn for_prospect(brand_name: &str, prospect: &Prospect, limits: &Limits) -> Self {
        let ranked = prospect.ranked_keywords();
        Self {
            prospect_id: prospect.id,
            brand_name: brand_name.to_string(),
            problem_to_solve: prospect.problem_to_solve.clone(),
            keywords: ranked.default_selection(limits.default_selection),
            existing_prospect_keywords: prospect.normalized_keywords(),
            set_keywords: ranked.proven,
            other_keywords: ranked.other,
            keyword_engagement_counts: prospect.normalized_engagement_counts(),
            num_posts: limits.default_num_posts,
        }
    }

    /// Append a keyword after normalizing it. Returns `false` for blanks and
    /// duplicates.
    pub fn add_keyword(&mut self, raw: &str) -> bool {
        match normalize_keyword(raw) {
            Some(keyword) if !self.keywords.contains(&keyword) => {
                self.keywords.push(keyword);
                true
            }
            _ => false,
        }
    }

    pub fn remove_keyword(&mut self, raw: &str) -> bool {
        let Some(keyword) = normalize_keyword(raw) else {
            return false;
        };
        let before = self.keywords.len();
        self.keywords.retain(|k| *k != keyword);
        before != self.keywords.len()
    }

    fn existing_keys(&self) -> HashSet<String> {
        self.existing_prospect_keywords
            .iter()
            .filter_map(|k| normalize_keyword(k))
            .collect()
    }

    /// Distinct job keywords the prospect does not already have, compared
    /// on their normalized form.
    #[must_use]
    pub fn new_unique_keywords(&self) -> Vec<&str> {
        let mut seen = self.existing_keys();
        self.keywords
            .iter()
            .filter(|k| normalize_keyword(k).is_some_and(|key| seen.insert(key)))
            .map(String::as_str)
            .collect()
    }

    /// Keyword count the prospect would have after this job runs.
    #[must_use]
    pub fn total_keywords(&self) -> usize {
        self.existing_keys().len() + self.new_unique_keywords().len()
    }

    /// # Errors
    ///
    /// Returns a [`KeywordBudgetViolation`] when [`Self::total_keywords`]
    /// exceeds `max_keywords`.
    pub fn check_budget(&self, max_keywords: usize) -> Result<(), KeywordBudgetViolation> {
        let existing = self.existing_keys().len();
        let new = self.new_unique_keywords().len();
        let total = existing + new;
        if total > max_keywords {
            return Err(KeywordBudgetViolation {
                prospect_id: self.prospect_id,
                problem_to_solve: self.problem_to_solve.clone(),
                existing,
                new,
                total,
                max: max_keywords,
            });
        }
        Ok(())
    }

    /// Rough number of posts this job could surface. For display only; the
    /// scraping service decides the real count.
    #[must_use]
    pub fn estimated_posts(&self, posts_per_keyword: u32) -> u64 {
        u64::from(posts_per_keyword) * self.keywords.len() as u64
    }
}
