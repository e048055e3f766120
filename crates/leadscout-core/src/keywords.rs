//! Keyword normalization and engagement-weighted ranking.

use std::collections::HashMap;

/// Keywords split by whether they have ever produced an engaged lead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedKeywords {
    /// Keywords with engagement > 0, highest count first.
    pub proven: Vec<String>,
    /// Keywords with no recorded engagement, in their original order.
    pub other: Vec<String>,
}

impl RankedKeywords {
    /// Keywords a new scrape job should start with: the top `n` proven
    /// keywords, topped up from `other` when fewer than `n` are proven.
    #[must_use]
    pub fn default_selection(&self, n: usize) -> Vec<String> {
        self.proven
            .iter()
            .chain(self.other.iter())
            .take(n)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.proven.len() + self.other.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proven.is_empty() && self.other.is_empty()
    }
}

/// Rank `keywords` by their engagement count.
///
/// The sort is stable, so keywords with equal counts keep their insertion
/// order. Keywords missing from `engagement_counts` count as zero.
#[must_use]
pub fn rank_keywords<S: AsRef<str>>(
    keywords: &[S],
    engagement_counts: &HashMap<String, u32>,
) -> RankedKeywords {
    let count_of = |k: &str| engagement_counts.get(k).copied().unwrap_or(0);

    let mut proven: Vec<(&str, u32)> = Vec::new();
    let mut other = Vec::new();
    for keyword in keywords {
        let keyword = keyword.as_ref();
        match count_of(keyword) {
            0 => other.push(keyword.to_string()),
            n => proven.push((keyword, n)),
        }
    }
    proven.sort_by(|a, b| b.1.cmp(&a.1));

    RankedKeywords {
        proven: proven.into_iter().map(|(k, _)| k.to_string()).collect(),
        other,
    }
}

/// Canonical form used for keyword uniqueness: trimmed, lowercased, inner
/// whitespace collapsed. Returns `None` for blank input.
#[must_use]
pub fn normalize_keyword(raw: &str) -> Option<String> {
    let normalized = raw
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    (!normalized.is_empty()).then_some(normalized)
}
