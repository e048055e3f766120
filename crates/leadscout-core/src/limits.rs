//! Subscription and keyword budgets shared by the queue, the quota gate and
//! prospect management.

pub const MAX_KEYWORDS_PER_PROSPECT: usize = 30;
/// Display-only estimate of how many posts one keyword yields.
pub const POSTS_PER_KEYWORD: u32 = 100;
pub const MONTHLY_SCRAPE_LIMIT: u32 = 100;
pub const MAX_PROSPECTS_PER_BRAND: usize = 3;
pub const DEFAULT_NUM_POSTS: u32 = 50;
pub const MAX_NUM_POSTS: u32 = 100;
/// How many keywords a freshly opened scrape job preselects.
pub const DEFAULT_SELECTION: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_keywords_per_prospect: usize,
    pub posts_per_keyword: u32,
    pub monthly_scrape_limit: u32,
    pub max_prospects_per_brand: usize,
    pub default_num_posts: u32,
    pub default_selection: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_keywords_per_prospect: MAX_KEYWORDS_PER_PROSPECT,
            posts_per_keyword: POSTS_PER_KEYWORD,
            monthly_scrape_limit: MONTHLY_SCRAPE_LIMIT,
            max_prospects_per_brand: MAX_PROSPECTS_PER_BRAND,
            default_num_posts: DEFAULT_NUM_POSTS,
            default_selection: DEFAULT_SELECTION,
        }
    }
}

impl Limits {
    /// Clamp a requested post count into `1..=MAX_NUM_POSTS`.
    #[must_use]
    pub fn clamp_num_posts(requested: u32) -> u32 {
        requested.clamp(1, MAX_NUM_POSTS)
    }
}
