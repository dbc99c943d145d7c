//! Keyword relevance scoring.

use aiscout_shared::RelevanceConfig;

/// Weight of a keyword found in the title.
const TITLE_WEIGHT: u32 = 2;
/// Weight of a keyword found in the description.
const DESCRIPTION_WEIGHT: u32 = 1;

/// Scores listings against a fixed domain vocabulary.
///
/// Matching is case-insensitive substring search, so `AI` also hits
/// `OpenAI`. Each keyword counts at most once per field.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    keywords: Vec<String>,
}

impl RelevanceScorer {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        keywords.sort();
        keywords.dedup();
        Self { keywords }
    }

    pub fn from_config(config: &RelevanceConfig) -> Self {
        Self::new(&config.keywords)
    }

    /// Number of distinct keywords in the corpus.
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// `2 × title hits + 1 × description hits`, distinct keywords only.
    pub fn score(&self, title: &str, description: &str) -> u32 {
        TITLE_WEIGHT * self.distinct_hits(title) + DESCRIPTION_WEIGHT * self.distinct_hits(description)
    }

    pub fn is_related(&self, title: &str, description: &str) -> bool {
        self.score(title, description) > 0
    }

    fn distinct_hits(&self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }
        let haystack = text.to_lowercase();
        let hits = self
            .keywords
            .iter()
            .filter(|k| haystack.contains(k.as_str()))
            .count();
        u32::try_from(hits).unwrap_or(u32::MAX)
    }
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::from_config(&RelevanceConfig::default())
    }
}
