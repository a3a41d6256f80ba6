//! Query/keyword similarity.
//!
//! The score is the Jaccard overlap between the query terms and the item's keyword set, scaled by
//! a configurable weight, plus a flat bonus when a query term names the item's category. The
//! result is clamped to `[0, 1]`.

use std::collections::BTreeSet;

use crate::analysis::AnalysisResult;
use crate::config::{Config, DEFAULT_CATEGORY_BONUS, DEFAULT_KEYWORD_WEIGHT};

/// Pure, deterministic scorer configured once per orchestrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityScorer {
    category_bonus: f32,
    keyword_weight: f32,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORY_BONUS, DEFAULT_KEYWORD_WEIGHT)
    }
}

impl From<&Config> for SimilarityScorer {
    fn from(config: &Config) -> Self {
        Self::new(
            config.similarity_category_bonus,
            config.similarity_keyword_weight,
        )
    }
}

impl SimilarityScorer {
    /// Build a scorer from its weights.
    pub const fn new(category_bonus: f32, keyword_weight: f32) -> Self {
        Self {
            category_bonus,
            keyword_weight,
        }
    }

    /// Score `analysis` against `target_query`.
    pub fn score(&self, analysis: &AnalysisResult, target_query: &str) -> f32 {
        let query = query_terms(target_query);
        let keywords: BTreeSet<String> = analysis
            .keywords
            .iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .collect();

        let mut score = self.keyword_weight * jaccard(&query, &keywords);

        let category = analysis.category.trim().to_lowercase();
        if !category.is_empty() && query.contains(&category) {
            score += self.category_bonus;
        }

        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Lower-cased alphanumeric terms of `text`.
pub(crate) fn query_terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// `|a ∩ b| / |a ∪ b|`, defined as zero when both sets are empty.
fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Sentiment, SentimentLabel};

    fn analysis(keywords: &[&str], category: &str) -> AnalysisResult {
        AnalysisResult {
            sentiment: Sentiment {
                label: SentimentLabel::Neutral,
                score: 0.5,
            },
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            category: category.to_string(),
        }
    }

    #[test]
    fn jaccard_over_query_terms() {
        let scorer = SimilarityScorer::default();
        let score = scorer.score(&analysis(&["a", "b"], "general"), "a b c");
        assert!((score - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_keywords_score_zero() {
        let scorer = SimilarityScorer::default();
        assert_eq!(scorer.score(&analysis(&[], "general"), "x"), 0.0);
    }

    #[test]
    fn category_match_adds_bonus() {
        let scorer = SimilarityScorer::default();
        let plain = scorer.score(&analysis(&["a"], "memo"), "a report");
        let bonus = scorer.score(&analysis(&["a"], "Report"), "a report");
        assert!((plain - 0.5).abs() < 1e-6);
        assert!((bonus - plain - 0.1).abs() < 1e-6);
    }

    #[test]
    fn score_is_clamped_to_one() {
        let scorer = SimilarityScorer::new(0.5, 1.0);
        let score = scorer.score(&analysis(&["report"], "report"), "report");
        assert_eq!(score, 1.0);
    }

    #[test]
    fn matching_is_case_insensitive_and_ignores_punctuation() {
        let scorer = SimilarityScorer::new(0.0, 1.0);
        let score = scorer.score(&analysis(&["Invoice", "Tax"], "general"), "invoice, TAX!");
        assert_eq!(score, 1.0);
    }

    #[test]
    fn keyword_weight_scales_overlap() {
        let scorer = SimilarityScorer::new(0.0, 0.5);
        let score = scorer.score(&analysis(&["a", "b"], "general"), "a b");
        assert!((score - 0.5).abs() < f32::EPSILON);
    }
}
