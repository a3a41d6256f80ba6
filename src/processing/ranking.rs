//! Deterministic ordering of pipeline outcomes.

use super::types::{RankedItem, ScoredItem};

/// Order a complete set of pipeline outcomes.
///
/// Scored items come first, by score descending and then by submission index, and receive
/// positions `1..=K`. Failed items follow in submission order without a position. The result
/// depends only on the items, never on the order they arrive in.
pub fn rank(items: Vec<ScoredItem>) -> Vec<RankedItem> {
    let (mut scored, mut failed): (Vec<_>, Vec<_>) =
        items.into_iter().partition(ScoredItem::is_scored);

    scored.sort_by(|a, b| {
        let a_score = a.similarity_score.unwrap_or_default();
        let b_score = b.similarity_score.unwrap_or_default();
        b_score
            .total_cmp(&a_score)
            .then_with(|| a.original_index.cmp(&b.original_index))
    });
    failed.sort_by_key(|item| item.original_index);

    let ranked = scored
        .into_iter()
        .enumerate()
        .map(|(idx, item)| RankedItem {
            item,
            ranking_position: Some(idx + 1),
        });
    let unranked = failed.into_iter().map(|item| RankedItem {
        item,
        ranking_position: None,
    });

    ranked.chain(unranked).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::types::ItemFailure;

    fn scored(index: usize, score: f32) -> ScoredItem {
        ScoredItem {
            item_id: format!("item-{index}"),
            original_index: index,
            filename: format!("doc-{index}.txt"),
            content_sha256: String::new(),
            extracted_text: Some("text".into()),
            analysis: None,
            similarity_score: Some(score),
            error: None,
            elapsed_ms: 1,
            summary: None,
            relevant_excerpts: Vec::new(),
            justification: None,
        }
    }

    fn failed(index: usize) -> ScoredItem {
        ScoredItem {
            similarity_score: None,
            extracted_text: None,
            error: Some(ItemFailure::Extraction {
                reason: "unreadable".into(),
            }),
            ..scored(index, 0.0)
        }
    }

    fn order(ranked: &[RankedItem]) -> Vec<(usize, Option<usize>)> {
        ranked
            .iter()
            .map(|r| (r.item.original_index, r.ranking_position))
            .collect()
    }

    #[test]
    fn sorts_by_score_descending() {
        let ranked = rank(vec![scored(0, 0.2), scored(1, 0.9), scored(2, 0.5)]);
        assert_eq!(order(&ranked), vec![(1, Some(1)), (2, Some(2)), (0, Some(3))]);
    }

    #[test]
    fn ties_break_by_original_index() {
        let ranked = rank(vec![scored(3, 0.5), scored(1, 0.5), scored(2, 0.7), scored(0, 0.5)]);
        assert_eq!(
            order(&ranked),
            vec![(2, Some(1)), (0, Some(2)), (1, Some(3)), (3, Some(4))]
        );
    }

    #[test]
    fn failed_items_trail_in_submission_order() {
        let ranked = rank(vec![failed(4), scored(2, 0.1), failed(0), scored(3, 0.8)]);
        assert_eq!(
            order(&ranked),
            vec![(3, Some(1)), (2, Some(2)), (0, None), (4, None)]
        );
    }

    #[test]
    fn input_order_does_not_matter() {
        let forward = rank(vec![scored(0, 0.3), scored(1, 0.3), failed(2), scored(3, 0.6)]);
        let reversed = rank(vec![scored(3, 0.6), failed(2), scored(1, 0.3), scored(0, 0.3)]);
        assert_eq!(order(&forward), order(&reversed));
    }

    #[test]
    fn all_failed_batch_has_no_positions() {
        let ranked = rank(vec![failed(1), failed(0)]);
        assert_eq!(order(&ranked), vec![(0, None), (1, None)]);
    }
}
