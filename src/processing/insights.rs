//! Human-facing extras attached to successfully scored items.

use super::scoring::query_terms;

const SUMMARY_MAX_CHARS: usize = 500;
const EXCERPT_MIN_OVERLAP: f32 = 0.1;
/// Default number of excerpts returned per item.
pub const MAX_EXCERPTS: usize = 3;

/// Extractive summary: short texts are kept whole, longer ones keep their first two sentences
/// and the last one. Capped at 500 characters.
pub fn summarize(text: &str) -> String {
    let sentences = split_sentences(text);
    let summary = if sentences.len() <= 3 {
        text.trim().to_string()
    } else {
        let last = sentences[sentences.len() - 1];
        format!("{}. {}. {last}.", sentences[0], sentences[1])
    };
    truncate_chars(&summary, SUMMARY_MAX_CHARS)
}

/// Sentences sharing the most terms with `query`, best first.
///
/// Overlap is `|common| / max(|query terms|, |sentence terms|)`; sentences at or below 0.1 are
/// dropped. Ties keep document order.
pub fn relevant_excerpts(query: &str, text: &str, limit: usize) -> Vec<String> {
    let query = query_terms(query);
    if query.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(f32, &str)> = text
        .split('.')
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .map(|sentence| {
            let terms = query_terms(sentence);
            let common = query.intersection(&terms).count();
            let denominator = query.len().max(terms.len()).max(1);
            (common as f32 / denominator as f32, sentence)
        })
        .filter(|(overlap, _)| *overlap > EXCERPT_MIN_OVERLAP)
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, sentence)| format!("{sentence}."))
        .collect()
}

/// One-line explanation of a similarity score.
pub fn justification(score: f32) -> String {
    if score > 0.7 {
        format!("Highly relevant (score: {score:.2}): the document covers the query closely")
    } else if score > 0.4 {
        format!("Moderately relevant (score: {score:.2}): the document shares some of the query")
    } else {
        format!("Weakly relevant (score: {score:.2}): little overlap with the query")
    }
}

fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_its_own_summary() {
        assert_eq!(summarize("  One. Two. Three.  "), "One. Two. Three.");
    }

    #[test]
    fn long_text_keeps_first_two_and_last_sentence() {
        let summary = summarize("First. Second. Third. Fourth. Last one.");
        assert_eq!(summary, "First. Second. Last one.");
    }

    #[test]
    fn mixed_terminators_become_full_stops() {
        let summary = summarize("Is it up? Yes! Mostly. Revenue grew. Done");
        assert_eq!(summary, "Is it up. Yes. Done.");
    }

    #[test]
    fn summary_is_capped() {
        let text = "x".repeat(800);
        let summary = summarize(&text);
        assert_eq!(summary.chars().count(), SUMMARY_MAX_CHARS + 3);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn excerpts_rank_by_overlap() {
        let text = "The weather was mild. Revenue grew in the annual report. The annual report lists revenue and profit by region.";
        let excerpts = relevant_excerpts("annual revenue report", text, MAX_EXCERPTS);
        assert_eq!(excerpts.len(), 2);
        assert_eq!(excerpts[0], "Revenue grew in the annual report.");
        assert!(excerpts.iter().all(|excerpt| excerpt.ends_with('.')));
    }

    #[test]
    fn excerpts_respect_limit() {
        let text = "tax one. tax two. tax three. tax four.";
        assert_eq!(relevant_excerpts("tax", text, 2).len(), 2);
    }

    #[test]
    fn justification_tiers() {
        assert!(justification(0.85).starts_with("Highly relevant (score: 0.85)"));
        assert!(justification(0.5).starts_with("Moderately relevant"));
        assert!(justification(0.1).starts_with("Weakly relevant"));
    }
}
