//! Lexicon-driven analyzer used when no external NLP service is configured.
//!
//! Keywords are the most frequent non-stop words, sentiment comes from counting positive and
//! negative stems, and the category is the pattern group with the most hits in the text.
//! Lexicons cover English and Portuguese.

use super::{AnalysisError, AnalysisResult, Analyzer, Sentiment, SentimentLabel};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};

const MAX_KEYWORDS: usize = 10;
const MIN_KEYWORD_CHARS: usize = 4;
const NEUTRAL_SCORE: f32 = 0.5;
const MAX_SENTIMENT_SCORE: f32 = 0.9;
const FALLBACK_CATEGORY: &str = "general";

const STOP_WORDS: &[&str] = &[
    "about", "after", "also", "been", "before", "being", "both", "could", "does", "each", "from",
    "have", "here", "into", "just", "more", "most", "much", "only", "other", "over", "same",
    "should", "some", "such", "than", "that", "their", "them", "then", "there", "these", "they",
    "this", "those", "through", "under", "very", "were", "what", "when", "where", "which",
    "while", "will", "with", "would", "your", "para", "como", "mais", "este", "esta", "estes",
    "estas", "isso", "isto", "aqui", "onde", "quando", "porque", "também", "ainda", "apenas",
    "muito", "todo", "toda", "todos", "todas", "outro", "outra", "outros", "outras", "seus",
    "suas",
];

const POSITIVE_STEMS: &[&str] = &[
    "good", "great", "excellent", "positive", "success", "quality", "guarantee", "satisf",
    "approv", "accept", "agreement", "benefit", "advantage", "profit", "gain", "ótimo",
    "excelente", "positivo", "sucesso", "qualidade", "garantia", "satisfação", "aprovad",
    "aceit", "acordo", "benefício", "vantagem", "lucro", "ganho",
];

const NEGATIVE_STEMS: &[&str] = &[
    "bad", "poor", "terrible", "negative", "problem", "error", "fail", "defect", "complaint",
    "dissatisf", "reject", "cancel", "loss", "damage", "ruim", "péssimo", "negativo", "problema",
    "erro", "falha", "defeito", "reclamação", "insatisfação", "rejeitad", "cancelad", "perda",
    "prejuízo", "dano",
];

const CATEGORY_PATTERNS: &[(&str, &[&str])] = &[
    (
        "contract",
        &[
            "contract", "agreement", "clause", "services", "payment", "contrato", "cláusula",
            "prestação", "pagamento",
        ],
    ),
    (
        "report",
        &[
            "report", "analysis", "results", "conclusion", "period", "monthly", "annual",
            "relatório", "análise", "resultado", "conclusão",
        ],
    ),
    (
        "invoice",
        &[
            "invoice", "billing", "due date", "amount due", "tax", "discount", "fatura",
            "nota fiscal", "cobrança", "vencimento", "imposto",
        ],
    ),
    (
        "correspondence",
        &[
            "letter", "dear", "sincerely", "regards", "we inform", "carta", "comunicado",
            "informamos", "solicitamos", "atenciosamente",
        ],
    ),
    (
        "legal",
        &[
            "lawsuit", "court", "attorney", "statute", "jurisprudence", "tribunal", "advogado",
            "jurisprudência",
        ],
    ),
    (
        "technical",
        &[
            "specification", "manual", "procedure", "configuration", "system", "software",
            "especificação", "procedimento", "configuração", "sistema",
        ],
    ),
    (
        "financial",
        &[
            "balance sheet", "revenue", "expense", "investment", "dividend", "balanço",
            "demonstrativo", "receita", "despesa", "investimento",
        ],
    ),
];

/// Deterministic analyzer backed by in-memory lexicons.
///
/// Build it once at startup; it holds no per-request state.
pub struct LexiconAnalyzer {
    stop_words: HashSet<String>,
}

impl LexiconAnalyzer {
    /// Construct the analyzer and its lookup tables.
    pub fn new() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().map(|word| word.to_string()).collect(),
        }
    }

    /// Analyze `text` synchronously.
    pub fn analyze_text(&self, text: &str) -> Result<AnalysisResult, AnalysisError> {
        let lowered = text.to_lowercase();
        let words = split_words(&lowered);
        if words.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }

        Ok(AnalysisResult {
            sentiment: sentiment(&words),
            keywords: self.keywords(&words),
            category: category(&lowered).to_string(),
        })
    }

    fn keywords(&self, words: &[&str]) -> BTreeSet<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for &word in words {
            if word.chars().count() >= MIN_KEYWORD_CHARS && !self.stop_words.contains(word) {
                *counts.entry(word).or_default() += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(MAX_KEYWORDS)
            .map(|(word, _)| word.to_string())
            .collect()
    }
}

impl Default for LexiconAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Analyzer for LexiconAnalyzer {
    async fn analyze(&self, text: &str) -> Result<AnalysisResult, AnalysisError> {
        let result = self.analyze_text(text)?;
        tracing::debug!(
            keywords = result.keywords.len(),
            category = %result.category,
            sentiment = ?result.sentiment.label,
            "Lexicon analysis complete"
        );
        Ok(result)
    }
}

fn split_words(lowered: &str) -> Vec<&str> {
    lowered
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| !word.is_empty())
        .collect()
}

fn sentiment(words: &[&str]) -> Sentiment {
    let hits = |stems: &[&str]| {
        words
            .iter()
            .filter(|word| stems.iter().any(|stem| word.starts_with(stem)))
            .count()
    };
    let positive = hits(POSITIVE_STEMS);
    let negative = hits(NEGATIVE_STEMS);

    if positive == negative {
        return Sentiment {
            label: SentimentLabel::Neutral,
            score: NEUTRAL_SCORE,
        };
    }

    let margin = positive.abs_diff(negative) as f32 / words.len() as f32;
    let score = (NEUTRAL_SCORE + margin).min(MAX_SENTIMENT_SCORE);
    let label = if positive > negative {
        SentimentLabel::Positive
    } else {
        SentimentLabel::Negative
    };
    Sentiment { label, score }
}

fn category(lowered: &str) -> &'static str {
    let mut best: Option<(&'static str, usize)> = None;
    for &(name, patterns) in CATEGORY_PATTERNS {
        let matches = patterns
            .iter()
            .filter(|pattern| lowered.contains(**pattern))
            .count();
        if matches > 0 && best.is_none_or(|(_, top)| matches > top) {
            best = Some((name, matches));
        }
    }
    best.map_or(FALLBACK_CATEGORY, |(name, _)| name)
}
