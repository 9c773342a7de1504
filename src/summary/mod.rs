//! Extractive, plain-language cluster summaries.
//!
//! A summary is a couple of sentences lifted from the cluster's abstracts:
//!
//! 1. Candidate sentences are split on terminal punctuation and kept when
//!    25 to 350 characters long. Abstracts without usable punctuation are cut
//!    into overlapping 200-character windows instead.
//! 2. Candidates are weighted with a [`TermWeighting`] and scored for
//!    relevance to the cluster's label terms and centrality among the other
//!    candidates.
//! 3. Sentences are picked greedily, penalising redundancy with sentences
//!    already picked and rewarding hints of real-world impact.
//! 4. The picks are de-jargonised, joined, truncated to `max_chars` and
//!    tidied up.
//!
//! Summarization never fails: every dead end degrades to a synthetic
//! sentence or an empty string.

mod tfidf;

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use tfidf::TfidfWeighting;

/// Shortest kept sentence, in characters.
const MIN_SENTENCE_CHARS: usize = 25;
/// Longest kept sentence or window, in characters.
const MAX_CANDIDATE_CHARS: usize = 350;
const WINDOW_CHARS: usize = 200;
const WINDOW_STEP: usize = 160;
const MIN_WINDOW_CHARS: usize = 60;
const MAX_WINDOWS: usize = 20;

const RELEVANCE_WEIGHT: f64 = 0.65;
const CENTRALITY_WEIGHT: f64 = 0.35;
const EPSILON: f64 = 1e-9;

/// Appended to truncated summaries.
pub const ELLIPSIS: char = '…';

/// Substrings hinting at real-world impact.
pub const IMPACT_TERMS: &[&str] = &[
    "industry", "business", "product", "deployment", "real-world", "real world", "application",
    "applications", "economy", "economic", "cost", "energy", "speed", "scal", "safety",
    "healthcare", "robot", "autonomous", "finance", "manufacturing", "commerce", "content",
    "security", "privacy",
];

static JARGON: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)\bstate[- ]?of[- ]the[- ]art\b", "leading-edge"),
        (r"(?i)\bSOTA\b", "leading-edge"),
        (r"(?i)\bbenchmark(s)?\b", "standard tests"),
        (r"(?i)\brobust(ness)?\b", "reliable"),
        (r"(?i)\bgeneralization\b", "perform well in new situations"),
        (r"(?i)\bmodalit(y|ies)\b", "data types"),
        (r"(?i)\bframework\b", "approach"),
        (r"(?i)\barchitecture\b", "design"),
        (r"(?i)\boptimization\b", "improvement"),
        (r"(?i)\binference\b", "running the model"),
        (r"(?i)\bthroughput\b", "processing speed"),
        (r"(?i)\blatenc(y|ies)\b", "delay"),
        (r"(?i)\bscal(able|ability)\b", "scale to bigger problems"),
        (r"(?i)\bparameter(s)?\b", "settings"),
        (r"(?i)\bpre[- ]?training\b", "training in advance"),
        (r"(?i)\bself[- ]?supervised\b", "learn from raw data"),
        (r"(?i)\bzero[- ]?shot\b", "without task-specific training"),
        (r"(?i)\bfew[- ]?shot\b", "with very little training data"),
        (r"(?i)\bGaussian Splatting\b", "a fast 3D scene technique"),
        (r"(?i)\bLLM(s)?\b", "large AI models"),
        (r"(?i)\btransformer(s)?\b", "a popular AI model design"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid regex"), replacement))
    .collect()
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static SHORT_ASIDE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]{0,25}\)").expect("valid regex"));

/// Sparse term-weight vector.
pub type SparseVector = BTreeMap<String, f64>;

/// Dot product of two sparse vectors.
pub fn dot(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(term, w)| large.get(term).map(|v| w * v))
        .sum()
}

/// Candidate and query vectors produced by a [`TermWeighting`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightedTerms {
    /// One vector per candidate, same order
    pub rows: Vec<SparseVector>,

    /// Query vector in the candidates' term space
    pub query: SparseVector,
}

/// Term weighting of summary candidates.
///
/// Implementations fit their weights on `candidates` only and project the
/// query into that term space.
pub trait TermWeighting: Send + Sync {
    /// Weight the candidates and the query.
    fn weigh(&self, candidates: &[String], query: &str) -> WeightedTerms;
}

/// Summary settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Sentences to select (at least one is always attempted)
    pub n_sentences: usize,

    /// Character budget before the ellipsis
    pub max_chars: usize,

    /// Diversity weight λ; higher favours relevance and centrality
    pub diversity: f64,

    /// Bonus for candidates mentioning an impact term
    pub impact_bonus: f64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            n_sentences: 2,
            max_chars: 350,
            diversity: 0.6,
            impact_bonus: 0.15,
        }
    }
}

/// Per-candidate scores, computed once per summary.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScores {
    /// Similarity to the query, scaled into [0, 1] when any is positive
    pub relevance: Vec<f64>,

    /// Mean row-normalised similarity to all candidates
    pub centrality: Vec<f64>,

    /// Pairwise similarities, each row divided by its maximum
    pub similarity: Vec<Vec<f64>>,

    /// Whether the candidate mentions an impact term
    pub impact: Vec<bool>,
}

impl CandidateScores {
    /// Number of scored candidates.
    pub fn len(&self) -> usize {
        self.relevance.len()
    }

    /// Whether nothing was scored.
    pub fn is_empty(&self) -> bool {
        self.relevance.is_empty()
    }
}

/// Rewrite research jargon into plain words and collapse whitespace.
pub fn simplify_jargon(text: &str) -> String {
    let mut s = text.to_string();
    for (pattern, replacement) in JARGON.iter() {
        s = pattern.replace_all(&s, *replacement).into_owned();
    }
    WHITESPACE.replace_all(&s, " ").trim().to_string()
}

/// Whether `text` mentions any [`IMPACT_TERMS`] entry (case-insensitive substring).
pub fn has_impact_term(text: &str) -> bool {
    let lowered = text.to_lowercase();
    IMPACT_TERMS.iter().any(|t| lowered.contains(t))
}

/// Split on whitespace that follows `.`, `!` or `?`.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            sentences.push(&text[start..i]);
            let mut next_start = i + c.len_utf8();
            while let Some(&(j, w)) = chars.peek() {
                if !w.is_whitespace() {
                    break;
                }
                next_start = j + w.len_utf8();
                chars.next();
            }
            start = next_start;
            prev = None;
            continue;
        }
        prev = Some(c);
    }
    sentences.push(&text[start..]);
    sentences
}

/// Cut `text` to at most `max_chars` characters, marking the cut with an ellipsis.
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    let trimmed = cut.trim_end().len();
    cut.truncate(trimmed);
    cut.push(ELLIPSIS);
    cut
}

/// Extractive summarizer.
#[derive(Debug, Clone)]
pub struct Summarizer<W: TermWeighting = TfidfWeighting> {
    weighting: W,
    config: SummaryConfig,
}

impl Summarizer<TfidfWeighting> {
    /// Create a summarizer with TF-IDF weighting.
    pub fn new(config: SummaryConfig) -> Self {
        Self::with_weighting(TfidfWeighting::default(), config)
    }
}

impl Default for Summarizer<TfidfWeighting> {
    fn default() -> Self {
        Self::new(SummaryConfig::default())
    }
}

impl<W: TermWeighting> Summarizer<W> {
    /// Create a summarizer with a custom term weighting.
    pub fn with_weighting(weighting: W, config: SummaryConfig) -> Self {
        Self { weighting, config }
    }

    /// Active configuration.
    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    /// Candidate sentences of `abstracts`, deduplicated in first-seen order.
    pub fn extract_candidates(&self, abstracts: &[&str]) -> Vec<String> {
        let mut candidates: Vec<String> = abstracts
            .iter()
            .filter(|a| !a.is_empty())
            .flat_map(|a| split_sentences(a.trim()))
            .map(str::trim)
            .filter(|s| (MIN_SENTENCE_CHARS..=MAX_CANDIDATE_CHARS).contains(&s.chars().count()))
            .map(str::to_string)
            .collect();

        if candidates.is_empty() {
            candidates = windows(abstracts);
        }

        let mut seen = std::collections::HashSet::new();
        candidates.retain(|c| seen.insert(c.clone()));
        candidates
    }

    /// Relevance, centrality and pairwise similarity of `candidates`.
    ///
    /// The query is the first eight `keywords`, or the first three
    /// candidates when there are no keywords.
    pub fn score_candidates(&self, candidates: &[String], keywords: &[String]) -> CandidateScores {
        let query = if keywords.is_empty() {
            candidates.iter().take(3).cloned().collect::<Vec<_>>().join(" ")
        } else {
            keywords.iter().take(8).cloned().collect::<Vec<_>>().join(" ")
        };

        let weighted = self.weighting.weigh(candidates, &query);
        let rows = &weighted.rows;

        let mut relevance: Vec<f64> = rows.iter().map(|r| dot(r, &weighted.query)).collect();
        let max_relevance = relevance.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max_relevance > 0.0 {
            relevance.iter_mut().for_each(|r| *r /= max_relevance + EPSILON);
        }

        let similarity: Vec<Vec<f64>> = rows
            .iter()
            .map(|a| {
                let raw: Vec<f64> = rows.iter().map(|b| dot(a, b)).collect();
                let row_max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max) + EPSILON;
                raw.into_iter().map(|s| s / row_max).collect()
            })
            .collect();

        let centrality = similarity
            .iter()
            .map(|row| row.iter().sum::<f64>() / row.len().max(1) as f64)
            .collect();

        CandidateScores {
            relevance,
            centrality,
            similarity,
            impact: candidates.iter().map(|c| has_impact_term(c)).collect(),
        }
    }

    /// Selection score of candidate `i` given the already `selected` ones.
    pub fn marginal_score(&self, scores: &CandidateScores, i: usize, selected: &[usize]) -> f64 {
        let redundancy = selected
            .iter()
            .map(|&j| scores.similarity[i][j])
            .fold(0.0, f64::max);
        let bonus = if scores.impact[i] { self.config.impact_bonus } else { 0.0 };

        RELEVANCE_WEIGHT * scores.relevance[i] + CENTRALITY_WEIGHT * scores.centrality[i]
            - (1.0 - self.config.diversity) * redundancy
            + bonus
    }

    /// Greedily pick up to `n` candidate indices (at least one when any exist).
    ///
    /// Each round takes the highest marginal score; on equal scores the
    /// earlier candidate wins.
    pub fn select(&self, scores: &CandidateScores, n: usize) -> Vec<usize> {
        let wanted = n.max(1);
        let mut pool: Vec<usize> = (0..scores.len()).collect();
        let mut selected: Vec<usize> = Vec::with_capacity(wanted);

        while selected.len() < wanted && !pool.is_empty() {
            let mut best: Option<(usize, f64)> = None;
            for (slot, &i) in pool.iter().enumerate() {
                let score = self.marginal_score(scores, i, &selected);
                match best {
                    Some((_, best_score)) if score <= best_score => {}
                    _ => best = Some((slot, score)),
                }
            }
            match best {
                Some((slot, _)) => selected.push(pool.remove(slot)),
                None => break,
            }
        }
        selected
    }

    /// Summarize a set of candidates directly.
    pub fn summarize_candidates(&self, candidates: &[String], keywords: &[String]) -> String {
        if candidates.is_empty() {
            return self.synthetic(keywords);
        }

        let scores = self.score_candidates(candidates, keywords);
        let picked: Vec<String> = self
            .select(&scores, self.config.n_sentences)
            .into_iter()
            .map(|i| simplify_jargon(&candidates[i]))
            .collect();

        self.finish(&picked.join(" "))
    }

    /// Summarize one cluster from its raw abstracts and label terms.
    ///
    /// Returns an empty string when `abstracts` is empty.
    pub fn summarize(&self, abstracts: &[&str], keywords: &[String]) -> String {
        if abstracts.is_empty() {
            return String::new();
        }
        let candidates = self.extract_candidates(abstracts);
        self.summarize_candidates(&candidates, keywords)
    }

    /// One-line summary built from the label terms alone.
    fn synthetic(&self, keywords: &[String]) -> String {
        if keywords.is_empty() {
            return String::new();
        }
        let terms: Vec<&str> = keywords.iter().take(4).map(String::as_str).collect();
        let sentence = format!("This group of papers explores {}.", terms.join(", "));
        self.finish(&simplify_jargon(&sentence))
    }

    fn finish(&self, text: &str) -> String {
        let truncated = truncate(text, self.config.max_chars);
        let collapsed = WHITESPACE.replace_all(&truncated, " ");
        SHORT_ASIDE.replace_all(&collapsed, "").trim().to_string()
    }
}

/// Overlapping character windows over whitespace-collapsed abstracts.
fn windows(abstracts: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    for text in abstracts {
        let collapsed = WHITESPACE.replace_all(text, " ");
        let chars: Vec<char> = collapsed.trim().chars().collect();

        let mut start = 0;
        while start < chars.len() {
            let end = (start + WINDOW_CHARS).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if (MIN_WINDOW_CHARS..=MAX_CANDIDATE_CHARS).contains(&chunk.chars().count()) {
                out.push(chunk.to_string());
            }
            if out.len() >= MAX_WINDOWS {
                return out;
            }
            start += WINDOW_STEP;
        }
    }
    out
}
