//! Keyword filtering and deduplication for cluster labels.
//!
//! Keyword extractors happily rank boilerplate ("model", "novel", "results")
//! and morphological variants ("molecule", "molecules") near the top. The
//! helpers here drop generic terms and collapse near-duplicates so that a
//! label spends its few slots on distinct, informative words.

pub mod tokens;

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Keyword;

/// Domain boilerplate that never makes a useful label term.
pub const GENERIC_TERMS: &[&str] = &[
    "paper", "study", "work", "approach", "method", "methods", "technique", "techniques",
    "model", "models", "language", "large", "vision", "image", "images", "video", "videos",
    "neural", "network", "networks", "deep", "learning", "data", "task", "tasks", "system",
    "systems", "dataset", "datasets", "framework", "benchmark", "results", "based", "using",
    "towards", "analysis", "problem", "problems", "novel", "state", "art", "field", "general",
    "performance", "generation", "generative", "representation", "representations",
    "understanding", "understand", "algorithm", "algorithms", "adversarial", "attack",
    "attacks", "diffusion", "gaussian", "gaussians", "llm", "llms", "multimodal", "multi",
    "view", "views", "scene", "scenes", "modeling", "modelling", "transformer", "transformers",
    "pretraining", "pre-trained", "pretrained", "zero", "shot", "zero-shot", "few", "few-shot",
    "self", "supervised", "self-supervised", "3d", "2d", "real", "time", "real-time", "online",
    "offline", "robust", "robustness", "efficient", "improving", "improved", "improves",
    "theory", "theoretical", "learning-based", "foundation", "world", "document", "documents",
    "object", "objects", "semantic", "segmentation", "classification", "retrieval", "editing",
    "edit", "edits", "control", "controls", "mamba", "video-language", "vision-language",
    "text", "texts", "prompt", "prompts", "prompting", "mining", "distillation",
    "regularization", "regularizer", "prior", "priors", "bayesian", "ctfidf", "topic",
    "topics", "keyword", "keywords", "et", "al", "et al", "al.",
];

/// Suffixes stripped by [`stem`], tried in this order.
const STEM_SUFFIXES: &[&str] = &["ing", "edly", "ed", "ly", "ies", "s"];

static GENERIC_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| GENERIC_TERMS.iter().copied().collect());
static NON_TERM_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\-]+").expect("valid regex"));

/// Whether a token is domain boilerplate.
///
/// The token is lowercased, runs of characters outside `[a-z0-9-]` become a
/// single space, and the trimmed result is looked up in [`GENERIC_TERMS`].
pub fn is_generic(token: &str) -> bool {
    let lowered = token.trim().to_lowercase();
    let cleaned = NON_TERM_RUN.replace_all(&lowered, " ");
    GENERIC_SET.contains(cleaned.trim())
}

/// Coarse stem used only to detect near-duplicate terms.
///
/// Strips the first matching suffix of `-ing`, `-edly`, `-ed`, `-ly`, `-ies`
/// (which becomes `-y`) and `-s`, but only when more than two characters
/// remain. Characters outside `[a-z0-9-]` are dropped first.
///
/// ```
/// use paper_clusters::terms::stem;
///
/// assert_eq!(stem("Molecules"), "molecule");
/// assert_eq!(stem("studies"), "study");
/// assert_eq!(stem("bus"), "bus");
/// ```
pub fn stem(token: &str) -> String {
    let word: String = token
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();

    for suffix in STEM_SUFFIXES {
        if word.ends_with(suffix) && word.len() > suffix.len() + 2 {
            let base = &word[..word.len() - suffix.len()];
            return if *suffix == "ies" {
                format!("{}y", base)
            } else {
                base.to_string()
            };
        }
    }
    word
}

/// Pick up to `k` distinct, informative terms from a ranked keyword list.
///
/// Greedy left-to-right scan, first fit, no backtracking. A candidate is
/// skipped for good when it is empty, generic, shorter than three
/// characters, a substring of (or contains) an accepted term, or shares a
/// stem with an accepted term. Accepted terms are lowercased and trimmed.
///
/// May return fewer than `k` terms, possibly none.
pub fn pick_top_terms(candidates: &[Keyword], k: usize) -> Vec<String> {
    let mut chosen: Vec<String> = Vec::with_capacity(k);
    let mut stems: HashSet<String> = HashSet::new();

    for candidate in candidates {
        if chosen.len() >= k {
            break;
        }

        let term = candidate.term.trim().to_lowercase();
        if term.is_empty() || is_generic(&term) || term.chars().count() < 3 {
            continue;
        }
        if chosen
            .iter()
            .any(|c| c.contains(term.as_str()) || term.contains(c.as_str()))
        {
            continue;
        }
        let term_stem = stem(&term);
        if !stems.insert(term_stem) {
            continue;
        }
        chosen.push(term);
    }

    chosen
}
