//! Class-based TF-IDF keyword extraction.
//!
//! Every cluster is treated as one large document. A term scores high for a
//! cluster when it is frequent inside the cluster and rare across clusters:
//!
//! ```text
//! w(t, c) = tf(t, c) / |c| * ln(1 + A / f(t))
//! ```
//!
//! where `|c|` is the number of terms in cluster `c`, `A` the average number
//! of terms per cluster and `f(t)` the frequency of `t` over all clusters.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::KeywordExtractor;
use crate::models::{ClusterAssignment, ClusterId, Keyword};
use crate::terms::tokens::unigrams_and_bigrams;

/// Class-based TF-IDF over unigrams and bigrams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassTfidfExtractor {
    /// Keywords kept per cluster
    pub top_n: usize,

    /// Minimum number of clustered documents a term must occur in
    pub min_df: usize,

    /// Maximum share of clustered documents a term may occur in
    pub max_df: f64,
}

impl Default for ClassTfidfExtractor {
    fn default() -> Self {
        Self {
            top_n: 30,
            min_df: 2,
            max_df: 0.95,
        }
    }
}

impl ClassTfidfExtractor {
    /// Create an extractor with default pruning that keeps `top_n` terms.
    pub fn with_top_n(top_n: usize) -> Self {
        Self {
            top_n,
            ..Default::default()
        }
    }

    /// Terms surviving document-frequency pruning.
    ///
    /// When pruning would remove every term (tiny corpora), nothing is pruned.
    fn vocabulary(&self, tokenized: &[(ClusterId, Vec<String>)]) -> HashSet<String> {
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for (_, terms) in tokenized {
            let unique: HashSet<&str> = terms.iter().map(String::as_str).collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let n_docs = tokenized.len() as f64;
        let kept: HashSet<String> = doc_freq
            .iter()
            .filter(|&(_, &df)| df >= self.min_df && (df as f64) <= self.max_df * n_docs)
            .map(|(term, _)| term.to_string())
            .collect();

        if kept.is_empty() {
            doc_freq.keys().map(|t| t.to_string()).collect()
        } else {
            kept
        }
    }
}

impl KeywordExtractor for ClassTfidfExtractor {
    fn keywords(&self, documents: &[String], assignment: &ClusterAssignment) -> BTreeMap<ClusterId, Vec<Keyword>> {
        let tokenized: Vec<(ClusterId, Vec<String>)> = documents
            .iter()
            .enumerate()
            .filter_map(|(i, doc)| assignment.get(i).map(|c| (c, unigrams_and_bigrams(doc))))
            .collect();

        let vocabulary = self.vocabulary(&tokenized);

        // First occurrence breaks score ties
        let mut first_seen: HashMap<&str, usize> = HashMap::new();
        let mut counts: BTreeMap<ClusterId, HashMap<&str, usize>> = BTreeMap::new();
        let mut totals: BTreeMap<ClusterId, usize> = BTreeMap::new();
        let mut corpus_freq: HashMap<&str, usize> = HashMap::new();

        for (cluster, terms) in &tokenized {
            let cluster_counts = counts.entry(*cluster).or_default();
            let total = totals.entry(*cluster).or_insert(0);
            for term in terms.iter().filter(|t| vocabulary.contains(t.as_str())) {
                let next = first_seen.len();
                first_seen.entry(term.as_str()).or_insert(next);
                *cluster_counts.entry(term.as_str()).or_insert(0) += 1;
                *corpus_freq.entry(term.as_str()).or_insert(0) += 1;
                *total += 1;
            }
        }

        let average_words = if totals.is_empty() {
            0.0
        } else {
            totals.values().sum::<usize>() as f64 / totals.len() as f64
        };

        counts
            .into_iter()
            .map(|(cluster, cluster_counts)| {
                let total = totals.get(&cluster).copied().unwrap_or(0).max(1) as f64;
                let mut scored: Vec<(&str, f64, usize)> = cluster_counts
                    .iter()
                    .map(|(&term, &count)| {
                        let f_t = corpus_freq.get(term).copied().unwrap_or(1) as f64;
                        let weight = (count as f64 / total) * (1.0 + average_words / f_t).ln();
                        (term, weight, first_seen.get(term).copied().unwrap_or(usize::MAX))
                    })
                    .collect();

                scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.2.cmp(&b.2)));

                let keywords = scored
                    .into_iter()
                    .take(self.top_n)
                    .map(|(term, weight, _)| Keyword::new(term, weight as f32))
                    .collect();
                (cluster, keywords)
            })
            .collect()
    }
}
