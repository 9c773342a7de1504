//! TF-IDF weighting of summary candidates.

use std::collections::{BTreeMap, HashMap};

use super::{SparseVector, TermWeighting, WeightedTerms};
use crate::terms::tokens::unigrams_and_bigrams;

/// Unigram and bigram TF-IDF with smooth idf and L2-normalised rows.
///
/// Terms occurring in more than `max_df` of the candidates are dropped,
/// unless that would drop every term.
#[derive(Debug, Clone, PartialEq)]
pub struct TfidfWeighting {
    /// Maximum document-frequency share of a kept term
    pub max_df: f64,
}

impl Default for TfidfWeighting {
    fn default() -> Self {
        Self { max_df: 0.9 }
    }
}

impl TfidfWeighting {
    fn vectorize(terms: &[String], idf: &HashMap<String, f64>) -> SparseVector {
        let mut vector: SparseVector = BTreeMap::new();
        for term in terms {
            if let Some(weight) = idf.get(term) {
                *vector.entry(term.clone()).or_insert(0.0) += weight;
            }
        }

        let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            vector.values_mut().for_each(|w| *w /= norm);
        }
        vector
    }
}

impl TermWeighting for TfidfWeighting {
    fn weigh(&self, candidates: &[String], query: &str) -> WeightedTerms {
        let tokenized: Vec<Vec<String>> = candidates.iter().map(|c| unigrams_and_bigrams(c)).collect();

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for terms in &tokenized {
            let mut unique: Vec<&str> = terms.iter().map(String::as_str).collect();
            unique.sort_unstable();
            unique.dedup();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let n = candidates.len() as f64;
        let max_count = self.max_df * n;
        let mut kept: Vec<(&str, usize)> = doc_freq
            .iter()
            .filter(|&(_, &df)| (df as f64) <= max_count)
            .map(|(&t, &df)| (t, df))
            .collect();
        if kept.is_empty() {
            kept = doc_freq.iter().map(|(&t, &df)| (t, df)).collect();
        }

        let idf: HashMap<String, f64> = kept
            .into_iter()
            .map(|(term, df)| (term.to_string(), ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0))
            .collect();

        WeightedTerms {
            rows: tokenized.iter().map(|terms| Self::vectorize(terms, &idf)).collect(),
            query: Self::vectorize(&unigrams_and_bigrams(query), &idf),
        }
    }
}
