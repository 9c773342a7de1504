//! Cluster labels.
//!
//! A label is built from a cluster's ranked keyword list with a three-step
//! fallback chain, so it is never empty:
//!
//! 1. up to `k` filtered terms from [`pick_top_terms`]
//! 2. the first `k` raw keywords, when filtering leaves nothing
//! 3. `topic-<id>`, when the keyword list itself is empty

use std::collections::BTreeMap;

use crate::models::{ClusterId, ClusterLabel, ClusterModel, Keyword, LabelSource};
use crate::terms::pick_top_terms;

/// Default number of label terms.
pub const DEFAULT_LABEL_TERMS: usize = 5;

/// Build the label of one cluster from its ranked keywords.
pub fn build_label(cluster_id: ClusterId, keywords: &[Keyword], k: usize) -> ClusterLabel {
    let filtered = pick_top_terms(keywords, k);
    if !filtered.is_empty() {
        return ClusterLabel {
            cluster_id,
            terms: filtered,
            source: LabelSource::Filtered,
        };
    }

    let raw: Vec<String> = keywords
        .iter()
        .take(k)
        .map(|kw| kw.term.clone())
        .filter(|t| !t.trim().is_empty())
        .collect();
    if !raw.is_empty() {
        return ClusterLabel {
            cluster_id,
            terms: raw,
            source: LabelSource::RawKeywords,
        };
    }

    ClusterLabel {
        cluster_id,
        terms: vec![format!("topic-{}", cluster_id)],
        source: LabelSource::Placeholder,
    }
}

/// Labels for every cluster of `model`, from its current keyword lists.
///
/// Call this after outlier reassignment so the labels reflect the refreshed
/// keywords.
pub fn build_labels(model: &ClusterModel, k: usize) -> BTreeMap<ClusterId, ClusterLabel> {
    model
        .assignment
        .cluster_ids()
        .into_iter()
        .map(|id| (id, build_label(id, model.keywords_for(id), k)))
        .collect()
}
