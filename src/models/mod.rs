//! Core data models for the paper clustering pipeline.
//!
//! This module contains the fundamental data structures shared across the
//! pipeline stages: input documents, cluster assignments, ranked keywords,
//! the selected cluster model, labels, and the final per-cluster report.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::embedding::{normalize_optional, normalize_text};

/// Identifier of a discovered cluster.
///
/// Unclustered documents carry no id at all: an assignment slot of `None`
/// is the "NONE" sentinel used throughout the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterId(pub u32);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single research paper as seen by the clustering pipeline.
///
/// Documents are immutable once ingested. The `normalized` field is the text
/// handed to the embedder and keyword extractor; the raw `abstract_text` is
/// kept for sentence extraction, which needs the original punctuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Position of the row in the input dataset
    pub index: usize,

    /// Paper title as ingested
    pub title: String,

    /// Abstract text as ingested
    pub abstract_text: String,

    /// Normalized "title. abstract" text used for embedding
    pub normalized: String,

    /// Citation count, when the dataset provides a numeric value
    pub citation_count: Option<f64>,
}

impl Document {
    /// Create a document, deriving its normalized text from title and abstract.
    ///
    /// # Arguments
    /// * `index` - Row position in the input dataset
    /// * `title` - Raw title
    /// * `abstract_text` - Raw abstract
    /// * `citation_count` - Optional citation count
    pub fn new(
        index: usize,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
        citation_count: Option<f64>,
    ) -> Self {
        let title = title.into();
        let abstract_text = abstract_text.into();
        let normalized = format!(
            "{}. {}",
            normalize_text(&title),
            normalize_text(&abstract_text)
        );

        Self {
            index,
            title,
            abstract_text,
            normalized,
            citation_count: citation_count.filter(|c| c.is_finite()),
        }
    }

    /// Create a document from dataset cells that may be missing.
    ///
    /// An absent title or abstract is stored and normalized as empty text.
    pub fn from_cells(
        index: usize,
        title: Option<&str>,
        abstract_text: Option<&str>,
        citation_count: Option<f64>,
    ) -> Self {
        let normalized = format!(
            "{}. {}",
            normalize_optional(title),
            normalize_optional(abstract_text)
        );

        Self {
            index,
            title: title.unwrap_or_default().to_string(),
            abstract_text: abstract_text.unwrap_or_default().to_string(),
            normalized,
            citation_count: citation_count.filter(|c| c.is_finite()),
        }
    }
}

/// One ranked keyword of a cluster's representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    /// The term (unigram or bigram)
    pub term: String,

    /// Extractor-specific weight, higher is more representative
    pub score: f32,
}

impl Keyword {
    /// Create a new keyword entry.
    pub fn new(term: impl Into<String>, score: f32) -> Self {
        Self {
            term: term.into(),
            score,
        }
    }
}

/// Mapping from document index to cluster id.
///
/// Every document has exactly one slot; `None` marks an unclustered
/// (outlier) document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    labels: Vec<Option<ClusterId>>,
}

impl ClusterAssignment {
    /// Wrap a label vector produced by a clusterer.
    pub fn from_labels(labels: Vec<Option<ClusterId>>) -> Self {
        Self { labels }
    }

    /// Number of documents covered by this assignment.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the assignment covers no documents.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Cluster of document `index`, `None` if unclustered or out of range.
    pub fn get(&self, index: usize) -> Option<ClusterId> {
        self.labels.get(index).copied().flatten()
    }

    /// Raw label slice, one entry per document.
    pub fn labels(&self) -> &[Option<ClusterId>] {
        &self.labels
    }

    pub(crate) fn assign(&mut self, index: usize, cluster: ClusterId) {
        self.labels[index] = Some(cluster);
    }

    /// Indices of unclustered documents, ascending.
    pub fn outlier_indices(&self) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.is_none().then_some(i))
            .collect()
    }

    /// Number of unclustered documents.
    pub fn outlier_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_none()).count()
    }

    /// Distinct cluster ids present, ascending.
    pub fn cluster_ids(&self) -> BTreeSet<ClusterId> {
        self.labels.iter().flatten().copied().collect()
    }

    /// Document indices grouped by cluster id, ascending by id then index.
    pub fn members_by_cluster(&self) -> BTreeMap<ClusterId, Vec<usize>> {
        let mut groups: BTreeMap<ClusterId, Vec<usize>> = BTreeMap::new();
        for (i, label) in self.labels.iter().enumerate() {
            if let Some(id) = label {
                groups.entry(*id).or_default().push(i);
            }
        }
        groups
    }
}

/// How the shipped partition was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelOrigin {
    /// Best-scoring eligible candidate of the grid search
    Selected,

    /// Default configuration, used because no candidate was eligible
    Fallback,
}

/// The chosen partition together with its per-cluster keyword lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterModel {
    /// Per-document cluster assignment
    pub assignment: ClusterAssignment,

    /// Ranked keywords per cluster (descending score)
    pub keywords: BTreeMap<ClusterId, Vec<Keyword>>,

    /// `min_cluster_size` the partition was produced with
    pub min_cluster_size: usize,

    /// Quality score of the partition, if it was eligible for scoring
    pub quality: Option<f32>,

    /// Whether the partition won the search or is the fallback
    pub origin: ModelOrigin,
}

impl ClusterModel {
    /// Keyword list of one cluster (empty slice if unknown).
    pub fn keywords_for(&self, cluster: ClusterId) -> &[Keyword] {
        self.keywords.get(&cluster).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Where the terms of a label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelSource {
    /// Deduplicated, non-generic terms
    Filtered,

    /// First raw keywords, because filtering left nothing
    RawKeywords,

    /// Synthetic placeholder, because the keyword list was empty
    Placeholder,
}

/// Separator between label terms.
pub const LABEL_SEPARATOR: &str = " • ";

/// Short human-readable label of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterLabel {
    /// Labelled cluster
    pub cluster_id: ClusterId,

    /// Label terms in rank order (never empty)
    pub terms: Vec<String>,

    /// Which fallback level produced the terms
    pub source: LabelSource,
}

impl ClusterLabel {
    /// Label text with terms joined by [`LABEL_SEPARATOR`].
    pub fn text(&self) -> String {
        self.terms.join(LABEL_SEPARATOR)
    }
}

impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// A paper listed under its cluster in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperEntry {
    /// Dataset row of the paper
    pub index: usize,

    /// Paper title
    pub title: String,

    /// Citation count, if known
    pub citation_count: Option<f64>,
}

/// Final view of one cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterReport {
    /// Cluster id
    pub cluster_id: ClusterId,

    /// Cluster label
    pub label: ClusterLabel,

    /// Number of member papers
    pub size: usize,

    /// Mean citation count over members with a known count
    pub average_citations: Option<f64>,

    /// Members sorted by citations, descending, unknown counts last
    pub papers: Vec<PaperEntry>,

    /// Plain-language summary (may be empty)
    pub summary: String,
}

/// Outcome of a full pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Number of input documents
    pub total_documents: usize,

    /// `min_cluster_size` of the shipped partition
    pub min_cluster_size: usize,

    /// Quality score of the shipped partition before reassignment
    pub quality: Option<f32>,

    /// Whether the shipped partition is the fallback configuration
    pub used_fallback: bool,

    /// Outliers moved to their nearest cluster
    pub reassigned: usize,

    /// Outliers that could not be resolved (no centroid existed)
    pub unresolved: usize,

    /// Per-cluster reports, ascending by cluster id
    pub clusters: Vec<ClusterReport>,
}

impl PipelineReport {
    /// Sum of cluster sizes.
    pub fn clustered_documents(&self) -> usize {
        self.clusters.iter().map(|c| c.size).sum()
    }

    /// Whether every document landed in exactly one reported cluster.
    pub fn covers_all_documents(&self) -> bool {
        self.clustered_documents() == self.total_documents
    }
}
