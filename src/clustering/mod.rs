//! Clustering collaborators: density clusterer, keyword extractor and
//! partition quality scorer.
//!
//! The selection and reassignment stages only talk to the traits defined
//! here, so any backend that honours the contracts can be dropped in:
//!
//! - [`Clusterer`]: one cluster id per row of a reduced matrix, `None` for
//!   unclustered rows
//! - [`KeywordExtractor`]: ranked `(term, score)` lists per cluster
//! - [`QualityScorer`]: an internal quality score of a complete partition
//!
//! Default backends: [`DensityClusterer`] (DBSCAN via `linfa-clustering`),
//! [`ClassTfidfExtractor`] and [`SilhouetteScorer`].

mod dbscan;
mod keywords;
mod silhouette;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::{ClusterAssignment, ClusterId, Keyword};

pub use dbscan::{DensityClusterer, Tolerance};
pub use keywords::ClassTfidfExtractor;
pub use silhouette::SilhouetteScorer;

/// Errors returned by clustering collaborators.
#[derive(Debug, Error)]
pub enum ClusteringError {
    /// Input matrix is empty.
    #[error("empty input")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// Rows have inconsistent dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// The partition cannot be scored.
    #[error("partition not eligible for scoring: {0}")]
    Ineligible(String),

    /// Backend-specific failure.
    #[error("clustering backend failed: {0}")]
    Backend(String),
}

/// Result type for clustering operations.
pub type ClusteringResult<T> = Result<T, ClusteringError>;

/// Density-based cluster discovery.
pub trait Clusterer: Send + Sync {
    /// Assign a cluster to every row of `matrix`; `None` marks unclustered rows.
    ///
    /// The returned vector has exactly one entry per row.
    fn cluster(&self, matrix: &[Vec<f32>], min_cluster_size: usize) -> ClusteringResult<Vec<Option<ClusterId>>>;

    /// Human-readable backend name for logging.
    fn name(&self) -> &str;
}

/// Per-cluster candidate keyword extraction.
pub trait KeywordExtractor: Send + Sync {
    /// Ranked keywords for every cluster present in `assignment`.
    ///
    /// `documents[i]` is the normalized text of document `i`. Lists are in
    /// descending score order, ties by first occurrence. Unclustered
    /// documents contribute to no list.
    fn keywords(&self, documents: &[String], assignment: &ClusterAssignment) -> BTreeMap<ClusterId, Vec<Keyword>>;
}

/// Internal quality score of a partition.
pub trait QualityScorer: Send + Sync {
    /// Score `assignment` over `matrix`; higher is better.
    ///
    /// # Errors
    /// Returns `ClusteringError::Ineligible` when the partition has fewer than
    /// two clusters or any unclustered document.
    fn score(&self, matrix: &[Vec<f32>], assignment: &ClusterAssignment) -> ClusteringResult<f32>;
}

/// Check that a matrix is non-empty and rectangular, returning its width.
pub(crate) fn check_matrix(matrix: &[Vec<f32>]) -> ClusteringResult<usize> {
    let first = matrix.first().ok_or(ClusteringError::EmptyInput)?;
    let d = first.len();
    for row in matrix.iter().skip(1) {
        if row.len() != d {
            return Err(ClusteringError::DimensionMismatch {
                expected: d,
                found: row.len(),
            });
        }
    }
    Ok(d)
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero magnitude, so callers never see
/// NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot_product / (norm_a * norm_b)
}

/// Euclidean distance between two vectors.
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}
