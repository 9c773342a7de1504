//! Cluster model selection.
//!
//! Runs the clusterer over a small grid of `min_cluster_size` values around
//! a configured default, scores each partition, and keeps the best eligible
//! one. A partition is eligible when the quality scorer accepts it, which
//! rules out any partition with unclustered documents. When no grid value
//! yields an eligible partition the default configuration is clustered once
//! more and shipped as-is, outliers included.
//!
//! Grid values whose clusterer call fails are logged and skipped. Only the
//! fallback run is allowed to fail the selection.

use std::ops::RangeInclusive;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clustering::{ClusteringError, Clusterer, KeywordExtractor, QualityScorer};
use crate::models::{ClusterAssignment, ClusterModel, ModelOrigin};

/// Errors that abort model selection.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// No documents to cluster
    #[error("No documents to cluster")]
    EmptyInput,

    /// The documents and reduced vectors disagree in length
    #[error("{documents} documents but {vectors} reduced vectors")]
    LengthMismatch {
        /// Number of documents
        documents: usize,
        /// Number of reduced vectors
        vectors: usize,
    },

    /// The fallback clusterer run failed
    #[error("Fallback clustering with min_cluster_size {min_cluster_size} failed: {source}")]
    FallbackFailed {
        /// Default `min_cluster_size`
        min_cluster_size: usize,
        /// Clusterer error
        source: ClusteringError,
    },

    /// The clusterer returned the wrong number of labels
    #[error("Clusterer returned {found} labels for {expected} documents")]
    LabelCountMismatch {
        /// Documents sent
        expected: usize,
        /// Labels received
        found: usize,
    },
}

/// Result type for model selection.
pub type SelectionResult<T> = Result<T, SelectionError>;

/// Grid-search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Default `min_cluster_size`; the grid is centred on it
    pub min_cluster_size: usize,

    /// Evaluate grid values on the rayon thread pool
    pub parallel: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 3,
            parallel: false,
        }
    }
}

impl SelectorConfig {
    /// Candidate `min_cluster_size` values: `max(2, d - 2) ..= d + 3`.
    pub fn grid(&self) -> RangeInclusive<usize> {
        let d = self.min_cluster_size;
        d.saturating_sub(2).max(2)..=d + 3
    }
}

/// Outcome of one grid value.
#[derive(Debug, Clone)]
pub enum Candidate {
    /// Partition accepted by the quality scorer
    Eligible {
        /// Grid value
        min_cluster_size: usize,
        /// Quality score
        score: f32,
        /// Partition
        assignment: ClusterAssignment,
    },

    /// Partition the scorer refused (outliers, a single cluster, NaN score)
    Ineligible {
        /// Grid value
        min_cluster_size: usize,
        /// Why it was refused
        reason: String,
    },

    /// Clusterer call failed
    Failed {
        /// Grid value
        min_cluster_size: usize,
        /// Clusterer error message
        error: String,
    },
}

impl Candidate {
    /// Score of an eligible candidate.
    pub fn score(&self) -> Option<f32> {
        match self {
            Candidate::Eligible { score, .. } => Some(*score),
            _ => None,
        }
    }
}

/// Grid-search model selector.
pub struct ModelSelector<'a> {
    clusterer: &'a dyn Clusterer,
    scorer: &'a dyn QualityScorer,
    extractor: &'a dyn KeywordExtractor,
    config: SelectorConfig,
}

impl<'a> ModelSelector<'a> {
    /// Create a selector over the given collaborators.
    pub fn new(
        clusterer: &'a dyn Clusterer,
        scorer: &'a dyn QualityScorer,
        extractor: &'a dyn KeywordExtractor,
        config: SelectorConfig,
    ) -> Self {
        Self {
            clusterer,
            scorer,
            extractor,
            config,
        }
    }

    /// Cluster and score one grid value.
    pub fn evaluate(&self, reduced: &[Vec<f32>], min_cluster_size: usize) -> Candidate {
        let labels = match self.clusterer.cluster(reduced, min_cluster_size) {
            Ok(labels) if labels.len() == reduced.len() => labels,
            Ok(labels) => {
                return Candidate::Failed {
                    min_cluster_size,
                    error: format!("{} labels for {} documents", labels.len(), reduced.len()),
                }
            }
            Err(e) => {
                return Candidate::Failed {
                    min_cluster_size,
                    error: e.to_string(),
                }
            }
        };

        let assignment = ClusterAssignment::from_labels(labels);
        let outliers = assignment.outlier_count();
        let clusters = assignment.cluster_ids().len();
        if outliers > 0 || clusters < 2 {
            return Candidate::Ineligible {
                min_cluster_size,
                reason: format!("{} clusters, {} unclustered documents", clusters, outliers),
            };
        }

        match self.scorer.score(reduced, &assignment) {
            Ok(score) if score.is_nan() => Candidate::Ineligible {
                min_cluster_size,
                reason: "score is NaN".to_string(),
            },
            Ok(score) => Candidate::Eligible {
                min_cluster_size,
                score,
                assignment,
            },
            Err(e) => Candidate::Ineligible {
                min_cluster_size,
                reason: e.to_string(),
            },
        }
    }

    /// Evaluate every grid value, in grid order.
    pub fn evaluate_grid(&self, reduced: &[Vec<f32>]) -> Vec<Candidate> {
        let grid: Vec<usize> = self.config.grid().collect();
        if self.config.parallel {
            grid.par_iter().map(|&m| self.evaluate(reduced, m)).collect()
        } else {
            grid.iter().map(|&m| self.evaluate(reduced, m)).collect()
        }
    }

    /// Select the shipped partition and extract its keywords.
    ///
    /// `documents[i]` is the normalized text of document `i` and
    /// `reduced[i]` its reduced vector.
    ///
    /// # Errors
    /// Fails only on empty or inconsistent input and when the fallback run
    /// itself fails.
    pub fn select(&self, documents: &[String], reduced: &[Vec<f32>]) -> SelectionResult<ClusterModel> {
        if reduced.is_empty() {
            return Err(SelectionError::EmptyInput);
        }
        if documents.len() != reduced.len() {
            return Err(SelectionError::LengthMismatch {
                documents: documents.len(),
                vectors: reduced.len(),
            });
        }

        let candidates = self.evaluate_grid(reduced);
        let eligible = candidates.iter().filter_map(Candidate::score).count();
        debug!(candidates = candidates.len(), eligible, "Grid evaluated");
        for candidate in &candidates {
            match candidate {
                Candidate::Eligible {
                    min_cluster_size,
                    score,
                    assignment,
                } => debug!(
                    min_cluster_size,
                    score,
                    clusters = assignment.cluster_ids().len(),
                    "Eligible candidate"
                ),
                Candidate::Ineligible {
                    min_cluster_size,
                    reason,
                } => debug!(min_cluster_size, reason = reason.as_str(), "Ineligible candidate"),
                Candidate::Failed {
                    min_cluster_size,
                    error,
                } => warn!(min_cluster_size, error = error.as_str(), "Clusterer failed, skipping"),
            }
        }

        let (min_cluster_size, quality, assignment, origin) = match best_candidate(candidates) {
            Some((min_cluster_size, score, assignment)) => {
                info!(min_cluster_size, score, "Selected best-scoring partition");
                (min_cluster_size, Some(score), assignment, ModelOrigin::Selected)
            }
            None => {
                let fallback = self.config.min_cluster_size;
                warn!(min_cluster_size = fallback, "No eligible candidate, using fallback configuration");
                let labels = self
                    .clusterer
                    .cluster(reduced, fallback)
                    .map_err(|source| SelectionError::FallbackFailed {
                        min_cluster_size: fallback,
                        source,
                    })?;
                if labels.len() != reduced.len() {
                    return Err(SelectionError::LabelCountMismatch {
                        expected: reduced.len(),
                        found: labels.len(),
                    });
                }
                (fallback, None, ClusterAssignment::from_labels(labels), ModelOrigin::Fallback)
            }
        };

        let keywords = self.extractor.keywords(documents, &assignment);
        Ok(ClusterModel {
            assignment,
            keywords,
            min_cluster_size,
            quality,
            origin,
        })
    }
}

/// Highest-scoring eligible candidate; on equal scores the earlier one wins.
fn best_candidate(candidates: Vec<Candidate>) -> Option<(usize, f32, ClusterAssignment)> {
    candidates.into_iter().fold(None, |best, candidate| match candidate {
        Candidate::Eligible {
            min_cluster_size,
            score,
            assignment,
        } => match best {
            Some((_, best_score, _)) if score <= best_score => best,
            _ => Some((min_cluster_size, score, assignment)),
        },
        _ => best,
    })
}
