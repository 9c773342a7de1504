//! Mean silhouette coefficient.

use std::collections::BTreeMap;

use super::{check_matrix, euclidean_distance, ClusteringError, ClusteringResult, QualityScorer};
use crate::models::{ClusterAssignment, ClusterId};

/// Mean Euclidean silhouette over all documents.
///
/// Points in singleton clusters score 0. The partition must contain between
/// 2 and `n - 1` distinct clusters and no unclustered documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilhouetteScorer;

impl SilhouetteScorer {
    /// Create a new silhouette scorer.
    pub fn new() -> Self {
        Self
    }
}

impl QualityScorer for SilhouetteScorer {
    fn score(&self, matrix: &[Vec<f32>], assignment: &ClusterAssignment) -> ClusteringResult<f32> {
        check_matrix(matrix)?;
        let n = matrix.len();
        if assignment.len() != n {
            return Err(ClusteringError::DimensionMismatch {
                expected: n,
                found: assignment.len(),
            });
        }

        let outliers = assignment.outlier_count();
        if outliers > 0 {
            return Err(ClusteringError::Ineligible(format!("{} unclustered documents", outliers)));
        }

        let groups: BTreeMap<ClusterId, Vec<usize>> = assignment.members_by_cluster();
        if groups.len() < 2 || groups.len() > n - 1 {
            return Err(ClusteringError::Ineligible(format!(
                "{} clusters for {} documents",
                groups.len(),
                n
            )));
        }

        let mut total = 0.0f64;
        for (i, row) in matrix.iter().enumerate() {
            let Some(own) = assignment.get(i) else {
                continue;
            };

            let mut a = 0.0f64;
            let mut b = f64::INFINITY;
            for (cluster, members) in &groups {
                let dist_sum: f64 = members
                    .iter()
                    .filter(|&&j| j != i)
                    .map(|&j| euclidean_distance(row, &matrix[j]) as f64)
                    .sum();

                if *cluster == own {
                    if members.len() == 1 {
                        a = f64::NAN;
                    } else {
                        a = dist_sum / (members.len() - 1) as f64;
                    }
                } else {
                    b = b.min(dist_sum / members.len() as f64);
                }
            }

            // Singleton clusters contribute 0
            if a.is_nan() {
                continue;
            }
            let denom = a.max(b);
            if denom > 0.0 {
                total += (b - a) / denom;
            }
        }

        Ok((total / n as f64) as f32)
    }
}
