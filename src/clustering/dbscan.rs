//! DBSCAN clusterer backed by `linfa-clustering`.

use linfa::traits::Transformer;
use linfa_clustering::Dbscan;
use ndarray::Array2;
use tracing::debug;

use super::{check_matrix, euclidean_distance, ClusteringError, ClusteringResult, Clusterer};
use crate::models::ClusterId;

/// Smallest tolerance handed to DBSCAN; linfa rejects a zero tolerance.
const MIN_TOLERANCE: f64 = 1e-6;

/// How the DBSCAN neighbourhood radius is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tolerance {
    /// Fixed radius
    Fixed(f64),

    /// `q`-quantile of every point's distance to its `(min_cluster_size - 1)`-th
    /// nearest neighbour, recomputed for each `min_cluster_size`
    KnnQuantile(f64),
}

/// Density-based clusterer. Noise points come back as `None`.
#[derive(Debug, Clone)]
pub struct DensityClusterer {
    tolerance: Tolerance,
}

impl Default for DensityClusterer {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::KnnQuantile(0.5),
        }
    }
}

impl DensityClusterer {
    /// Create a clusterer with the given tolerance policy.
    pub fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    /// Radius used for a given matrix and `min_cluster_size`.
    fn radius(&self, matrix: &[Vec<f32>], min_cluster_size: usize) -> ClusteringResult<f64> {
        match self.tolerance {
            Tolerance::Fixed(eps) => {
                if !(eps.is_finite() && eps > 0.0) {
                    return Err(ClusteringError::InvalidParameter {
                        name: "tolerance",
                        message: format!("must be positive, got {}", eps),
                    });
                }
                Ok(eps)
            }
            Tolerance::KnnQuantile(q) => {
                if !(0.0..=1.0).contains(&q) {
                    return Err(ClusteringError::InvalidParameter {
                        name: "quantile",
                        message: format!("must be in [0, 1], got {}", q),
                    });
                }
                Ok(knn_quantile(matrix, min_cluster_size.saturating_sub(1).max(1), q).max(MIN_TOLERANCE))
            }
        }
    }
}

/// `q`-quantile over all points of the distance to the `k`-th nearest other point.
///
/// With fewer than `k + 1` points the farthest neighbour is used instead.
fn knn_quantile(matrix: &[Vec<f32>], k: usize, q: f64) -> f64 {
    let n = matrix.len();
    if n < 2 {
        return 0.0;
    }

    let mut kth: Vec<f64> = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut dists: Vec<f64> = matrix
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, other)| euclidean_distance(row, other) as f64)
                .collect();
            dists.sort_by(|a, b| a.total_cmp(b));
            dists[k.min(dists.len()) - 1]
        })
        .collect();
    kth.sort_by(|a, b| a.total_cmp(b));

    let position = ((kth.len() - 1) as f64 * q).round() as usize;
    kth[position]
}

impl Clusterer for DensityClusterer {
    fn cluster(&self, matrix: &[Vec<f32>], min_cluster_size: usize) -> ClusteringResult<Vec<Option<ClusterId>>> {
        let dim = check_matrix(matrix)?;
        if min_cluster_size < 2 {
            return Err(ClusteringError::InvalidParameter {
                name: "min_cluster_size",
                message: format!("must be at least 2, got {}", min_cluster_size),
            });
        }

        let eps = self.radius(matrix, min_cluster_size)?;
        debug!(min_cluster_size, eps, "Running DBSCAN");

        let mut data = Array2::<f64>::zeros((matrix.len(), dim));
        for (i, row) in matrix.iter().enumerate() {
            for (j, &val) in row.iter().enumerate() {
                data[[i, j]] = val as f64;
            }
        }

        let labels = Dbscan::params(min_cluster_size)
            .tolerance(eps)
            .transform(&data)
            .map_err(|e| ClusteringError::Backend(format!("DBSCAN failed: {}", e)))?;

        Ok(labels
            .iter()
            .map(|label| label.map(|id| ClusterId(id as u32)))
            .collect())
    }

    fn name(&self) -> &str {
        "dbscan"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<Vec<f32>> {
        let square = [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0), (0.5, 0.5)];
        let mut rows: Vec<Vec<f32>> = square.iter().map(|&(x, y)| vec![x, y]).collect();
        rows.extend(square.iter().map(|&(x, y)| vec![x + 100.0, y + 100.0]));
        rows.push(vec![500.0, -500.0]);
        rows
    }

    #[test]
    fn test_separates_blobs_and_marks_noise() {
        let clusterer = DensityClusterer::new(Tolerance::Fixed(1.5));
        let labels = clusterer.cluster(&two_blobs(), 3).unwrap();

        assert_eq!(labels.len(), 11, "One label per row");
        assert!(labels[0].is_some());
        assert!(labels[..5].iter().all(|l| *l == labels[0]));
        assert!(labels[5].is_some());
        assert!(labels[5..10].iter().all(|l| *l == labels[5]));
        assert_ne!(labels[0], labels[5], "Distant blobs should be separate clusters");
        assert_eq!(labels[10], None, "Isolated point should be noise");
    }

    #[test]
    fn test_knn_quantile_radius() {
        let clusterer = DensityClusterer::default();
        let labels = clusterer.cluster(&two_blobs(), 3).unwrap();
        assert_eq!(labels[10], None, "Isolated point should stay noise with a derived radius");
        assert!(labels[4].is_some() && labels[9].is_some(), "Blob centres should be core points");
        assert_ne!(labels[4], labels[9]);
    }

    #[test]
    fn test_knn_quantile_values() {
        let matrix = vec![vec![0.0], vec![1.0], vec![3.0]];
        // Nearest-neighbour distances: 1, 1, 2
        assert!((knn_quantile(&matrix, 1, 0.5) - 1.0).abs() < 1e-9);
        assert!((knn_quantile(&matrix, 1, 1.0) - 2.0).abs() < 1e-9);
        assert_eq!(knn_quantile(&[vec![1.0]], 1, 0.5), 0.0);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        let clusterer = DensityClusterer::default();
        assert!(matches!(
            clusterer.cluster(&two_blobs(), 1),
            Err(ClusteringError::InvalidParameter { name: "min_cluster_size", .. })
        ));
        assert!(matches!(clusterer.cluster(&[], 3), Err(ClusteringError::EmptyInput)));

        let fixed = DensityClusterer::new(Tolerance::Fixed(0.0));
        assert!(matches!(
            fixed.cluster(&two_blobs(), 3),
            Err(ClusteringError::InvalidParameter { name: "tolerance", .. })
        ));
    }
}
