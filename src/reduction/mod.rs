//! Dimensionality reduction of embedding matrices.
//!
//! The pipeline clusters in a reduced space: the full embedding matrix is
//! handed to a [`Reducer`] once, with a fixed target dimension, neighbourhood
//! size, minimum distance and random seed so that runs are reproducible.

use rand::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::embedding::l2_normalize;

/// Errors returned by reducers.
#[derive(Debug, Error)]
pub enum ReductionError {
    /// Input matrix has no rows.
    #[error("empty input")]
    EmptyInput,

    /// Rows of the input matrix have different lengths.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected row length.
        expected: usize,
        /// Offending row length.
        found: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },
}

/// Result type for reduction operations.
pub type ReductionResult<T> = Result<T, ReductionError>;

/// Fixed parameters of the single reduction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionParams {
    /// Number of output columns
    pub target_dim: usize,

    /// Neighbourhood size for manifold reducers
    pub n_neighbors: usize,

    /// Minimum embedding distance for manifold reducers
    pub min_dist: f32,

    /// Random seed
    pub seed: u64,
}

impl Default for ReductionParams {
    fn default() -> Self {
        Self {
            target_dim: 50,
            n_neighbors: 15,
            min_dist: 0.0,
            seed: 42,
        }
    }
}

/// Common interface for dimensionality reducers.
pub trait Reducer: Send + Sync {
    /// Reduce `matrix` to `params.target_dim` columns, keeping row order.
    fn reduce(&self, matrix: &[Vec<f32>], params: &ReductionParams) -> ReductionResult<Vec<Vec<f32>>>;

    /// Human-readable backend name for logging.
    fn name(&self) -> &str;
}

/// Check that a matrix is non-empty and rectangular, returning its width.
pub(crate) fn check_matrix(matrix: &[Vec<f32>]) -> ReductionResult<usize> {
    let first = matrix.first().ok_or(ReductionError::EmptyInput)?;
    let d = first.len();
    if d == 0 {
        return Err(ReductionError::InvalidParameter {
            name: "dimension",
            message: "must be at least 1",
        });
    }
    for row in matrix.iter().skip(1) {
        if row.len() != d {
            return Err(ReductionError::DimensionMismatch {
                expected: d,
                found: row.len(),
            });
        }
    }
    Ok(d)
}

/// Seeded random projection.
///
/// Projects every row onto `target_dim` random unit directions drawn
/// uniformly from `[-1, 1]^d`. Angles between rows are approximately
/// preserved, which is what the cosine-based reassignment relies on.
/// `n_neighbors` and `min_dist` do not apply to a linear projection and are
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct RandomProjectionReducer;

impl RandomProjectionReducer {
    /// Create a new random projection reducer.
    pub fn new() -> Self {
        Self
    }

    fn projection_matrix(input_dim: usize, target_dim: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..target_dim)
            .map(|_| {
                let mut row: Vec<f32> = (0..input_dim)
                    .map(|_| rng.random::<f32>() * 2.0 - 1.0)
                    .collect();
                l2_normalize(&mut row);
                row
            })
            .collect()
    }
}

impl Reducer for RandomProjectionReducer {
    fn reduce(&self, matrix: &[Vec<f32>], params: &ReductionParams) -> ReductionResult<Vec<Vec<f32>>> {
        let d = check_matrix(matrix)?;
        if params.target_dim == 0 {
            return Err(ReductionError::InvalidParameter {
                name: "target_dim",
                message: "must be at least 1",
            });
        }

        let projection = Self::projection_matrix(d, params.target_dim, params.seed);
        Ok(matrix
            .iter()
            .map(|row| {
                projection
                    .iter()
                    .map(|dir| dir.iter().zip(row.iter()).map(|(a, b)| a * b).sum::<f32>())
                    .collect::<Vec<f32>>()
            })
            .collect())
    }

    fn name(&self) -> &str {
        "random-projection"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_matrix() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 0.0, 0.0, 0.5],
            vec![0.9, 0.1, 0.0, 0.4],
            vec![0.0, 1.0, 0.2, 0.0],
        ]
    }

    #[test]
    fn test_output_shape() {
        let params = ReductionParams {
            target_dim: 2,
            ..Default::default()
        };
        let reduced = RandomProjectionReducer::new()
            .reduce(&sample_matrix(), &params)
            .unwrap();

        assert_eq!(reduced.len(), 3, "Row count should be preserved");
        assert!(reduced.iter().all(|r| r.len() == 2), "Every row should have target_dim columns");
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let params = ReductionParams {
            target_dim: 3,
            ..Default::default()
        };
        let reducer = RandomProjectionReducer::new();
        let a = reducer.reduce(&sample_matrix(), &params).unwrap();
        let b = reducer.reduce(&sample_matrix(), &params).unwrap();
        assert_eq!(a, b, "Same seed should give identical projections");
    }

    #[test]
    fn test_different_seed_changes_projection() {
        let reducer = RandomProjectionReducer::new();
        let a = reducer
            .reduce(&sample_matrix(), &ReductionParams { target_dim: 3, seed: 1, ..Default::default() })
            .unwrap();
        let b = reducer
            .reduce(&sample_matrix(), &ReductionParams { target_dim: 3, seed: 2, ..Default::default() })
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_bad_input() {
        let reducer = RandomProjectionReducer::new();
        let params = ReductionParams::default();

        assert!(matches!(reducer.reduce(&[], &params), Err(ReductionError::EmptyInput)));

        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(matches!(
            reducer.reduce(&ragged, &params),
            Err(ReductionError::DimensionMismatch { expected: 2, found: 1 })
        ));

        let zero_dim = ReductionParams {
            target_dim: 0,
            ..Default::default()
        };
        assert!(matches!(
            reducer.reduce(&sample_matrix(), &zero_dim),
            Err(ReductionError::InvalidParameter { name: "target_dim", .. })
        ));
    }
}
