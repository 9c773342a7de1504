//! Outlier reassignment.
//!
//! Every unclustered document is moved to the cluster whose centroid (mean
//! of the members' reduced vectors) is most cosine-similar to it. This is a
//! single pass: centroids are computed once from the partition as it stands,
//! and documents that cannot be placed because no centroid exists stay
//! unclustered and are reported as unresolved.
//!
//! Centroids are visited in ascending [`ClusterId`] order and a later
//! centroid only wins on a strictly greater similarity, so exact ties go to
//! the lowest cluster id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clustering::{cosine_similarity, KeywordExtractor};
use crate::models::{ClusterAssignment, ClusterId, ClusterModel};

/// Centroids stored as rows of one dense buffer.
#[derive(Debug, Clone)]
pub struct CentroidArena {
    dim: usize,
    ids: Vec<ClusterId>,
    data: Vec<f32>,
    members: BTreeMap<ClusterId, Vec<usize>>,
}

impl CentroidArena {
    /// Compute the centroid of every non-empty cluster of `assignment`.
    ///
    /// `vectors[i]` is the reduced vector of document `i`; documents beyond
    /// the end of `vectors` are ignored.
    pub fn build(assignment: &ClusterAssignment, vectors: &[Vec<f32>]) -> Self {
        let dim = vectors.first().map(Vec::len).unwrap_or(0);
        let members: BTreeMap<ClusterId, Vec<usize>> = assignment
            .members_by_cluster()
            .into_iter()
            .map(|(id, rows)| (id, rows.into_iter().filter(|&i| i < vectors.len()).collect::<Vec<_>>()))
            .filter(|(_, rows)| !rows.is_empty())
            .collect();

        let mut ids = Vec::with_capacity(members.len());
        let mut data = Vec::with_capacity(members.len() * dim);
        for (id, rows) in &members {
            let mut centroid = vec![0.0f32; dim];
            for &i in rows {
                for (c, v) in centroid.iter_mut().zip(&vectors[i]) {
                    *c += v;
                }
            }
            let count = rows.len() as f32;
            centroid.iter_mut().for_each(|c| *c /= count);

            ids.push(*id);
            data.extend(centroid);
        }

        Self { dim, ids, data, members }
    }

    /// Number of centroids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no centroid exists.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Centroid of one cluster.
    pub fn centroid(&self, cluster: ClusterId) -> Option<&[f32]> {
        let row = self.ids.binary_search(&cluster).ok()?;
        Some(&self.data[row * self.dim..(row + 1) * self.dim])
    }

    /// Member rows of one cluster, as used for its centroid.
    pub fn members(&self, cluster: ClusterId) -> &[usize] {
        self.members.get(&cluster).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cluster whose centroid is most cosine-similar to `vector`.
    ///
    /// Ties go to the lowest cluster id. NaN similarities never win; `None`
    /// when the arena is empty or every similarity is NaN.
    pub fn nearest(&self, vector: &[f32]) -> Option<(ClusterId, f32)> {
        let mut best: Option<(ClusterId, f32)> = None;
        for (row, id) in self.ids.iter().enumerate() {
            let centroid = &self.data[row * self.dim..(row + 1) * self.dim];
            let similarity = cosine_similarity(vector, centroid);
            if similarity.is_nan() {
                continue;
            }
            match best {
                Some((_, best_similarity)) if similarity <= best_similarity => {}
                _ => best = Some((*id, similarity)),
            }
        }
        best
    }
}

/// Counts produced by one reassignment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentOutcome {
    /// Documents moved into a cluster
    pub reassigned: usize,

    /// Documents left unclustered because no centroid existed
    pub unresolved: usize,
}

/// Assign every unclustered document of `model` to its nearest centroid.
///
/// When anything moved, the model's keyword lists are recomputed over the
/// updated assignment with `extractor`. Running this twice is a no-op the
/// second time.
///
/// # Arguments
/// * `model` - Selected partition, updated in place
/// * `documents` - Normalized document texts, for the keyword refresh
/// * `reduced` - Reduced vectors, same order as `documents`
/// * `extractor` - Keyword extractor used for the refresh
pub fn reassign_outliers(
    model: &mut ClusterModel,
    documents: &[String],
    reduced: &[Vec<f32>],
    extractor: &dyn KeywordExtractor,
) -> ReassignmentOutcome {
    let outliers = model.assignment.outlier_indices();
    if outliers.is_empty() {
        debug!("No outliers to reassign");
        return ReassignmentOutcome::default();
    }

    let arena = CentroidArena::build(&model.assignment, reduced);
    if arena.is_empty() {
        warn!(unresolved = outliers.len(), "No centroids exist, outliers stay unclustered");
        return ReassignmentOutcome {
            reassigned: 0,
            unresolved: outliers.len(),
        };
    }

    let mut reassigned = 0;
    let mut unresolved = 0;
    for &i in &outliers {
        match reduced.get(i).and_then(|v| arena.nearest(v)) {
            Some((cluster, similarity)) => {
                debug!(
                    document = i,
                    cluster = cluster.0,
                    cluster_size = arena.members(cluster).len(),
                    similarity,
                    "Reassigned outlier"
                );
                model.assignment.assign(i, cluster);
                reassigned += 1;
            }
            None => unresolved += 1,
        }
    }

    if reassigned > 0 {
        model.keywords = extractor.keywords(documents, &model.assignment);
    }

    info!(reassigned, unresolved, clusters = arena.len(), "Outlier reassignment complete");
    ReassignmentOutcome { reassigned, unresolved }
}
