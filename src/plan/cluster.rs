//! Complete-linkage hierarchical clustering of candidate sites.
//!
//! Sites are clustered on raw `(latitude, longitude)` degrees with the
//! Euclidean metric, then cut into flat clusters at a fixed merge height.
//! The cut height is unrelated to the utilization threshold that selects
//! candidates.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::context::CancelToken;
use crate::error::PlanError;

/// Merge height (degrees) at or below which candidates share a flat cluster.
pub const CLUSTER_DISTANCE_CUTOFF: f64 = 0.01;

/// One merge of two clusters.
///
/// Ids below the observation count are observations; id `n + i` is the
/// cluster formed by merge `i`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    /// Complete-linkage distance between the merged clusters.
    pub distance: f64,
    /// Observations in the merged cluster.
    pub size: usize,
}

/// Merge list in linkage-matrix layout, ordered by height.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dendrogram {
    pub observations: usize,
    pub merges: Vec<Merge>,
}

impl Dendrogram {
    /// Flat cluster label per observation for a cut at `cutoff`.
    ///
    /// Observations joined at a height `<= cutoff` share a label. Labels are
    /// numbered from 0 in order of first appearance.
    pub fn cut(&self, cutoff: f64) -> Vec<usize> {
        let n = self.observations;
        let mut parent: Vec<usize> = (0..n + self.merges.len()).collect();
        for (i, m) in self.merges.iter().enumerate() {
            if m.distance <= cutoff {
                parent[m.left] = n + i;
                parent[m.right] = n + i;
            }
        }

        // parents always carry larger ids, so roots resolve from the top down
        let mut root = parent.clone();
        for id in (0..root.len()).rev() {
            if parent[id] != id {
                root[id] = root[parent[id]];
            }
        }

        let mut labels: HashMap<usize, usize> = HashMap::new();
        (0..n)
            .map(|obs| {
                let next = labels.len();
                *labels.entry(root[obs]).or_insert(next)
            })
            .collect()
    }
}

/// Builds the complete-linkage dendrogram of `points`.
///
/// Uses the nearest-neighbour chain algorithm on a dense distance matrix.
///
/// # Errors
///
/// - `PlanError::Clustering` if a coordinate is not finite.
/// - `PlanError::Cancelled` if `cancel` fires between merges.
pub fn complete_linkage(points: &[(f64, f64)], cancel: &CancelToken) -> Result<Dendrogram, PlanError> {
    let n = points.len();
    if let Some(i) = points.iter().position(|(a, b)| !(a.is_finite() && b.is_finite())) {
        return Err(PlanError::Clustering(format!(
            "candidate {i} has non-finite coordinates"
        )));
    }
    if n < 2 {
        return Ok(Dendrogram {
            observations: n,
            merges: Vec::new(),
        });
    }

    let mut dist = vec![0.0_f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = (points[i].0 - points[j].0).hypot(points[i].1 - points[j].1);
            dist[i * n + j] = d;
            dist[j * n + i] = d;
        }
    }

    let mut active = vec![true; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    // (slot_a, slot_b, height); the merged cluster keeps slot_b
    let mut raw: Vec<(usize, usize, f64)> = Vec::with_capacity(n - 1);

    for _ in 0..n - 1 {
        cancel.check("cluster merge")?;
        if chain.is_empty() {
            if let Some(first) = active.iter().position(|&a| a) {
                chain.push(first);
            }
        }

        let (a, b) = loop {
            let Some(&a) = chain.last() else {
                return Err(PlanError::Clustering("empty nearest-neighbour chain".into()));
            };
            let prev = chain.len().checked_sub(2).map(|k| chain[k]);
            let (mut best, mut best_d) = match prev {
                Some(p) => (p, dist[a * n + p]),
                None => (usize::MAX, f64::INFINITY),
            };
            for c in 0..n {
                if c != a && active[c] && dist[a * n + c] < best_d {
                    best = c;
                    best_d = dist[a * n + c];
                }
            }
            if best == usize::MAX {
                return Err(PlanError::Clustering("no active neighbour to merge".into()));
            }
            if Some(best) == prev {
                chain.truncate(chain.len() - 2);
                break (a, best);
            }
            chain.push(best);
        };

        raw.push((a, b, dist[a * n + b]));
        for c in 0..n {
            if active[c] && c != a && c != b {
                let d = dist[a * n + c].max(dist[b * n + c]);
                dist[b * n + c] = d;
                dist[c * n + b] = d;
            }
        }
        active[a] = false;
    }

    raw.sort_by(|x, y| x.2.total_cmp(&y.2));
    Ok(Dendrogram {
        observations: n,
        merges: relabel(n, &raw),
    })
}

/// Converts slot-indexed merges into linkage-matrix ids.
fn relabel(n: usize, raw: &[(usize, usize, f64)]) -> Vec<Merge> {
    // union-find over slots; each root remembers its current cluster id and size
    let mut parent: Vec<usize> = (0..n).collect();
    let mut cluster_id: Vec<usize> = (0..n).collect();
    let mut cluster_size = vec![1_usize; n];

    fn find(parent: &mut [usize], i: usize) -> usize {
        if parent[i] != i {
            parent[i] = find(parent, parent[i]);
        }
        parent[i]
    }

    raw.iter()
        .enumerate()
        .map(|(i, &(a, b, distance))| {
            let ra = find(&mut parent, a);
            let rb = find(&mut parent, b);
            let (ia, ib) = (cluster_id[ra], cluster_id[rb]);
            let size = cluster_size[ra] + cluster_size[rb];
            parent[ra] = rb;
            cluster_id[rb] = n + i;
            cluster_size[rb] = size;
            Merge {
                left: ia.min(ib),
                right: ia.max(ib),
                distance,
                size,
            }
        })
        .collect()
}

/// Flat cluster labels for `points` cut at `cutoff`, plus the dendrogram.
///
/// Zero or one point needs no merging: every point gets label 0.
///
/// # Errors
///
/// Same as [`complete_linkage`].
pub fn flat_clusters(
    points: &[(f64, f64)],
    cutoff: f64,
    cancel: &CancelToken,
) -> Result<(Vec<usize>, Dendrogram), PlanError> {
    let dendrogram = complete_linkage(points, cancel)?;
    let labels = dendrogram.cut(cutoff);
    debug!(
        points = points.len(),
        clusters = labels.iter().max().map_or(0, |m| m + 1),
        cutoff,
        "flat clusters cut"
    );
    Ok((labels, dendrogram))
}

/// Index of the first observation carrying each label, in index order.
pub fn representatives(labels: &[usize]) -> Vec<usize> {
    let mut seen: HashSet<usize> = HashSet::new();
    labels
        .iter()
        .enumerate()
        .filter_map(|(i, label)| seen.insert(*label).then_some(i))
        .collect()
}
