// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! BIRCH: a clustering-feature tree followed by Ward agglomeration of the
//! leaf subcluster centroids.
//!
//! Points are inserted one at a time. A point merges into the closest leaf
//! subcluster when the merged subcluster's radius stays within the
//! threshold; otherwise it opens a new subcluster. A node holding more than
//! `branching_factor` subclusters is split around its farthest pair of
//! centroids, and splits propagate upward to the root.

use crate::linalg::{nearest_row, squared_euclidean};
use clustbench_core::{BenchError, Clusterer, DatasetView, RandomState};

/// Branching factors swept by the `birch` family, in enumeration order.
pub const BIRCH_BRANCHING_FACTORS: [usize; 3] = [10, 50, 100];

/// Thresholds swept by the `birch` family, in enumeration order.
pub const BIRCH_THRESHOLDS: [f64; 8] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];

/// One cell of the `birch` grid.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BirchParams {
    /// Maximum subclusters per node.
    pub branching_factor: usize,
    /// Maximum radius of a leaf subcluster after a merge.
    pub threshold: f64,
}

impl Default for BirchParams {
    fn default() -> Self {
        Self {
            branching_factor: 50,
            threshold: 0.5,
        }
    }
}

impl From<(usize, f64)> for BirchParams {
    fn from((branching_factor, threshold): (usize, f64)) -> Self {
        Self {
            branching_factor,
            threshold,
        }
    }
}

impl BirchParams {
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.branching_factor < 2 {
            return Err(BenchError::invalid_input(format!(
                "BirchParams.branching_factor must be >= 2; got {}",
                self.branching_factor
            )));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(BenchError::invalid_input(format!(
                "BirchParams.threshold must be finite and > 0; got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// The `birch` family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Birch;

impl Clusterer for Birch {
    type Params = BirchParams;

    fn name(&self) -> &'static str {
        "birch"
    }

    fn fit_predict(
        &self,
        data: &DatasetView<'_>,
        n_clusters: usize,
        params: &Self::Params,
        _rng: &mut RandomState,
    ) -> Result<Vec<usize>, BenchError> {
        params.validate()?;
        if n_clusters == 0 {
            return Err(BenchError::invalid_input("n_clusters must be >= 1"));
        }

        let tree = CfTree::build(data, *params);
        let d = data.d();
        let centroids: Vec<f64> = tree
            .leaf_subclusters()
            .flat_map(|sub| sub.centroid.iter().copied())
            .collect();
        let m = centroids.len() / d;
        if m < n_clusters {
            tracing::debug!(
                subclusters = m,
                n_clusters,
                threshold = params.threshold,
                "fewer subclusters than requested clusters"
            );
        }

        let subcluster_labels = ward_labels(&centroids, m, d, n_clusters);
        Ok(data
            .rows()
            .map(|row| subcluster_labels[nearest_row(row, &centroids, d).0])
            .collect())
    }
}

/// Clustering feature of a group of points, optionally owning a child node.
#[derive(Clone, Debug, PartialEq)]
struct Subcluster {
    n: usize,
    linear_sum: Vec<f64>,
    squared_sum: f64,
    centroid: Vec<f64>,
    sq_norm: f64,
    child: Option<usize>,
}

impl Subcluster {
    fn empty(d: usize, child: Option<usize>) -> Self {
        Self {
            n: 0,
            linear_sum: vec![0.0; d],
            squared_sum: 0.0,
            centroid: vec![0.0; d],
            sq_norm: 0.0,
            child,
        }
    }

    fn from_point(point: &[f64]) -> Self {
        let sq_norm = point.iter().map(|v| v * v).sum();
        Self {
            n: 1,
            linear_sum: point.to_vec(),
            squared_sum: sq_norm,
            centroid: point.to_vec(),
            sq_norm,
            child: None,
        }
    }

    fn absorb(&mut self, other: &Subcluster) {
        self.n += other.n;
        for (sum, value) in self.linear_sum.iter_mut().zip(&other.linear_sum) {
            *sum += value;
        }
        self.squared_sum += other.squared_sum;
        let n = self.n as f64;
        for (c, sum) in self.centroid.iter_mut().zip(&self.linear_sum) {
            *c = sum / n;
        }
        self.sq_norm = self.centroid.iter().map(|v| v * v).sum();
    }

    /// Absorbs `other` when the merged radius stays within `threshold`.
    fn try_merge(&mut self, other: &Subcluster, threshold: f64) -> bool {
        let n = (self.n + other.n) as f64;
        let centroid: Vec<f64> = self
            .linear_sum
            .iter()
            .zip(&other.linear_sum)
            .map(|(a, b)| (a + b) / n)
            .collect();
        let sq_norm: f64 = centroid.iter().map(|v| v * v).sum();
        let sq_radius = (self.squared_sum + other.squared_sum) / n - sq_norm;
        if sq_radius <= threshold * threshold {
            self.absorb(other);
            true
        } else {
            false
        }
    }
}

#[derive(Clone, Debug)]
struct Node {
    is_leaf: bool,
    subclusters: Vec<Subcluster>,
}

/// Arena-backed CF-tree.
#[derive(Clone, Debug)]
struct CfTree {
    nodes: Vec<Node>,
    root: usize,
    params: BirchParams,
}

impl CfTree {
    fn build(data: &DatasetView<'_>, params: BirchParams) -> Self {
        let mut tree = Self {
            nodes: vec![Node {
                is_leaf: true,
                subclusters: Vec::new(),
            }],
            root: 0,
            params,
        };
        for row in data.rows() {
            if tree.insert(tree.root, Subcluster::from_point(row)) {
                let (left, right) = tree.split(tree.root);
                tree.nodes.push(Node {
                    is_leaf: false,
                    subclusters: vec![left, right],
                });
                tree.root = tree.nodes.len() - 1;
            }
        }
        tree
    }

    /// Inserts `sub` below `node`; returns true when `node` overflowed and
    /// must be split by its parent.
    fn insert(&mut self, node: usize, sub: Subcluster) -> bool {
        let branching_factor = self.params.branching_factor;
        let closest = {
            let subclusters = &self.nodes[node].subclusters;
            if subclusters.is_empty() {
                self.nodes[node].subclusters.push(sub);
                return false;
            }
            closest_subcluster(subclusters, &sub.centroid)
        };

        match self.nodes[node].subclusters[closest].child {
            Some(child) => {
                if !self.insert(child, sub.clone()) {
                    self.nodes[node].subclusters[closest].absorb(&sub);
                    return false;
                }
                let (left, right) = self.split(child);
                let subclusters = &mut self.nodes[node].subclusters;
                subclusters[closest] = left;
                subclusters.push(right);
                subclusters.len() > branching_factor
            }
            None => {
                let threshold = self.params.threshold;
                if self.nodes[node].subclusters[closest].try_merge(&sub, threshold) {
                    return false;
                }
                let subclusters = &mut self.nodes[node].subclusters;
                subclusters.push(sub);
                subclusters.len() > branching_factor
            }
        }
    }

    /// Splits `node` in two around its farthest pair of centroids. `node`
    /// keeps the first half; a new node receives the second.
    fn split(&mut self, node: usize) -> (Subcluster, Subcluster) {
        let is_leaf = self.nodes[node].is_leaf;
        let subclusters = std::mem::take(&mut self.nodes[node].subclusters);
        let d = subclusters
            .first()
            .map_or(0, |sub| sub.centroid.len());

        let mut farthest = (0, 0, f64::NEG_INFINITY);
        for (i, a) in subclusters.iter().enumerate() {
            for (j, b) in subclusters.iter().enumerate() {
                let dist = squared_euclidean(&a.centroid, &b.centroid);
                if dist > farthest.2 {
                    farthest = (i, j, dist);
                }
            }
        }
        let first_pole = subclusters[farthest.0].centroid.clone();
        let second_pole = subclusters[farthest.1].centroid.clone();

        let sibling = self.nodes.len();
        self.nodes.push(Node {
            is_leaf,
            subclusters: Vec::new(),
        });
        let mut left = Subcluster::empty(d, Some(node));
        let mut right = Subcluster::empty(d, Some(sibling));
        for (idx, sub) in subclusters.into_iter().enumerate() {
            let to_first = squared_euclidean(&sub.centroid, &first_pole);
            let to_second = squared_euclidean(&sub.centroid, &second_pole);
            if idx == farthest.0 || to_first < to_second {
                left.absorb(&sub);
                self.nodes[node].subclusters.push(sub);
            } else {
                right.absorb(&sub);
                self.nodes[sibling].subclusters.push(sub);
            }
        }
        (left, right)
    }

    /// Leaf subclusters in depth-first order.
    fn leaf_subclusters(&self) -> impl Iterator<Item = &Subcluster> + '_ {
        let mut stack = vec![self.root];
        let mut leaves = Vec::new();
        while let Some(node) = stack.pop() {
            let node = &self.nodes[node];
            if node.is_leaf {
                leaves.extend(node.subclusters.iter());
            } else {
                stack.extend(node.subclusters.iter().rev().filter_map(|sub| sub.child));
            }
        }
        leaves.into_iter()
    }
}

fn closest_subcluster(subclusters: &[Subcluster], centroid: &[f64]) -> usize {
    let mut best = (0, f64::INFINITY);
    for (idx, sub) in subclusters.iter().enumerate() {
        let dist = squared_euclidean(&sub.centroid, centroid);
        if dist < best.1 {
            best = (idx, dist);
        }
    }
    best.0
}

/// Ward agglomeration of `m` centroids into `k` groups with the
/// nearest-neighbor chain. Labels follow first appearance.
fn ward_labels(centroids: &[f64], m: usize, d: usize, k: usize) -> Vec<usize> {
    if k >= m {
        return (0..m).collect();
    }

    let mut dist = vec![0.0; m * m];
    for i in 0..m {
        for j in (i + 1)..m {
            let value =
                squared_euclidean(&centroids[i * d..(i + 1) * d], &centroids[j * d..(j + 1) * d]);
            dist[i * m + j] = value;
            dist[j * m + i] = value;
        }
    }
    let mut size = vec![1usize; m];
    let mut active = vec![true; m];
    let mut merges: Vec<(f64, usize, usize)> = Vec::with_capacity(m - 1);
    let mut chain: Vec<usize> = Vec::with_capacity(m);

    while merges.len() < m - 1 {
        if chain.is_empty() {
            match active.iter().position(|&is_active| is_active) {
                Some(start) => chain.push(start),
                None => break,
            }
        }
        loop {
            let tip = chain[chain.len() - 1];
            let previous = chain.len().checked_sub(2).map(|idx| chain[idx]);
            let mut nearest = previous;
            let mut nearest_dist = previous.map_or(f64::INFINITY, |p| dist[tip * m + p]);
            for candidate in 0..m {
                if candidate != tip && active[candidate] && dist[tip * m + candidate] < nearest_dist
                {
                    nearest = Some(candidate);
                    nearest_dist = dist[tip * m + candidate];
                }
            }
            match nearest {
                Some(next) if Some(next) == previous => break,
                Some(next) => chain.push(next),
                None => break,
            }
        }

        let (Some(b), Some(a)) = (chain.pop(), chain.pop()) else {
            break;
        };
        let height = dist[a * m + b];
        let (keep, dropped) = (a.min(b), a.max(b));
        let (size_a, size_b) = (size[a] as f64, size[b] as f64);
        for w in 0..m {
            if !active[w] || w == a || w == b {
                continue;
            }
            let size_w = size[w] as f64;
            let updated = ((size_a + size_w) * dist[a * m + w] + (size_b + size_w) * dist[b * m + w]
                - size_w * height)
                / (size_a + size_b + size_w);
            dist[keep * m + w] = updated;
            dist[w * m + keep] = updated;
        }
        active[dropped] = false;
        size[keep] = size[a] + size[b];
        merges.push((height, a, b));
    }

    merges.sort_by(|x, y| x.0.total_cmp(&y.0));
    let mut parent: Vec<usize> = (0..m).collect();
    for &(_, a, b) in merges.iter().take(m - k) {
        let (root_a, root_b) = (find(&mut parent, a), find(&mut parent, b));
        parent[root_a.max(root_b)] = root_a.min(root_b);
    }

    let mut label_of_root = vec![usize::MAX; m];
    let mut next = 0;
    (0..m)
        .map(|i| {
            let root = find(&mut parent, i);
            if label_of_root[root] == usize::MAX {
                label_of_root[root] = next;
                next += 1;
            }
            label_of_root[root]
        })
        .collect()
}

fn find(parent: &mut [usize], mut node: usize) -> usize {
    while parent[node] != node {
        parent[node] = parent[parent[node]];
        node = parent[node];
    }
    node
}
