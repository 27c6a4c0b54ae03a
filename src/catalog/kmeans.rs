//! Deterministic k-means (Lloyd's algorithm).
//!
//! Initialization is a deterministic variant of k-means++: the first centroid
//! is the row at `seed % n`, every further centroid is the row farthest from
//! all centroids chosen so far (ties go to the lowest row index). The same
//! input and seed therefore always yield the same labels.

use crate::{Error, Result};

/// K-means configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeans {
    n_clusters: usize,
    max_iter: usize,
    tol: f64,
    seed: u64,
}

/// Output of a k-means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Final centroids, one per cluster.
    pub centroids: Vec<Vec<f64>>,
    /// Cluster label per input row, each in `[0, n_clusters)`.
    pub labels: Vec<usize>,
    /// Sum of squared distances from each row to its centroid.
    pub inertia: f64,
    /// Lloyd iterations performed.
    pub n_iter: usize,
}

impl KMeans {
    /// Creates a k-means model with the given number of clusters.
    #[must_use]
    pub const fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            seed: 42,
        }
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub const fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance on centroid movement.
    #[must_use]
    pub const fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the initialization seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Partitions `x` into `n_clusters` clusters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Data`] if `x` is empty, `n_clusters` is zero, or there
    /// are fewer rows than clusters.
    pub fn fit(&self, x: &[Vec<f64>]) -> Result<KMeansFit> {
        let n_samples = x.len();
        if n_samples == 0 {
            return Err(Error::Data("cannot cluster zero samples".to_string()));
        }
        if self.n_clusters == 0 {
            return Err(Error::Data("number of clusters must be at least 1".to_string()));
        }
        if n_samples < self.n_clusters {
            return Err(Error::Data(format!(
                "cannot form {} clusters from {n_samples} samples",
                self.n_clusters
            )));
        }

        let mut centroids = self.init_centroids(x);
        let mut labels = assign_labels(x, &centroids);
        let mut n_iter = 0;

        for iter in 0..self.max_iter {
            n_iter = iter + 1;
            let new_centroids = update_centroids(x, &labels, &centroids);
            let converged = self.converged(&centroids, &new_centroids);
            centroids = new_centroids;
            labels = assign_labels(x, &centroids);
            if converged {
                break;
            }
        }

        let inertia = x
            .iter()
            .zip(&labels)
            .map(|(row, &label)| squared_distance(row, &centroids[label]))
            .sum();

        Ok(KMeansFit {
            centroids,
            labels,
            inertia,
            n_iter,
        })
    }

    fn init_centroids(&self, x: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let n_samples = x.len();
        let first = u64::try_from(n_samples)
            .ok()
            .and_then(|n| usize::try_from(self.seed % n).ok())
            .unwrap_or(0);

        let mut centroids = Vec::with_capacity(self.n_clusters);
        centroids.push(x[first].clone());

        let mut min_distances: Vec<f64> = x.iter().map(|row| squared_distance(row, &x[first])).collect();

        while centroids.len() < self.n_clusters {
            let mut max_dist = f64::NEG_INFINITY;
            let mut max_idx = 0;
            for (i, &dist) in min_distances.iter().enumerate() {
                if dist > max_dist {
                    max_dist = dist;
                    max_idx = i;
                }
            }

            let next = x[max_idx].clone();
            for (row, min_dist) in x.iter().zip(min_distances.iter_mut()) {
                let dist = squared_distance(row, &next);
                if dist < *min_dist {
                    *min_dist = dist;
                }
            }
            centroids.push(next);
        }

        centroids
    }

    fn converged(&self, old: &[Vec<f64>], new: &[Vec<f64>]) -> bool {
        let tol_sq = self.tol * self.tol;
        old.iter()
            .zip(new)
            .all(|(a, b)| squared_distance(a, b) <= tol_sq)
    }
}

/// Assigns each row to its nearest centroid; ties go to the lower label.
fn assign_labels(x: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    x.iter()
        .map(|row| {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (k, centroid) in centroids.iter().enumerate() {
                let dist = squared_distance(row, centroid);
                if dist < best_dist {
                    best_dist = dist;
                    best = k;
                }
            }
            best
        })
        .collect()
}

/// Recomputes centroids as cluster means. Empty clusters keep their centroid.
fn update_centroids(x: &[Vec<f64>], labels: &[usize], previous: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let dims = previous.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dims]; previous.len()];
    let mut counts = vec![0u32; previous.len()];

    for (row, &label) in x.iter().zip(labels) {
        counts[label] = counts[label].saturating_add(1);
        for (s, v) in sums[label].iter_mut().zip(row) {
            *s += v;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), old)| {
            if count == 0 {
                old.clone()
            } else {
                let n = f64::from(count);
                sum.into_iter().map(|s| s / n).collect()
            }
        })
        .collect()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
