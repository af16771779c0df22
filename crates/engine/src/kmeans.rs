//! Seeded k-means over feature matrices.
//!
//! Lloyd's algorithm with k-means++ initialisation. All randomness flows
//! from one caller-supplied seed, so a fixed (input, k, seed) triple always
//! reproduces the same grouping. Labels themselves stay arbitrary: nothing
//! matches centroids across runs.

use crate::error::{EngineError, Result};
use features::FeatureMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, instrument};

pub const DEFAULT_MAX_ITER: usize = 300;
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// K-means configuration and runner.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    seed: u64,
    max_iter: usize,
    tolerance: f64,
}

/// Result of a k-means fit.
#[derive(Debug, Clone)]
pub struct KMeansFit {
    /// Cluster index per input row, each in `[0, k)`.
    pub labels: Vec<usize>,
    /// Final centroids, one per cluster.
    pub centroids: Vec<Vec<f64>>,
    /// Within-cluster sum of squared distances.
    pub inertia: f64,
    /// Iterations actually run before convergence or the cap.
    pub n_iter: usize,
}

impl KMeans {
    /// Both `k` and `seed` are required at the call site; this crate bakes
    /// in no cluster-count default.
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            seed,
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Fit over the rows of `data`.
    #[instrument(skip(self, data), fields(rows = data.rows(), k = self.k))]
    pub fn fit(&self, data: &FeatureMatrix) -> Result<KMeansFit> {
        let n = data.rows();
        if self.k == 0 || n < self.k {
            return Err(EngineError::InsufficientData {
                needed: self.k.max(1),
                found: n,
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = self.init_plus_plus(data, &mut rng);
        let mut labels = vec![0usize; n];
        let mut n_iter = 0;

        for iter in 0..self.max_iter {
            n_iter = iter + 1;
            labels = assign_labels(data, &centroids);
            let new_centroids = update_centroids(data, &labels, &centroids, self.k);

            let shift = max_centroid_shift(&centroids, &new_centroids);
            centroids = new_centroids;
            if shift <= self.tolerance * self.tolerance {
                break;
            }
        }

        let inertia: f64 = labels
            .iter()
            .enumerate()
            .map(|(i, &label)| squared_distance(data.row(i), &centroids[label]))
            .sum();

        debug!(n_iter, inertia, "k-means converged");

        Ok(KMeansFit {
            labels,
            centroids,
            inertia,
            n_iter,
        })
    }

    /// K-means++ seeding: first centroid uniform, each next one sampled with
    /// probability proportional to its squared distance from the nearest
    /// centroid chosen so far.
    fn init_plus_plus(&self, data: &FeatureMatrix, rng: &mut StdRng) -> Vec<Vec<f64>> {
        let n = data.rows();
        let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(self.k);
        centroids.push(data.row(rng.random_range(0..n)).to_vec());

        while centroids.len() < self.k {
            let distances: Vec<f64> = (0..n)
                .map(|i| {
                    centroids
                        .iter()
                        .map(|c| squared_distance(data.row(i), c))
                        .fold(f64::INFINITY, f64::min)
                })
                .collect();

            let total: f64 = distances.iter().sum();
            let next = if total > 0.0 {
                let mut threshold = rng.random_range(0.0..total);
                let mut chosen = n - 1;
                for (i, &d) in distances.iter().enumerate() {
                    if threshold < d {
                        chosen = i;
                        break;
                    }
                    threshold -= d;
                }
                chosen
            } else {
                // Every remaining point coincides with a centroid
                rng.random_range(0..n)
            };
            centroids.push(data.row(next).to_vec());
        }

        centroids
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Nearest centroid per row; ties go to the lower cluster index.
fn assign_labels(data: &FeatureMatrix, centroids: &[Vec<f64>]) -> Vec<usize> {
    (0..data.rows())
        .into_par_iter()
        .map(|i| {
            let row = data.row(i);
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (label, centroid) in centroids.iter().enumerate() {
                let dist = squared_distance(row, centroid);
                if dist < best_dist {
                    best_dist = dist;
                    best = label;
                }
            }
            best
        })
        .collect()
}

/// Mean of each cluster's members. A cluster that lost all its members keeps
/// its previous centroid instead of collapsing to the origin.
fn update_centroids(
    data: &FeatureMatrix,
    labels: &[usize],
    previous: &[Vec<f64>],
    k: usize,
) -> Vec<Vec<f64>> {
    let cols = data.cols();
    let mut sums = vec![vec![0.0f64; cols]; k];
    let mut counts = vec![0usize; k];

    for (i, &label) in labels.iter().enumerate() {
        counts[label] += 1;
        for (j, value) in data.row(i).iter().enumerate() {
            sums[label][j] += value;
        }
    }

    sums.into_iter()
        .zip(counts)
        .enumerate()
        .map(|(label, (sum, count))| {
            if count > 0 {
                sum.into_iter().map(|v| v / count as f64).collect()
            } else {
                previous[label].clone()
            }
        })
        .collect()
}

fn max_centroid_shift(old: &[Vec<f64>], new: &[Vec<f64>]) -> f64 {
    old.iter()
        .zip(new)
        .map(|(a, b)| squared_distance(a, b))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two tight blobs far apart in 2D.
    fn blobs() -> FeatureMatrix {
        let points = [
            [0.0, 0.1],
            [0.1, 0.0],
            [0.0, 0.0],
            [10.0, 10.1],
            [10.1, 10.0],
            [10.0, 10.0],
        ];
        let mut m = FeatureMatrix::zeros(points.len(), 2);
        for (i, p) in points.iter().enumerate() {
            m.row_mut(i).copy_from_slice(p);
        }
        m
    }

    #[test]
    fn test_two_blobs_separate_cleanly() {
        let fit = KMeans::new(2, 42).fit(&blobs()).unwrap();

        assert_eq!(fit.labels.len(), 6);
        assert!(fit.labels.iter().all(|&l| l < 2));

        // First three rows together, last three together, across the split
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[1], fit.labels[2]);
        assert_eq!(fit.labels[3], fit.labels[4]);
        assert_eq!(fit.labels[4], fit.labels[5]);
        assert_ne!(fit.labels[0], fit.labels[3]);

        assert!(fit.inertia < 0.1);
    }

    #[test]
    fn test_same_seed_reproduces_labels() {
        let data = blobs();
        let a = KMeans::new(2, 7).fit(&data).unwrap();
        let b = KMeans::new(2, 7).fit(&data).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.centroids, b.centroids);
    }

    #[test]
    fn test_k_one_groups_everything() {
        let fit = KMeans::new(1, 0).fit(&blobs()).unwrap();
        assert!(fit.labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_k_equal_to_rows_isolates_every_point() {
        let fit = KMeans::new(6, 3).fit(&blobs()).unwrap();
        let mut labels = fit.labels.clone();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), 6);
        assert!(fit.inertia < 1e-12);
    }

    #[test]
    fn test_more_clusters_than_rows_is_reported() {
        let result = KMeans::new(7, 42).fit(&blobs());
        assert!(matches!(
            result,
            Err(EngineError::InsufficientData { needed: 7, found: 6 })
        ));
    }

    #[test]
    fn test_zero_k_is_rejected() {
        let result = KMeans::new(0, 42).fit(&blobs());
        assert!(matches!(result, Err(EngineError::InsufficientData { .. })));
    }

    #[test]
    fn test_duplicate_points_do_not_panic() {
        let mut m = FeatureMatrix::zeros(5, 2);
        for i in 0..5 {
            m.row_mut(i).copy_from_slice(&[1.0, 1.0]);
        }
        let fit = KMeans::new(3, 42).fit(&m).unwrap();
        assert_eq!(fit.labels.len(), 5);
        assert!(fit.inertia < 1e-12);
    }
}
