//! K-means grouping of places by their mobility profile.
//!
//! Rows are eligible when every selected feature is present. Features are
//! standardized (zero mean, unit population variance) before partitioning,
//! and the partition is fully determined by the seed.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::filter::FilteredView;
use super::model::Category;
use super::outcome::{EmptyReason, Outcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    pub k: usize,
    pub seed: u64,
    pub features: Vec<Category>,
    pub max_iter: usize,
    /// Independent seeded restarts; the lowest-inertia run wins.
    pub restarts: usize,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            k: 3,
            seed: 42,
            features: Category::ALL.to_vec(),
            max_iter: 300,
            restarts: 10,
        }
    }
}

const TOLERANCE: f64 = 1e-4;

/// Cluster id per dataset row, plus the fitted model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAssignment {
    pub features: Vec<Category>,
    /// Clusters actually used (lower than requested when rows are scarce).
    pub k: usize,
    /// Dataset record index → cluster id in `[0, k)`.
    pub labels: BTreeMap<usize, usize>,
    /// Centroids in standardized feature space.
    pub centroids: Vec<Vec<f64>>,
    pub inertia: f64,
}

impl ClusterAssignment {
    pub fn label_of(&self, record_index: usize) -> Option<usize> {
        self.labels.get(&record_index).copied()
    }

    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &c in self.labels.values() {
            sizes[c] += 1;
        }
        sizes
    }
}

/// Cluster the rows of `view` that have every selected feature.
pub fn cluster(view: &FilteredView<'_>, settings: &ClusterSettings) -> Outcome<ClusterAssignment> {
    let features = &settings.features;
    let (indices, mut matrix): (Vec<usize>, Vec<Vec<f64>>) = view
        .iter()
        .filter_map(|(i, rec)| {
            let row: Option<Vec<f64>> = features.iter().map(|f| rec.value(*f)).collect();
            row.map(|r| (i, r))
        })
        .unzip();

    if matrix.is_empty() || features.is_empty() || settings.k == 0 {
        log::warn!(
            "No clustering input: {} rows in view, none complete across {} features",
            view.len(),
            features.len()
        );
        return Outcome::Empty(EmptyReason::NoClusterRows);
    }

    standardize(&mut matrix);

    let k = settings.k.min(matrix.len());
    if k < settings.k {
        log::info!("Only {} eligible rows, clustering with k={k}", matrix.len());
    }

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut best: Option<(Vec<usize>, Vec<Vec<f64>>, f64)> = None;
    for _ in 0..settings.restarts.max(1) {
        let run = kmeans(&matrix, k, settings.max_iter, &mut rng);
        if best.as_ref().map_or(true, |(_, _, inertia)| run.2 < *inertia) {
            best = Some(run);
        }
    }

    let Some((assignment, centroids, inertia)) = best else {
        return Outcome::Empty(EmptyReason::NoClusterRows);
    };

    log::debug!("k-means on {} rows: inertia {inertia:.3}", matrix.len());

    Outcome::Ready(ClusterAssignment {
        features: features.clone(),
        k,
        labels: indices.into_iter().zip(assignment).collect(),
        centroids,
        inertia,
    })
}

/// Centre and scale every column in place.
///
/// A constant column is centred only (scale 1).
pub fn standardize(matrix: &mut [Vec<f64>]) {
    let Some(width) = matrix.first().map(Vec::len) else {
        return;
    };
    let n = matrix.len() as f64;
    for col in 0..width {
        let mean = matrix.iter().map(|r| r[col]).sum::<f64>() / n;
        let var = matrix.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        let scale = if std > f64::EPSILON { std } else { 1.0 };
        for row in matrix.iter_mut() {
            row[col] = (row[col] - mean) / scale;
        }
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(point, centroid);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

/// k-means++ seeding.
fn init_centroids(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = vec![points[rng.gen_range(0..points.len())].clone()];
    let mut dist: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = dist.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = points.len() - 1;
            for (i, d) in dist.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // Every point coincides with a centroid already.
            rng.gen_range(0..points.len())
        };
        centroids.push(points[next].clone());
        for (d, p) in dist.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &centroids[centroids.len() - 1]));
        }
    }
    centroids
}

/// One Lloyd run. Returns (labels, centroids, inertia).
fn kmeans(
    points: &[Vec<f64>],
    k: usize,
    max_iter: usize,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<Vec<f64>>, f64) {
    let width = points[0].len();
    let mut centroids = init_centroids(points, k, rng);
    let mut labels = vec![0usize; points.len()];

    for _ in 0..max_iter.max(1) {
        for (label, p) in labels.iter_mut().zip(points) {
            *label = nearest(p, &centroids).0;
        }

        let mut sums = vec![vec![0.0; width]; k];
        let mut counts = vec![0usize; k];
        for (p, &c) in points.iter().zip(&labels) {
            counts[c] += 1;
            for (s, v) in sums[c].iter_mut().zip(p) {
                *s += v;
            }
        }

        let mut updated: Vec<Vec<f64>> = sums
            .into_iter()
            .zip(&counts)
            .map(|(s, &n)| {
                if n == 0 {
                    s
                } else {
                    s.into_iter().map(|v| v / n as f64).collect()
                }
            })
            .collect();

        reseed_empty(points, &labels, &centroids, &counts, &mut updated);

        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        centroids = updated;
        if shift <= TOLERANCE * TOLERANCE {
            break;
        }
    }

    let mut inertia = 0.0;
    for (label, p) in labels.iter_mut().zip(points) {
        let (c, d) = nearest(p, &centroids);
        *label = c;
        inertia += d;
    }

    (labels, centroids, inertia)
}

/// Move each empty cluster onto the point farthest from the centroid it was
/// assigned to this iteration. No point is handed out twice.
fn reseed_empty(
    points: &[Vec<f64>],
    labels: &[usize],
    previous: &[Vec<f64>],
    counts: &[usize],
    updated: &mut [Vec<f64>],
) {
    if !counts.contains(&0) {
        return;
    }
    let dist: Vec<f64> = points
        .iter()
        .zip(labels)
        .map(|(p, &c)| squared_distance(p, &previous[c]))
        .collect();
    let mut taken = vec![false; points.len()];

    for (c, _) in counts.iter().enumerate().filter(|(_, n)| **n == 0) {
        let far = dist
            .iter()
            .enumerate()
            .filter(|(i, _)| !taken[*i])
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        if let Some(i) = far {
            taken[i] = true;
            updated[c] = points[i].clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{MobilityDataset, MobilityRecord};
    use chrono::NaiveDate;

    fn rec(day: u32, values: [Option<f64>; 6]) -> MobilityRecord {
        MobilityRecord {
            country_region_code: Some("ID".into()),
            country_region: Some("Indonesia".into()),
            sub_region_1: Some(format!("Region {}", day % 3)),
            sub_region_2: None,
            iso_3166_2_code: None,
            timestamp: NaiveDate::from_ymd_opt(2021, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            values,
        }
    }

    /// Three well separated blobs of 4 rows each, plus one incomplete row.
    fn blobs() -> MobilityDataset {
        let mut records = Vec::new();
        let centres = [-50.0, 0.0, 50.0];
        let mut day = 1;
        for c in centres {
            for j in 0..4 {
                let v = c + j as f64;
                records.push(rec(day, [Some(v), Some(v), Some(-v), Some(v), Some(v), Some(-v)]));
                day += 1;
            }
        }
        records.push(rec(day, [Some(1.0), None, Some(1.0), Some(1.0), Some(1.0), Some(1.0)]));
        MobilityDataset::from_records(records)
    }

    #[test]
    fn standardize_gives_zero_mean_unit_variance() {
        let mut m = vec![vec![1.0, 5.0], vec![2.0, 5.0], vec![3.0, 5.0]];
        standardize(&mut m);
        let mean: f64 = m.iter().map(|r| r[0]).sum::<f64>() / 3.0;
        let var: f64 = m.iter().map(|r| r[0] * r[0]).sum::<f64>() / 3.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
        assert!(m.iter().all(|r| r[1] == 0.0));
    }

    #[test]
    fn separated_blobs_get_one_cluster_each() {
        let ds = blobs();
        let out = cluster(&FilteredView::all(&ds), &ClusterSettings::default())
            .ready()
            .unwrap();
        assert_eq!(out.k, 3);
        assert_eq!(out.labels.len(), 12);
        assert!(out.label_of(12).is_none(), "incomplete row must be skipped");
        for blob in 0..3 {
            let first = out.label_of(blob * 4).unwrap();
            for j in 1..4 {
                assert_eq!(out.label_of(blob * 4 + j), Some(first));
            }
        }
        let mut sizes = out.sizes();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![4, 4, 4]);
    }

    #[test]
    fn empty_clusters_take_distinct_far_points() {
        let points = vec![vec![0.0], vec![1.0], vec![10.0], vec![20.0]];
        let previous = vec![vec![0.0], vec![100.0], vec![200.0]];
        let labels: Vec<usize> = points.iter().map(|p| nearest(p, &previous).0).collect();
        assert_eq!(labels, vec![0, 0, 0, 0]);

        let counts = vec![4, 0, 0];
        let mut updated = vec![vec![7.75], vec![0.0], vec![0.0]];
        reseed_empty(&points, &labels, &previous, &counts, &mut updated);
        assert_eq!(updated, vec![vec![7.75], vec![20.0], vec![10.0]]);
    }

    #[test]
    fn same_seed_is_deterministic() {
        let ds = blobs();
        let view = FilteredView::all(&ds);
        let settings = ClusterSettings {
            features: vec![Category::RetailAndRecreation, Category::Parks, Category::Workplaces],
            ..ClusterSettings::default()
        };
        let a = cluster(&view, &settings);
        let b = cluster(&view, &settings);
        assert_eq!(a, b);
    }

    #[test]
    fn no_complete_rows_is_signalled() {
        let ds = MobilityDataset::from_records(vec![rec(1, [None; 6]), rec(2, [Some(1.0); 6])]);
        let view = FilteredView {
            dataset: &ds,
            indices: vec![0],
        };
        assert_eq!(
            cluster(&view, &ClusterSettings::default()).empty_reason(),
            Some(&EmptyReason::NoClusterRows)
        );
    }

    #[test]
    fn fewer_rows_than_k_shrinks_k() {
        let ds = MobilityDataset::from_records(vec![rec(1, [Some(1.0); 6]), rec(2, [Some(2.0); 6])]);
        let out = cluster(&FilteredView::all(&ds), &ClusterSettings::default())
            .ready()
            .unwrap();
        assert_eq!(out.k, 2);
        assert_ne!(out.label_of(0), out.label_of(1));
    }

    #[test]
    fn identical_rows_do_not_break_seeding() {
        let ds = MobilityDataset::from_records((1..=5).map(|d| rec(d, [Some(3.0); 6])).collect());
        let out = cluster(&FilteredView::all(&ds), &ClusterSettings::default())
            .ready()
            .unwrap();
        assert_eq!(out.labels.len(), 5);
        assert!(out.labels.values().all(|&c| c < out.k));
        assert!(out.inertia.abs() < 1e-12);
    }
}
