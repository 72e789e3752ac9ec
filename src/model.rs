//! DBSCAN clustering of patient vitals and per-label statistics

use crate::data::PatientSet;
use crate::error::VitalsError;
use linfa::traits::Transformer;
use linfa_clustering::Dbscan;
use linfa_nn::distance::{Distance, L2Dist};
use linfa_nn::{CommonNearestNeighbour, NearestNeighbour, NearestNeighbourIndex};
use ndarray::{Array1, Array2};
use std::collections::VecDeque;
use tracing::debug;

/// Label value reported for noise points (anomalies)
pub const NOISE_LABEL: i64 = -1;

/// Default neighbourhood radius, in raw feature units
pub const DEFAULT_EPS: f64 = 10.0;

/// Default minimum neighbourhood size, counting the point itself
pub const DEFAULT_MIN_SAMPLES: usize = 5;

/// DBSCAN hyperparameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusteringParams {
    /// Neighbourhood radius (Euclidean, unnormalized features)
    pub eps: f64,
    /// Points needed within `eps` for a core point, itself included
    pub min_samples: usize,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            eps: DEFAULT_EPS,
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }
}

impl ClusteringParams {
    /// Build validated parameters
    pub fn new(eps: f64, min_samples: usize) -> crate::Result<Self> {
        let params = Self { eps, min_samples };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), VitalsError> {
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(VitalsError::InvalidParameter {
                name: "eps",
                reason: format!("must be a finite positive number, got {}", self.eps),
            });
        }
        if self.min_samples == 0 {
            return Err(VitalsError::InvalidParameter {
                name: "min_samples",
                reason: "must be at least 1 (the point itself)".to_string(),
            });
        }
        Ok(())
    }
}

/// Cluster membership for every patient, in patient order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelAssignment {
    memberships: Array1<Option<usize>>,
}

impl LabelAssignment {
    pub fn new(memberships: Array1<Option<usize>>) -> Self {
        Self { memberships }
    }

    pub fn len(&self) -> usize {
        self.memberships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memberships.is_empty()
    }

    /// Cluster id of a patient, `None` for noise
    pub fn membership(&self, index: usize) -> Option<usize> {
        self.memberships.get(index).copied().flatten()
    }

    pub fn memberships(&self) -> &Array1<Option<usize>> {
        &self.memberships
    }

    pub fn is_noise(&self, index: usize) -> bool {
        self.membership(index).is_none()
    }

    /// Integer labels with `NOISE_LABEL` for anomalies
    pub fn labels(&self) -> Vec<i64> {
        self.memberships
            .iter()
            .map(|m| m.map_or(NOISE_LABEL, |id| id as i64))
            .collect()
    }

    /// Number of distinct non-noise labels
    pub fn cluster_count(&self) -> usize {
        self.cluster_sizes().iter().filter(|&&size| size > 0).count()
    }

    pub fn anomaly_count(&self) -> usize {
        self.memberships.iter().filter(|m| m.is_none()).count()
    }

    /// Get cluster sizes, indexed by cluster id
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let n_clusters = self
            .memberships
            .iter()
            .flatten()
            .max()
            .map_or(0, |&max_id| max_id + 1);

        let mut sizes = vec![0; n_clusters];
        for &id in self.memberships.iter().flatten() {
            sizes[id] += 1;
        }
        sizes
    }

    /// Mean silhouette coefficient over the non-noise points.
    ///
    /// `None` unless at least two clusters exist. A point alone in its
    /// cluster contributes 0.
    pub fn silhouette_score(&self, features: &Array2<f64>) -> Option<f64> {
        let sizes = self.cluster_sizes();
        if self.cluster_count() < 2 || features.nrows() != self.len() {
            return None;
        }

        let clustered: Vec<(usize, usize)> = self
            .memberships
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.map(|id| (i, id)))
            .collect();

        let mut silhouette_sum = 0.0;

        for &(i, cluster_label) in &clustered {
            if sizes[cluster_label] < 2 {
                continue;
            }

            let point = features.row(i);
            let mut distance_sums = vec![0.0; sizes.len()];

            for &(j, other_label) in &clustered {
                if i != j {
                    distance_sums[other_label] += L2Dist.distance(point, features.row(j));
                }
            }

            // a(i): mean distance to the rest of its own cluster
            let a_i = distance_sums[cluster_label] / (sizes[cluster_label] - 1) as f64;

            // b(i): smallest mean distance to another cluster
            let b_i = distance_sums
                .iter()
                .zip(sizes.iter())
                .enumerate()
                .filter(|&(label, (_, &size))| label != cluster_label && size > 0)
                .map(|(_, (&sum, &size))| sum / size as f64)
                .fold(f64::INFINITY, f64::min);

            let denominator = a_i.max(b_i);
            if denominator > 0.0 && b_i.is_finite() {
                silhouette_sum += (b_i - a_i) / denominator;
            }
        }

        Some(silhouette_sum / clustered.len() as f64)
    }
}

/// Run DBSCAN over the patients' raw vitals
///
/// # Arguments
/// * `patients` - Collected patient records, must be non-empty
/// * `params` - Neighbourhood radius and minimum neighbourhood size
///
/// # Returns
/// * One `LabelAssignment` entry per patient, noise for sparse points
pub fn cluster_patients(
    patients: &PatientSet,
    params: &ClusteringParams,
) -> crate::Result<LabelAssignment> {
    params.validate()?;

    if patients.is_empty() {
        return Err(VitalsError::InsufficientData {
            stage: "clustering",
            required: 1,
            actual: 0,
        }
        .into());
    }

    let features = patients.to_features();
    debug!(
        n_patients = patients.len(),
        eps = params.eps,
        min_samples = params.min_samples,
        "running DBSCAN"
    );

    // linfa's DBSCAN requires min_points > 1
    let memberships = if params.min_samples == 1 {
        connected_components(&features, params.eps)?
    } else {
        Dbscan::params_with(params.min_samples, L2Dist, CommonNearestNeighbour::KdTree)
            .tolerance(params.eps)
            .transform(&features)?
    };

    let labels = LabelAssignment::new(memberships);
    debug!(
        clusters = labels.cluster_count(),
        anomalies = labels.anomaly_count(),
        "DBSCAN finished"
    );

    Ok(labels)
}

/// DBSCAN with `min_samples == 1`: every point is a core point, so clusters
/// are the connected components of the `eps`-neighbourhood graph.
fn connected_components(
    features: &Array2<f64>,
    eps: f64,
) -> crate::Result<Array1<Option<usize>>> {
    let index = CommonNearestNeighbour::KdTree.from_batch(features, L2Dist)?;
    let mut memberships = Array1::from_elem(features.nrows(), None);
    let mut queue = VecDeque::new();
    let mut next_cluster = 0;

    for start in 0..features.nrows() {
        if memberships[start].is_some() {
            continue;
        }
        memberships[start] = Some(next_cluster);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for (_, neighbour) in index.within_range(features.row(current), eps)? {
                if memberships[neighbour].is_none() {
                    memberships[neighbour] = Some(next_cluster);
                    queue.push_back(neighbour);
                }
            }
        }
        next_cluster += 1;
    }

    Ok(memberships)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_group_patients() -> PatientSet {
        vec![
            [120.0, 90.0],
            [121.0, 91.0],
            [119.0, 89.0],
            [122.0, 92.0],
            [160.0, 200.0],
            [161.0, 201.0],
            [159.0, 199.0],
            [162.0, 202.0],
            [300.0, 40.0],
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_single_dense_group_with_outlier() {
        let patients: PatientSet =
            vec![[120.0, 90.0], [122.0, 91.0], [121.0, 89.0], [200.0, 250.0]]
                .into_iter()
                .collect();
        let params = ClusteringParams::new(10.0, 3).unwrap();

        let labels = cluster_patients(&patients, &params).unwrap();

        assert_eq!(labels.labels(), vec![0, 0, 0, NOISE_LABEL]);
        assert_eq!(labels.cluster_count(), 1);
        assert_eq!(labels.anomaly_count(), 1);
    }

    #[test]
    fn test_fewer_points_than_min_samples_is_all_noise() {
        let patients: PatientSet = vec![[120.0, 90.0], [121.0, 90.0], [122.0, 90.0]]
            .into_iter()
            .collect();

        let labels = cluster_patients(&patients, &ClusteringParams::default()).unwrap();

        assert!(labels.labels().iter().all(|&label| label == NOISE_LABEL));
        assert_eq!(labels.cluster_count(), 0);
    }

    #[test]
    fn test_two_groups() {
        let patients = two_group_patients();
        let params = ClusteringParams::new(10.0, 3).unwrap();

        let labels = cluster_patients(&patients, &params).unwrap();

        assert_eq!(labels.cluster_count(), 2);
        assert_eq!(labels.anomaly_count(), 1);
        assert!(labels.is_noise(8));
        assert_ne!(labels.membership(0), labels.membership(4));

        let sizes = labels.cluster_sizes();
        assert_eq!(sizes.iter().sum::<usize>() + labels.anomaly_count(), patients.len());
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let patients = two_group_patients();
        let params = ClusteringParams::new(10.0, 3).unwrap();

        let first = cluster_patients(&patients, &params).unwrap();
        let second = cluster_patients(&patients, &params).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_set_is_insufficient_data() {
        let err = cluster_patients(&PatientSet::new(), &ClusteringParams::default()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<VitalsError>(),
            Some(VitalsError::InsufficientData { actual: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_params() {
        assert!(ClusteringParams::new(0.0, 5).is_err());
        assert!(ClusteringParams::new(f64::NAN, 5).is_err());
        assert!(ClusteringParams::new(10.0, 0).is_err());
        assert!(ClusteringParams::new(10.0, 1).is_ok());
        assert!(ClusteringParams::new(10.0, 2).is_ok());
    }

    #[test]
    fn test_min_samples_one_joins_neighbours_and_has_no_noise() {
        let patients: PatientSet = vec![
            [120.0, 90.0],
            [200.0, 250.0],
            [127.0, 90.0],
            [134.0, 90.0],
            [300.0, 40.0],
        ]
        .into_iter()
        .collect();
        let params = ClusteringParams::new(10.0, 1).unwrap();

        let labels = cluster_patients(&patients, &params).unwrap();

        // 120 -> 127 -> 134 chain through eps, the others stand alone
        assert_eq!(labels.labels(), vec![0, 1, 0, 0, 2]);
        assert_eq!(labels.anomaly_count(), 0);
        assert_eq!(labels.cluster_sizes(), vec![3, 1, 1]);
    }

    #[test]
    fn test_silhouette_well_separated() {
        let features = array![[0.0, 0.0], [0.0, 1.0], [100.0, 0.0], [100.0, 1.0], [50.0, 50.0]];
        let labels = LabelAssignment::new(array![Some(0), Some(0), Some(1), Some(1), None]);

        let score = labels.silhouette_score(&features).unwrap();

        assert!(score > 0.95 && score <= 1.0, "unexpected score {}", score);
    }

    #[test]
    fn test_silhouette_needs_two_clusters() {
        let features = array![[0.0, 0.0], [0.0, 1.0], [100.0, 0.0]];
        let labels = LabelAssignment::new(array![Some(0), Some(0), None]);

        assert_eq!(labels.silhouette_score(&features), None);
    }

    #[test]
    fn test_silhouette_singleton_cluster_scores_zero() {
        let features = array![[0.0, 0.0], [0.0, 2.0], [10.0, 0.0]];
        let labels = LabelAssignment::new(array![Some(0), Some(0), Some(1)]);

        // a = 2, b = 10 and ~10.2 for the pair; the singleton adds 0
        let score = labels.silhouette_score(&features).unwrap();
        let pair_0 = (10.0 - 2.0) / 10.0;
        let pair_1 = (104.0f64.sqrt() - 2.0) / 104.0f64.sqrt();
        assert!((score - (pair_0 + pair_1) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_cluster_sizes() {
        let labels = LabelAssignment::new(array![Some(1), None, Some(0), Some(1), None]);

        assert_eq!(labels.cluster_sizes(), vec![1, 2]);
        assert_eq!(labels.anomaly_count(), 2);
        assert_eq!(labels.labels(), vec![1, -1, 0, 1, -1]);
    }
}
