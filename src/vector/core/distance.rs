//! Distance metrics for vector similarity calculation.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ReelmatchError, Result};

/// Distance metrics supported by the index structures.
///
/// The set is closed on purpose: each index validates the metric it is
/// configured with when it is built and again when it is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared Euclidean (L2²) distance. Used by the exact index.
    SquaredEuclidean,
    /// Angular distance `sqrt(2 - 2·cos(a, b))`. Used by the approximate index.
    Angular,
}

impl DistanceMetric {
    /// Calculate the distance between two vectors using this metric.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        if a.len() != b.len() {
            return Err(ReelmatchError::index(format!(
                "Vector dimensions must match for distance calculation: {} vs {}",
                a.len(),
                b.len()
            )));
        }

        Ok(self.distance_unchecked(a, b))
    }

    /// Distance without the dimension check; callers guarantee equal lengths.
    #[inline]
    pub(crate) fn distance_unchecked(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::SquaredEuclidean => squared_euclidean(a, b),
            DistanceMetric::Angular => {
                let mut dot = 0.0f32;
                let mut norm_a = 0.0f32;
                let mut norm_b = 0.0f32;
                for (x, y) in a.iter().zip(b.iter()) {
                    dot += x * y;
                    norm_a += x * x;
                    norm_b += y * y;
                }
                angular_from_parts(dot, norm_a, norm_b)
            }
        }
    }

    /// Get the name of this distance metric.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::SquaredEuclidean => "squared_euclidean",
            DistanceMetric::Angular => "angular",
        }
    }

    /// Calculate distances between a query and many vectors, in parallel for large batches.
    pub fn batch_distance_parallel(&self, query: &[f32], vectors: &[&[f32]]) -> Result<Vec<f32>> {
        if vectors.len() < 100 {
            return vectors
                .iter()
                .map(|v| self.distance(query, v))
                .collect::<Result<Vec<_>>>();
        }

        vectors
            .par_iter()
            .map(|v| self.distance(query, v))
            .collect::<Result<Vec<_>>>()
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceMetric {
    type Err = ReelmatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "squared_euclidean" | "l2" | "euclidean" => Ok(DistanceMetric::SquaredEuclidean),
            "angular" | "cosine" => Ok(DistanceMetric::Angular),
            _ => Err(ReelmatchError::invalid_config(format!(
                "Unknown distance metric: {s}"
            ))),
        }
    }
}

/// Exact squared Euclidean distance, summed in index order.
#[inline]
pub(crate) fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Angular distance from a dot product and two squared norms.
///
/// A zero vector is at squared distance 2 from everything.
#[inline]
pub(crate) fn angular_from_parts(dot: f32, norm_a_sq: f32, norm_b_sq: f32) -> f32 {
    let denom = (norm_a_sq * norm_b_sq).sqrt();
    let squared = if denom > 0.0 {
        2.0 - 2.0 * (dot / denom).clamp(-1.0, 1.0)
    } else {
        2.0
    };
    squared.max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squared_euclidean() {
        let metric = DistanceMetric::SquaredEuclidean;
        let d = metric.distance(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).unwrap();
        assert_eq!(d, 2.0);
        assert_eq!(metric.distance(&[1.0, 2.0], &[1.0, 2.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_angular() {
        let metric = DistanceMetric::Angular;
        let same = metric.distance(&[1.0, 0.0], &[3.0, 0.0]).unwrap();
        assert!(same.abs() < 1e-6);

        let orthogonal = metric.distance(&[1.0, 0.0], &[0.0, 2.0]).unwrap();
        assert!((orthogonal - 2.0f32.sqrt()).abs() < 1e-6);

        let opposite = metric.distance(&[1.0, 0.0], &[-1.0, 0.0]).unwrap();
        assert!((opposite - 2.0).abs() < 1e-6);

        let zero = metric.distance(&[0.0, 0.0], &[1.0, 0.0]).unwrap();
        assert!((zero - 2.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(
            DistanceMetric::SquaredEuclidean
                .distance(&[1.0], &[1.0, 2.0])
                .is_err()
        );
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(
            "angular".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::Angular
        );
        assert_eq!(
            "L2".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::SquaredEuclidean
        );
        assert!("manhattan".parse::<DistanceMetric>().is_err());
        assert_eq!(DistanceMetric::Angular.to_string(), "angular");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&DistanceMetric::Angular).unwrap();
        assert_eq!(json, "\"angular\"");
        let metric: DistanceMetric = serde_json::from_str("\"squared_euclidean\"").unwrap();
        assert_eq!(metric, DistanceMetric::SquaredEuclidean);
        assert!(serde_json::from_str::<DistanceMetric>("\"hamming\"").is_err());
    }

    #[test]
    fn test_batch_distance_parallel_matches_serial() {
        let query = vec![0.5f32, -0.25, 1.0];
        let owned: Vec<Vec<f32>> = (0..250)
            .map(|i| vec![i as f32 * 0.01, (i % 7) as f32, -(i as f32) * 0.02])
            .collect();
        let refs: Vec<&[f32]> = owned.iter().map(|v| v.as_slice()).collect();

        let metric = DistanceMetric::SquaredEuclidean;
        let parallel = metric.batch_distance_parallel(&query, &refs).unwrap();
        for (v, d) in refs.iter().zip(parallel.iter()) {
            assert_eq!(metric.distance(&query, v).unwrap().to_bits(), d.to_bits());
        }
    }
}
