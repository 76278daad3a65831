//! Variance-threshold rank selection.

use serde::{Deserialize, Serialize};

use crate::error::{ReelmatchError, Result};

/// Default fraction of variance a reduced embedding must retain.
pub const DEFAULT_VARIANCE_THRESHOLD: f64 = 0.95;

/// Minimum cumulative explained-variance ratio, in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct VarianceThreshold(f64);

impl VarianceThreshold {
    pub fn new(value: f64) -> Result<Self> {
        if !(value > 0.0 && value <= 1.0) {
            return Err(ReelmatchError::invalid_config(format!(
                "Variance threshold must be in (0, 1], got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// See [`select_components`].
    pub fn select(&self, ratios: &[f64]) -> usize {
        select_components(ratios, self.0)
    }
}

impl Default for VarianceThreshold {
    fn default() -> Self {
        Self(DEFAULT_VARIANCE_THRESHOLD)
    }
}

impl TryFrom<f64> for VarianceThreshold {
    type Error = ReelmatchError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<VarianceThreshold> for f64 {
    fn from(threshold: VarianceThreshold) -> Self {
        threshold.0
    }
}

/// Smallest `k` whose first `k` ratios sum to at least `threshold`.
///
/// Falls back to `ratios.len()` when the threshold is never reached.
/// Negative ratios (numerical noise) count as zero, which keeps `k`
/// non-decreasing in `threshold`.
pub fn select_components(ratios: &[f64], threshold: f64) -> usize {
    let mut cumulative = 0.0;
    for (i, ratio) in ratios.iter().enumerate() {
        cumulative += ratio.max(0.0);
        if cumulative >= threshold {
            return i + 1;
        }
    }
    ratios.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        let ratios = [0.5, 0.25, 0.25];
        assert_eq!(select_components(&ratios, 0.75), 2);
        assert_eq!(select_components(&ratios, 0.76), 3);
        assert_eq!(select_components(&ratios, 0.5), 1);
    }

    #[test]
    fn test_unreached_threshold_keeps_full_rank() {
        let ratios = [0.4, 0.3, 0.2];
        assert_eq!(select_components(&ratios, 0.95), 3);
        assert_eq!(select_components(&[], 0.95), 0);
    }

    #[test]
    fn test_monotone_in_threshold() {
        let ratios = [0.31, 0.22, 0.17, 0.12, 0.08, 0.05, 0.03, 0.02];
        let mut previous = 0;
        for step in 1..=100 {
            let k = select_components(&ratios, step as f64 / 100.0);
            assert!(k >= previous, "k dropped from {previous} to {k} at {step}%");
            previous = k;
        }
        assert_eq!(previous, ratios.len());
    }

    #[test]
    fn test_threshold_validation() {
        assert!(VarianceThreshold::new(0.0).is_err());
        assert!(VarianceThreshold::new(1.01).is_err());
        assert!(VarianceThreshold::new(f64::NAN).is_err());
        assert_eq!(VarianceThreshold::new(1.0).unwrap().value(), 1.0);
        assert_eq!(VarianceThreshold::default().value(), 0.95);

        let parsed: VarianceThreshold = serde_json::from_str("0.9").unwrap();
        assert_eq!(parsed.value(), 0.9);
        assert!(serde_json::from_str::<VarianceThreshold>("1.5").is_err());
    }
}
