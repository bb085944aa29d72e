//! Chernoff fusion: per-cell weighted geometric means computed in log space.
//!
//! Cells stay independent. Results are clamped to [0, 1] and never
//! renormalized across cells.

use serde::{Deserialize, Serialize};

use crate::belief::{BeliefVector, EPSILON};
use crate::error::ConfigurationError;

/// Default pairwise weight.
pub const DEFAULT_OMEGA: f64 = 0.5;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// How a tier combines several belief vectors into one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FusionPolicy {
    /// True N-ary weighted geometric mean.
    #[default]
    Weighted,
    /// Sequential pairwise fold at a fixed omega, first operand first.
    ///
    /// Order-dependent and skewed toward later operands. Kept for output
    /// compatibility with earlier runs.
    LegacyFold { omega: f64 },
}

/// Pairwise and N-ary Chernoff combination.
#[derive(Debug, Clone, Copy, Default)]
pub struct FusionEngine;

impl FusionEngine {
    pub fn new() -> Self {
        Self
    }

    /// `clamp(exp(ω·ln(a+ε) + (1-ω)·ln(b+ε)), 0, 1)` per cell.
    pub fn chernoff_pair(
        &self,
        a: &BeliefVector,
        b: &BeliefVector,
        omega: f64,
    ) -> Result<BeliefVector, ConfigurationError> {
        if !(0.0..=1.0).contains(&omega) {
            return Err(ConfigurationError::InvalidParameter {
                name: "omega",
                value: omega,
                expected: "[0, 1]",
            });
        }
        check_len(a.len(), b.len())?;
        let fused = a
            .as_slice()
            .iter()
            .zip(b.as_slice())
            .map(|(x, y)| {
                let log = omega * (x + EPSILON).ln() + (1.0 - omega) * (y + EPSILON).ln();
                log.exp().clamp(0.0, 1.0)
            })
            .collect();
        Ok(BeliefVector::new(fused))
    }

    /// `clamp(exp(Σ w_k·ln(v_k+ε)), 0, 1)` per cell.
    ///
    /// Weights must be finite, nonnegative and sum to 1 within 1e-6.
    pub fn chernoff_n(
        &self,
        beliefs: &[&BeliefVector],
        weights: &[f64],
    ) -> Result<BeliefVector, ConfigurationError> {
        let Some(first) = beliefs.first() else {
            return Err(ConfigurationError::Empty {
                what: "fusion operands",
            });
        };
        if weights.len() != beliefs.len() {
            return Err(ConfigurationError::LengthMismatch {
                what: "fusion weights",
                expected: beliefs.len(),
                actual: weights.len(),
            });
        }
        if let Some((index, &value)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(ConfigurationError::InvalidWeight { index, value });
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigurationError::WeightSum { sum });
        }
        let len = first.len();
        for belief in beliefs {
            check_len(len, belief.len())?;
        }

        let fused = (0..len)
            .map(|i| {
                let log: f64 = beliefs
                    .iter()
                    .zip(weights)
                    .map(|(b, w)| w * (b[i] + EPSILON).ln())
                    .sum();
                log.exp().clamp(0.0, 1.0)
            })
            .collect();
        Ok(BeliefVector::new(fused))
    }

    /// Fold `beliefs` left to right with [`Self::chernoff_pair`] at a fixed omega.
    pub fn fold(
        &self,
        beliefs: &[&BeliefVector],
        omega: f64,
    ) -> Result<BeliefVector, ConfigurationError> {
        let Some((first, rest)) = beliefs.split_first() else {
            return Err(ConfigurationError::Empty {
                what: "fusion operands",
            });
        };
        rest.iter().try_fold((*first).clone(), |acc, next| {
            self.chernoff_pair(&acc, next, omega)
        })
    }

    /// Combine `beliefs` under `policy`. `weights` is only read by
    /// [`FusionPolicy::Weighted`].
    pub fn combine(
        &self,
        policy: FusionPolicy,
        beliefs: &[&BeliefVector],
        weights: &[f64],
    ) -> Result<BeliefVector, ConfigurationError> {
        match policy {
            FusionPolicy::Weighted => self.chernoff_n(beliefs, weights),
            FusionPolicy::LegacyFold { omega } => self.fold(beliefs, omega),
        }
    }
}

fn check_len(expected: usize, actual: usize) -> Result<(), ConfigurationError> {
    if expected != actual {
        return Err(ConfigurationError::LengthMismatch {
            what: "fusion operand",
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bv(values: &[f64]) -> BeliefVector {
        BeliefVector::new(values.to_vec())
    }

    #[test]
    fn test_pair_is_geometric_mean() {
        let engine = FusionEngine::new();
        let fused = engine
            .chernoff_pair(&bv(&[0.9, 0.5]), &bv(&[0.1, 0.5]), 0.5)
            .unwrap();
        assert!((fused[0] - 0.3).abs() < 1e-6);
        assert!((fused[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_pair_extreme_weights_select_operand() {
        let engine = FusionEngine::new();
        let a = bv(&[0.9, 0.2]);
        let b = bv(&[0.1, 0.7]);
        let only_a = engine.chernoff_pair(&a, &b, 1.0).unwrap();
        let only_b = engine.chernoff_pair(&a, &b, 0.0).unwrap();
        assert!((only_a[0] - 0.9).abs() < 1e-6 && (only_a[1] - 0.2).abs() < 1e-6);
        assert!((only_b[0] - 0.1).abs() < 1e-6 && (only_b[1] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_pair_rejects_length_mismatch_and_bad_omega() {
        let engine = FusionEngine::new();
        assert!(matches!(
            engine.chernoff_pair(&bv(&[0.5]), &bv(&[0.5, 0.5]), 0.5),
            Err(ConfigurationError::LengthMismatch { .. })
        ));
        assert!(matches!(
            engine.chernoff_pair(&bv(&[0.5]), &bv(&[0.5]), 1.5),
            Err(ConfigurationError::InvalidParameter { name: "omega", .. })
        ));
    }

    #[test]
    fn test_n_ary_matches_pair_for_two_operands() {
        let engine = FusionEngine::new();
        let a = bv(&[0.9, 0.3, 0.0]);
        let b = bv(&[0.4, 0.6, 1.0]);
        let pair = engine.chernoff_pair(&a, &b, 0.3).unwrap();
        let n = engine.chernoff_n(&[&a, &b], &[0.3, 0.7]).unwrap();
        for i in 0..3 {
            assert!((pair[i] - n[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_n_ary_validates_weights() {
        let engine = FusionEngine::new();
        let a = bv(&[0.5]);
        assert!(matches!(
            engine.chernoff_n(&[&a, &a], &[0.5, 0.6]),
            Err(ConfigurationError::WeightSum { .. })
        ));
        assert!(matches!(
            engine.chernoff_n(&[&a, &a], &[1.0]),
            Err(ConfigurationError::LengthMismatch { .. })
        ));
        assert!(matches!(
            engine.chernoff_n(&[&a, &a], &[f64::NAN, 1.0]),
            Err(ConfigurationError::InvalidWeight { index: 0, .. })
        ));
        assert!(matches!(
            engine.chernoff_n(&[], &[]),
            Err(ConfigurationError::Empty { .. })
        ));
    }

    #[test]
    fn test_fold_differs_from_n_ary() {
        let engine = FusionEngine::new();
        let a = bv(&[0.9]);
        let b = bv(&[0.5]);
        let c = bv(&[0.1]);
        let folded = engine.fold(&[&a, &b, &c], 0.5).unwrap();
        let third = 1.0 / 3.0;
        let n = engine
            .chernoff_n(&[&a, &b, &c], &[third, third, 1.0 - 2.0 * third])
            .unwrap();
        // fold weights are 1/4, 1/4, 1/2
        let expected_fold = (0.25 * 0.9f64.ln() + 0.25 * 0.5f64.ln() + 0.5 * 0.1f64.ln()).exp();
        assert!((folded[0] - expected_fold).abs() < 1e-6);
        assert!((folded[0] - n[0]).abs() > 1e-3);
    }

    #[test]
    fn test_combine_dispatches_on_policy() {
        let engine = FusionEngine::new();
        let a = bv(&[0.8]);
        let b = bv(&[0.2]);
        let weighted = engine
            .combine(FusionPolicy::Weighted, &[&a, &b], &[0.5, 0.5])
            .unwrap();
        let legacy = engine
            .combine(FusionPolicy::LegacyFold { omega: 0.5 }, &[&a, &b], &[])
            .unwrap();
        assert!((weighted[0] - 0.4).abs() < 1e-6);
        assert!((legacy[0] - 0.4).abs() < 1e-6);
    }
}
