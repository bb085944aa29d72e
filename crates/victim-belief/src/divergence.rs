//! Hellinger distance between probability-like vectors.

use crate::error::ConfigurationError;

const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// Hellinger distance via the Bhattacharyya coefficient.
///
/// `1 - BC` is clamped at zero before the square root. Belief vectors are
/// per-cell marginals, so their BC routinely exceeds 1 and the distance then
/// reads 0 rather than NaN.
pub fn hellinger(p: &[f64], q: &[f64]) -> Result<f64, ConfigurationError> {
    check_operands(p, q)?;
    let bc: f64 = p.iter().zip(q).map(|(a, b)| (a * b).sqrt()).sum();
    Ok((1.0 - bc).max(0.0).sqrt())
}

/// Hellinger distance for inputs that must both be valid distributions.
///
/// Rejects vectors that do not sum to 1; within that domain the result is a
/// true [0, 1] distance.
pub fn hellinger_distributions(p: &[f64], q: &[f64]) -> Result<f64, ConfigurationError> {
    check_operands(p, q)?;
    for v in [p, q] {
        let sum: f64 = v.iter().sum();
        if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
            return Err(ConfigurationError::InvalidParameter {
                name: "distribution sum",
                value: sum,
                expected: "1 within 1e-6",
            });
        }
    }
    hellinger(p, q)
}

fn check_operands(p: &[f64], q: &[f64]) -> Result<(), ConfigurationError> {
    if p.len() != q.len() {
        return Err(ConfigurationError::LengthMismatch {
            what: "hellinger operand",
            expected: p.len(),
            actual: q.len(),
        });
    }
    for v in [p, q] {
        if let Some((index, &value)) = v
            .iter()
            .enumerate()
            .find(|(_, x)| !x.is_finite() || **x < 0.0)
        {
            return Err(ConfigurationError::InvalidMagnitude {
                what: "hellinger operand",
                index,
                value,
            });
        }
    }
    Ok(())
}
