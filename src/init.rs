//! Policies for filling freshly constructed matrices.

use crate::error::{MatrixError, Result};
use crate::shape::Shape;
use rand::Rng;
use rand::distr::Uniform;

/// The method used to initialize the elements of a new matrix.
///
/// A policy is only consulted at construction time; matrices do not remember
/// how they were filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitializationPolicy {
    /// Uniform samples from `[min, max)`. `min == max` fills the constant.
    Random {
        /// Inclusive lower bound.
        min: f32,
        /// Exclusive upper bound.
        max: f32,
    },
    /// Glorot/Xavier uniform: samples from `[-l, l)` with
    /// `l = sqrt(6 / (rows + columns))`.
    Xavier,
}

impl InitializationPolicy {
    /// Produces `shape.count()` row-major elements drawn from `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Initialization`] if the `Random` bounds are not
    /// finite, `min > max`, or `max - min` overflows `f32`.
    pub(crate) fn fill<R: Rng>(self, shape: Shape, rng: &mut R) -> Result<Vec<f32>> {
        let (min, max) = match self {
            Self::Random { min, max } => {
                if !min.is_finite() || !max.is_finite() {
                    return Err(MatrixError::initialization(format!(
                        "random bounds must be finite, got [{min}, {max})"
                    )));
                }
                if min > max {
                    return Err(MatrixError::initialization(format!(
                        "random lower bound {min} exceeds upper bound {max}"
                    )));
                }
                (min, max)
            }
            Self::Xavier => {
                #[allow(clippy::cast_precision_loss)]
                let limit = (6.0 / (shape.rows() + shape.columns()) as f32).sqrt();
                (-limit, limit)
            }
        };

        if min == max {
            return Ok(vec![min; shape.count()]);
        }

        let uniform = Uniform::new(min, max).map_err(|e| {
            MatrixError::initialization(format!("cannot sample from [{min}, {max}): {e}"))
        })?;
        Ok((0..shape.count()).map(|_| rng.sample(uniform)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn random_respects_bounds() {
        let shape = Shape::new(8, 8).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let data = InitializationPolicy::Random { min: -0.5, max: 0.25 }
            .fill(shape, &mut rng)
            .unwrap();
        assert_eq!(data.len(), 64);
        assert!(data.iter().all(|&x| (-0.5..0.25).contains(&x)));
    }

    #[test]
    fn degenerate_range_is_constant() {
        let shape = Shape::new(2, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let data = InitializationPolicy::Random { min: 3.0, max: 3.0 }
            .fill(shape, &mut rng)
            .unwrap();
        assert_eq!(data, vec![3.0; 4]);
    }

    #[test]
    fn inverted_or_infinite_bounds_fail() {
        let shape = Shape::new(2, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(InitializationPolicy::Random { min: 1.0, max: 0.0 }
            .fill(shape, &mut rng)
            .is_err());
        assert!(InitializationPolicy::Random { min: 0.0, max: f32::INFINITY }
            .fill(shape, &mut rng)
            .is_err());
    }

    #[test]
    fn unrepresentable_span_fails() {
        let shape = Shape::new(2, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let wide = InitializationPolicy::Random { min: -3e38, max: 3e38 }.fill(shape, &mut rng);
        assert!(matches!(wide, Err(MatrixError::Initialization { .. })));
        assert!(InitializationPolicy::Random { min: f32::MIN, max: f32::MAX }
            .fill(shape, &mut rng)
            .is_err());
    }

    #[test]
    fn xavier_stays_within_glorot_limit() {
        let shape = Shape::new(10, 5).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let limit = (6.0f32 / 15.0).sqrt();
        let data = InitializationPolicy::Xavier.fill(shape, &mut rng).unwrap();
        assert!(data.iter().all(|x| x.abs() <= limit));
    }
}
