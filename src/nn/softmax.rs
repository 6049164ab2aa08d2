use super::Block;
use crate::Matrix;
use crate::error::Result;
use crate::ops::ComputeDevice;

/// Normalizes a matrix into a probability distribution over all its elements.
///
/// Computed as `exp(x - max) / sum(exp(x - max))`; shifting by the maximum
/// leaves the result unchanged and keeps `exp` from overflowing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Softmax {
    name: String,
}

impl Softmax {
    /// Creates a softmax block called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Block for Softmax {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward_with(&self, device: &dyn ComputeDevice, input: &Matrix) -> Result<Matrix> {
        let max = input
            .elements()
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let shifted = device.subtract(input, &Matrix::full(input.shape(), max))?;
        let exponentiated = device.exponentiate(&shifted)?;
        let total = device.sum(&exponentiated)?;
        device.scale(&exponentiated, total.recip())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix;
    use crate::ops::CpuDevice;

    #[test]
    fn output_sums_to_one() {
        let out = Softmax::new("softmax")
            .forward_with(&CpuDevice, &matrix![[1.0, 2.0], [3.0, 4.0]])
            .unwrap();
        assert!((out.sum() - 1.0).abs() < 1e-6);
        assert!(out.elements().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn large_inputs_do_not_overflow() {
        let out = Softmax::new("softmax")
            .forward_with(&CpuDevice, &matrix![[1000.0, 1000.0]])
            .unwrap();
        assert_eq!(out, matrix![[0.5, 0.5]]);
    }

    #[test]
    fn uniform_input_is_uniform() {
        let out = Softmax::new("softmax")
            .forward_with(&CpuDevice, &Matrix::zeros(2, 2).unwrap())
            .unwrap();
        assert_eq!(out, Matrix::filled(2, 2, 0.25).unwrap());
    }
}
