use super::{Block, Layer};
use crate::Matrix;
use crate::error::Result;
use crate::init::InitializationPolicy;
use crate::ops::ComputeDevice;
use crate::shape::Shape;

/// A fully connected layer computing `weights × input + bias`.
///
/// For a `(m, k)` weight matrix the input must have `k` rows, and the bias
/// must match the `(m, input.columns())` product.
#[derive(Debug, Clone, PartialEq)]
pub struct InnerProduct {
    name: String,
    weights: Matrix,
    bias: Matrix,
}

impl InnerProduct {
    /// Creates a layer whose weights and bias are both filled by `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Initialization`](crate::MatrixError::Initialization)
    /// if the policy bounds are invalid.
    ///
    /// # Example
    ///
    /// ```
    /// use mlkit::nn::{Block, InnerProduct};
    /// use mlkit::{InitializationPolicy, Matrix, Shape};
    ///
    /// let layer = InnerProduct::new(
    ///     "fc1",
    ///     Shape::new(3, 2).unwrap(),
    ///     InitializationPolicy::Xavier,
    ///     Shape::new(3, 1).unwrap(),
    /// )
    /// .unwrap();
    /// let out = layer.forward(&Matrix::ones(2, 1).unwrap()).unwrap();
    /// assert_eq!(out.shape(), Shape::new(3, 1).unwrap());
    /// ```
    pub fn new(
        name: impl Into<String>,
        weights_shape: Shape,
        policy: InitializationPolicy,
        bias_shape: Shape,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            weights: Matrix::with_policy(weights_shape, policy)?,
            bias: Matrix::with_policy(bias_shape, policy)?,
        })
    }

    /// Creates a layer from explicit parameters.
    pub fn from_parameters(name: impl Into<String>, weights: Matrix, bias: Matrix) -> Self {
        Self {
            name: name.into(),
            weights,
            bias,
        }
    }
}

impl Block for InnerProduct {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward_with(&self, device: &dyn ComputeDevice, input: &Matrix) -> Result<Matrix> {
        self.weights
            .checked_mul_with(device, input)?
            .checked_add_with(device, &self.bias)
    }
}

impl Layer for InnerProduct {
    fn weights(&self) -> &Matrix {
        &self.weights
    }

    fn bias(&self) -> &Matrix {
        &self.bias
    }
}
