//! Elementwise activation blocks.
//!
//! Each block forwards to exactly one device kernel per direction.

use super::{Activation, Block};
use crate::Matrix;
use crate::error::Result;
use crate::ops::ComputeDevice;

macro_rules! activation_block {
    ($(#[$meta:meta])* $ty:ident, $forward:ident, $derivative:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $ty {
            name: String,
        }

        impl $ty {
            #[doc = concat!("Creates a `", stringify!($ty), "` block called `name`.")]
            pub fn new(name: impl Into<String>) -> Self {
                Self { name: name.into() }
            }
        }

        impl Block for $ty {
            fn name(&self) -> &str {
                &self.name
            }

            fn forward_with(&self, device: &dyn ComputeDevice, input: &Matrix) -> Result<Matrix> {
                device.$forward(input)
            }
        }

        impl Activation for $ty {
            fn derivative_with(&self, device: &dyn ComputeDevice, input: &Matrix) -> Result<Matrix> {
                device.$derivative(input)
            }
        }
    };
}

activation_block!(
    /// The logistic sigmoid `1 / (1 + e^-x)`; derivative `s(x) * (1 - s(x))`.
    Sigmoid,
    sigmoid,
    sigmoid_derivative
);

activation_block!(
    /// The hyperbolic tangent; derivative `1 - tanh(x)^2`.
    Tanh,
    tanh,
    tanh_derivative
);

activation_block!(
    /// The rectified linear unit `max(x, 0)`; derivative `1` for `x > 0`,
    /// `0` elsewhere.
    ReLU,
    relu,
    relu_derivative
);
