//! # Compute devices
//!
//! This module defines the contract every execution backend satisfies and the
//! two backends that implement it.
//!
//! ## Submodules
//!
//! - [`cpu`]: rayon-parallel CPU kernels with optional AVX2 lanes (default backend)
//! - [`wgpu`] *(opt-in)*: WGSL compute kernels dispatched through `wgpu`
//!
//! ## Contract
//!
//! - Every call is blocking: when a method returns, the result is complete and
//!   resident in host memory. A GPU device encodes, submits and waits before
//!   returning, so callers never observe which backend ran.
//! - Devices do not validate shapes. [`Matrix`] checks operands before it
//!   calls into a device, and devices assume compatible inputs.
//! - For the same inputs, the CPU and GPU devices agree within
//!   [`DEFAULT_TOLERANCE`](crate::approx::DEFAULT_TOLERANCE).
//! - Reductions ([`ComputeDevice::sum`], [`ComputeDevice::absolute_sum`]) are
//!   always evaluated on the CPU; the GPU device forwards them.
//!
//! ## Adding an operation
//!
//! 1. Add the method to [`ComputeDevice`]
//! 2. Implement it in `cpu` and as a WGSL kernel in `wgpu`
//! 3. Add the operand checks to the `*_with` method on [`Matrix`]

use crate::Matrix;
use crate::backend::ComputeMode;
use crate::error::Result;

pub mod cpu;
#[cfg(feature = "wgpu")]
pub mod wgpu;

pub use cpu::CpuDevice;
#[cfg(feature = "wgpu")]
pub use self::wgpu::{GpuDevice, GpuOptions};

/// An execution backend implementing the full set of matrix and activation kernels.
///
/// Methods take pre-validated operands and return a freshly allocated result.
pub trait ComputeDevice: Send + Sync {
    /// The compute mode this device answers for.
    fn mode(&self) -> ComputeMode;

    /// A short human-readable name for logs.
    fn name(&self) -> &str;

    /// Returns `a + b`. Shapes are identical.
    ///
    /// # Errors
    ///
    /// Fails only if the device could not execute the kernel.
    fn add(&self, a: &Matrix, b: &Matrix) -> Result<Matrix>;

    /// Returns `a - b`. Shapes are identical.
    ///
    /// # Errors
    ///
    /// Fails only if the device could not execute the kernel.
    fn subtract(&self, a: &Matrix, b: &Matrix) -> Result<Matrix>;

    /// Returns the matrix product `a × b`, where `a.columns() == b.rows()`.
    ///
    /// # Errors
    ///
    /// Fails only if the device could not execute the kernel.
    fn multiply(&self, a: &Matrix, b: &Matrix) -> Result<Matrix>;

    /// Multiplies every element of `a` by `c`.
    ///
    /// # Errors
    ///
    /// Fails only if the device could not execute the kernel.
    fn scale(&self, a: &Matrix, c: f32) -> Result<Matrix>;

    /// Elementwise `a / b`. Shapes are identical.
    ///
    /// # Errors
    ///
    /// Fails only if the device could not execute the kernel.
    fn divide(&self, a: &Matrix, b: &Matrix) -> Result<Matrix>;

    /// Elementwise floating remainder of `a / b`, with the sign of `a`.
    ///
    /// # Errors
    ///
    /// Fails only if the device could not execute the kernel.
    fn modulo(&self, a: &Matrix, b: &Matrix) -> Result<Matrix>;

    /// Sum of all elements.
    ///
    /// # Errors
    ///
    /// Fails only if the device could not execute the reduction.
    fn sum(&self, a: &Matrix) -> Result<f32>;

    /// Sum of the absolute values of all elements.
    ///
    /// # Errors
    ///
    /// Fails only if the device could not execute the reduction.
    fn absolute_sum(&self, a: &Matrix) -> Result<f32>;

    /// Elementwise `e^x`.
    ///
    /// # Errors
    ///
    /// Fails only if the device could not execute the kernel.
    fn exponentiate(&self, a: &Matrix) -> Result<Matrix>;

    /// Elementwise `1 / (1 + e^-x)`.
    ///
    /// # Errors
    ///
    /// Fails only if the device could not execute the kernel.
    fn sigmoid(&self, a: &Matrix) -> Result<Matrix>;

    /// Elementwise `s(x) * (1 - s(x))` where `s` is the sigmoid.
    ///
    /// # Errors
    ///
    /// Fails only if the device could not execute the kernel.
    fn sigmoid_derivative(&self, a: &Matrix) -> Result<Matrix>;

    /// Elementwise hyperbolic tangent.
    ///
    /// # Errors
    ///
    /// Fails only if the device could not execute the kernel.
    fn tanh(&self, a: &Matrix) -> Result<Matrix>;

    /// Elementwise `1 - tanh(x)^2`.
    ///
    /// # Errors
    ///
    /// Fails only if the device could not execute the kernel.
    fn tanh_derivative(&self, a: &Matrix) -> Result<Matrix>;

    /// Elementwise `max(x, 0)`.
    ///
    /// # Errors
    ///
    /// Fails only if the device could not execute the kernel.
    fn relu(&self, a: &Matrix) -> Result<Matrix>;

    /// Elementwise `1` where `x > 0`, `0` elsewhere.
    ///
    /// # Errors
    ///
    /// Fails only if the device could not execute the kernel.
    fn relu_derivative(&self, a: &Matrix) -> Result<Matrix>;
}

impl core::fmt::Debug for dyn ComputeDevice + '_ {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ComputeDevice")
            .field("name", &self.name())
            .field("mode", &self.mode())
            .finish()
    }
}
