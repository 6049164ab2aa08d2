//! Compute mode selection.
//!
//! This module defines the available execution backends and the two ways of
//! choosing between them.
//!
//! # Supported modes
//!
//! - `Cpu` — rayon-parallel kernels on the host (default).
//! - `Gpu` — WGSL kernels through `wgpu` (requires the `wgpu` feature and a
//!   compatible adapter).
//!
//! # Process-wide mode
//!
//! The active mode is stored globally in an `AtomicU8`, so the `std::ops`
//! operators and the `checked_*` methods on [`Matrix`] can pick a device
//! without being handed one. Changing the mode only affects operations that
//! start afterwards; matrices carry no backend affinity.
//!
//! The GPU device behind the global mode is created the first time it is
//! requested and kept for the lifetime of the process. A failed creation is
//! remembered as well, so later requests fail fast with the same error.
//!
//! # Explicit contexts
//!
//! [`ComputeContext`] owns its mode and, for the GPU, its own device. It never
//! reads or writes the global mode, so threads and tests can run on
//! different backends side by side.

use crate::Matrix;
use crate::error::Result;
use crate::ops::{ComputeDevice, CpuDevice};
use core::convert::TryFrom;
use core::fmt;
use core::str::FromStr;
use core::sync::atomic::{AtomicU8, Ordering};
use thiserror::Error;

#[cfg(feature = "wgpu")]
use crate::ops::{GpuDevice, GpuOptions};

/// Enumeration of supported execution backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ComputeMode {
    /// Host execution (default).
    #[default]
    Cpu = 0,
    /// GPU execution through `wgpu`.
    Gpu,
}

impl TryFrom<u8> for ComputeMode {
    type Error = ();

    fn try_from(value: u8) -> core::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Cpu),
            1 => Ok(Self::Gpu),
            _ => Err(()),
        }
    }
}

/// Returned when a string names no known compute mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown compute mode `{0}`, expected `cpu` or `gpu`")]
pub struct ParseComputeModeError(String);

impl FromStr for ComputeMode {
    type Err = ParseComputeModeError;

    /// Parses `cpu` or `gpu`, ignoring ASCII case.
    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("cpu") {
            Ok(Self::Cpu)
        } else if s.eq_ignore_ascii_case("gpu") {
            Ok(Self::Gpu)
        } else {
            Err(ParseComputeModeError(s.to_owned()))
        }
    }
}

impl fmt::Display for ComputeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
        })
    }
}

/// Global state for the active compute mode.
static GLOBAL_COMPUTE_MODE: AtomicU8 = AtomicU8::new(ComputeMode::Cpu as u8);

static CPU: CpuDevice = CpuDevice::new();

/// Sets the compute mode used by subsequent operator and `checked_*` calls.
///
/// Switching to [`ComputeMode::Gpu`] does not touch the GPU; the device is
/// created on the first operation that needs it.
///
/// # Example
///
/// ```
/// use mlkit::{set_compute_mode, get_compute_mode, ComputeMode};
///
/// set_compute_mode(ComputeMode::Cpu);
/// assert_eq!(get_compute_mode(), ComputeMode::Cpu);
/// ```
pub fn set_compute_mode(mode: ComputeMode) {
    let previous = GLOBAL_COMPUTE_MODE.swap(mode as u8, Ordering::AcqRel);
    tracing::debug!(
        from = %ComputeMode::try_from(previous).unwrap_or_default(),
        to = %mode,
        "compute mode changed"
    );
}

/// Returns the active compute mode.
///
/// If the stored value is invalid, defaults to [`ComputeMode::Cpu`].
pub fn get_compute_mode() -> ComputeMode {
    ComputeMode::try_from(GLOBAL_COMPUTE_MODE.load(Ordering::Acquire)).unwrap_or_default()
}

/// Returns the device for the active compute mode.
///
/// # Errors
///
/// Returns [`MatrixError::DeviceInitialization`](crate::MatrixError::DeviceInitialization) in GPU mode when the shared
/// GPU device could not be created or the `wgpu` feature is disabled.
pub fn compute_device() -> Result<&'static dyn ComputeDevice> {
    match get_compute_mode() {
        ComputeMode::Cpu => Ok(&CPU),
        ComputeMode::Gpu => shared_gpu(),
    }
}

#[cfg(feature = "wgpu")]
fn shared_gpu() -> Result<&'static dyn ComputeDevice> {
    lazy_static::lazy_static! {
        static ref SHARED_GPU: Result<GpuDevice> = GpuDevice::new().inspect_err(|e| {
            tracing::warn!(error = %e, "shared GPU device unavailable");
        });
    }

    match &*SHARED_GPU {
        Ok(device) => Ok(device),
        Err(e) => Err(e.clone()),
    }
}

#[cfg(not(feature = "wgpu"))]
fn shared_gpu() -> Result<&'static dyn ComputeDevice> {
    Err(gpu_disabled())
}

#[cfg(not(feature = "wgpu"))]
fn gpu_disabled() -> crate::MatrixError {
    crate::MatrixError::device("GPU mode requires the `wgpu` feature")
}

/// An execution context with its own backend, independent of the global mode.
///
/// A GPU context owns its device, queue and compiled kernels; they are
/// released when the context is dropped.
///
/// # Example
///
/// ```
/// use mlkit::{matrix, ComputeContext};
///
/// let ctx = ComputeContext::cpu();
/// let a = matrix![[1.0, 2.0], [3.0, 4.0]];
/// assert_eq!(ctx.add(&a, &a).unwrap(), matrix![[2.0, 4.0], [6.0, 8.0]]);
/// ```
#[derive(Debug)]
pub struct ComputeContext {
    mode: ComputeMode,
    #[cfg(feature = "wgpu")]
    gpu: Option<GpuDevice>,
}

impl Default for ComputeContext {
    fn default() -> Self {
        Self::cpu()
    }
}

impl ComputeContext {
    /// A context running on the CPU.
    #[must_use]
    pub const fn cpu() -> Self {
        Self {
            mode: ComputeMode::Cpu,
            #[cfg(feature = "wgpu")]
            gpu: None,
        }
    }

    /// A context with a freshly created GPU device using default options.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::DeviceInitialization`](crate::MatrixError::DeviceInitialization) if no adapter or device is
    /// available, or the `wgpu` feature is disabled.
    pub fn gpu() -> Result<Self> {
        Self::new(ComputeMode::Gpu)
    }

    /// A context with a freshly created GPU device.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::DeviceInitialization`](crate::MatrixError::DeviceInitialization) if no matching adapter or
    /// device is available.
    #[cfg(feature = "wgpu")]
    pub fn gpu_with(options: &GpuOptions) -> Result<Self> {
        Ok(Self {
            mode: ComputeMode::Gpu,
            gpu: Some(GpuDevice::with_options(options)?),
        })
    }

    /// A context for `mode`.
    ///
    /// # Errors
    ///
    /// See [`ComputeContext::gpu`].
    pub fn new(mode: ComputeMode) -> Result<Self> {
        match mode {
            ComputeMode::Cpu => Ok(Self::cpu()),
            #[cfg(feature = "wgpu")]
            ComputeMode::Gpu => Self::gpu_with(&GpuOptions::default()),
            #[cfg(not(feature = "wgpu"))]
            ComputeMode::Gpu => Err(gpu_disabled()),
        }
    }

    /// The mode this context runs in.
    #[must_use]
    pub const fn mode(&self) -> ComputeMode {
        self.mode
    }

    /// The device operations are dispatched to.
    #[must_use]
    pub fn device(&self) -> &dyn ComputeDevice {
        #[cfg(feature = "wgpu")]
        {
            if let Some(gpu) = &self.gpu {
                return gpu;
            }
        }
        &CPU
    }

    /// `a + b`. See [`Matrix::checked_add_with`].
    ///
    /// # Errors
    ///
    /// Fails on mismatched shapes or a device fault.
    pub fn add(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        a.checked_add_with(self.device(), b)
    }

    /// `a - b`. See [`Matrix::checked_sub_with`].
    ///
    /// # Errors
    ///
    /// Fails on mismatched shapes or a device fault.
    pub fn subtract(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        a.checked_sub_with(self.device(), b)
    }

    /// The matrix product `a × b`. See [`Matrix::checked_mul_with`].
    ///
    /// # Errors
    ///
    /// Fails on mismatched inner dimensions or a device fault.
    pub fn multiply(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        a.checked_mul_with(self.device(), b)
    }

    /// `a * c`.
    ///
    /// # Errors
    ///
    /// Fails on a device fault.
    pub fn scale(&self, a: &Matrix, c: f32) -> Result<Matrix> {
        a.checked_scale_with(self.device(), c)
    }

    /// Elementwise `a / b`. See [`Matrix::checked_div_with`].
    ///
    /// # Errors
    ///
    /// Fails on mismatched shapes, a non-square divisor or a device fault.
    pub fn divide(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        a.checked_div_with(self.device(), b)
    }

    /// `a / c`.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::DivisionByZero`](crate::MatrixError::DivisionByZero) if `c == 0`.
    pub fn divide_scalar(&self, a: &Matrix, c: f32) -> Result<Matrix> {
        a.checked_div_scalar_with(self.device(), c)
    }

    /// Elementwise `a % b`. See [`Matrix::checked_rem_with`].
    ///
    /// # Errors
    ///
    /// Fails on mismatched shapes or a device fault.
    pub fn modulo(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        a.checked_rem_with(self.device(), b)
    }

    /// Sum of all elements.
    ///
    /// # Errors
    ///
    /// Fails on a device fault.
    pub fn sum(&self, a: &Matrix) -> Result<f32> {
        self.device().sum(a)
    }

    /// Sum of absolute values.
    ///
    /// # Errors
    ///
    /// Fails on a device fault.
    pub fn absolute_sum(&self, a: &Matrix) -> Result<f32> {
        self.device().absolute_sum(a)
    }

    /// Elementwise `e^x`.
    ///
    /// # Errors
    ///
    /// Fails on a device fault.
    pub fn exponentiate(&self, a: &Matrix) -> Result<Matrix> {
        a.exponentiate_with(self.device())
    }

    /// Elementwise logistic sigmoid.
    ///
    /// # Errors
    ///
    /// Fails on a device fault.
    pub fn sigmoid(&self, a: &Matrix) -> Result<Matrix> {
        self.device().sigmoid(a)
    }

    /// Elementwise sigmoid derivative.
    ///
    /// # Errors
    ///
    /// Fails on a device fault.
    pub fn sigmoid_derivative(&self, a: &Matrix) -> Result<Matrix> {
        self.device().sigmoid_derivative(a)
    }

    /// Elementwise hyperbolic tangent.
    ///
    /// # Errors
    ///
    /// Fails on a device fault.
    pub fn tanh(&self, a: &Matrix) -> Result<Matrix> {
        self.device().tanh(a)
    }

    /// Elementwise tanh derivative.
    ///
    /// # Errors
    ///
    /// Fails on a device fault.
    pub fn tanh_derivative(&self, a: &Matrix) -> Result<Matrix> {
        self.device().tanh_derivative(a)
    }

    /// Elementwise `max(x, 0)`.
    ///
    /// # Errors
    ///
    /// Fails on a device fault.
    pub fn relu(&self, a: &Matrix) -> Result<Matrix> {
        self.device().relu(a)
    }

    /// Elementwise `ReLU` derivative.
    ///
    /// # Errors
    ///
    /// Fails on a device fault.
    pub fn relu_derivative(&self, a: &Matrix) -> Result<Matrix> {
        self.device().relu_derivative(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MatrixError, matrix};

    #[test]
    fn mode_round_trips_through_u8_and_str() {
        assert_eq!(ComputeMode::try_from(ComputeMode::Gpu as u8), Ok(ComputeMode::Gpu));
        assert_eq!(ComputeMode::try_from(7), Err(()));
        assert_eq!("GPU".parse::<ComputeMode>().unwrap(), ComputeMode::Gpu);
        assert_eq!(ComputeMode::Cpu.to_string(), "cpu");
        assert!("tpu".parse::<ComputeMode>().is_err());
    }

    #[test]
    fn default_mode_is_cpu() {
        assert_eq!(ComputeMode::default(), ComputeMode::Cpu);
        assert_eq!(ComputeContext::default().mode(), ComputeMode::Cpu);
    }

    #[test]
    fn cpu_context_runs_every_operation() {
        let ctx = ComputeContext::cpu();
        assert_eq!(ctx.device().mode(), ComputeMode::Cpu);

        let a = matrix![[1.0, 2.0], [3.0, 4.0]];
        let b = matrix![[4.0, 5.0], [6.0, 7.0]];
        assert_eq!(ctx.multiply(&a, &b).unwrap(), matrix![[16.0, 19.0], [36.0, 43.0]]);
        assert_eq!(ctx.subtract(&b, &a).unwrap(), matrix![[3.0, 3.0], [3.0, 3.0]]);
        assert_eq!(ctx.scale(&a, 0.0).unwrap(), Matrix::zeros(2, 2).unwrap());
        assert_eq!(ctx.divide_scalar(&a, 0.0), Err(MatrixError::DivisionByZero));
        assert_eq!(ctx.sum(&a).unwrap(), 10.0);
        assert_eq!(ctx.relu(&-&a).unwrap(), Matrix::zeros(2, 2).unwrap());
        assert_eq!(ctx.exponentiate(&Matrix::zeros(1, 3).unwrap()).unwrap(), Matrix::ones(1, 3).unwrap());
    }

    #[test]
    fn context_reports_shape_errors() {
        let ctx = ComputeContext::cpu();
        let a = Matrix::ones(2, 3).unwrap();
        assert!(matches!(
            ctx.multiply(&a, &a),
            Err(MatrixError::Dimension { operation: "multiply", .. })
        ));
    }

    #[cfg(not(feature = "wgpu"))]
    #[test]
    fn gpu_context_needs_feature() {
        assert!(matches!(
            ComputeContext::gpu(),
            Err(MatrixError::DeviceInitialization { .. })
        ));
    }
}
