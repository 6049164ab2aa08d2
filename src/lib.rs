//! # `mlkit`
//!
//! Dense `f32` matrix algebra and small neural-network building blocks with
//! two interchangeable execution backends: a rayon-parallel CPU device (with
//! optional AVX2 lanes) and an optional `wgpu` GPU device running WGSL compute
//! kernels.
//!
//! ## Features
//!
//! - **Matrices**: row-major [`Matrix`] with validated construction, random
//!   initialization policies and a [`matrix!`] literal macro
//! - **Arithmetic**: `checked_*` methods returning [`Result`], plus the usual
//!   operators (`+ - * / %`, unary `-`) that panic on invalid operands
//! - **Backends**: every kernel is available on both devices behind the
//!   [`ComputeDevice`] trait; results agree within
//!   [`approx::DEFAULT_TOLERANCE`]
//! - **Mode selection**: a process-wide [`ComputeMode`] for operator syntax,
//!   or an explicit [`ComputeContext`] that leaves global state alone
//! - **Blocks**: sigmoid, tanh, `ReLU`, softmax, inner-product layers and
//!   feed-forward networks in [`nn`]
//!
//! ## Cargo features
//!
//! - `wgpu` — enables the GPU device
//! - `simd` — AVX2 paths on the CPU device (needs `-C target-feature=+avx2`)
//!
//! ## Example
//!
//! ```
//! use mlkit::{matrix, Matrix};
//!
//! let a = matrix![[1.0, 2.0], [3.0, 4.0]];
//! let b = matrix![[4.0, 5.0], [6.0, 7.0]];
//!
//! assert_eq!(&a * &b, matrix![[16.0, 19.0], [36.0, 43.0]]);
//! assert_eq!(Matrix::ones(2, 2).unwrap() * 2.0, matrix![[2.0, 2.0], [2.0, 2.0]]);
//! assert!(a.checked_add(&matrix![[1.0, 2.0]]).is_err());
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::many_single_char_names,
    clippy::cast_possible_truncation,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::module_name_repetitions
)]
#![deny(unsafe_code)]
#![forbid(unused_must_use)]
#![warn(missing_docs)]

pub mod approx;
pub mod backend;
pub mod error;
pub mod init;
pub mod matrix;
pub mod nn;
pub mod ops;
pub mod shape;

pub use crate::backend::{
    ComputeContext, ComputeMode, compute_device, get_compute_mode, set_compute_mode,
};
pub use crate::error::{MatrixError, Result};
pub use crate::init::InitializationPolicy;
pub use crate::matrix::Matrix;
#[cfg(feature = "wgpu")]
pub use crate::ops::{GpuDevice, GpuOptions};
pub use crate::ops::{ComputeDevice, CpuDevice};
pub use crate::shape::Shape;
