//! Parallel CPU backend
//!
//! # CPU Backend
//!
//! The default device. Every kernel is a streaming loop over the flat
//! row-major buffer, split across threads with [`rayon`](https://docs.rs/rayon).
//!
//! ## Features
//!
//! - Parallel execution using `rayon`; short buffers stay on one thread
//! - Optional AVX2 lanes for add, subtract, scale, relu and the matrix product
//!   (enabled via the `simd` feature flag on AVX2 targets)
//! - Pure Rust fallback path when SIMD is disabled or unavailable
//!
//! ## Safety
//!
//! - SIMD paths use `unsafe` loads and stores and assume AVX2 is enabled at
//!   compile time (`-C target-feature=+avx2`)

use super::ComputeDevice;
use crate::Matrix;
use crate::backend::ComputeMode;
use crate::error::Result;
use rayon::prelude::*;

/// Buffers shorter than this are processed by a single rayon task.
const MIN_PARALLEL_LEN: usize = 1 << 12;

/// The CPU compute device.
///
/// Stateless; a single static instance serves the whole process.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuDevice;

impl CpuDevice {
    /// Creates the CPU device.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn map_unary<F>(a: &Matrix, f: F) -> Matrix
where
    F: Fn(f32) -> f32 + Sync + Send,
{
    let data = a
        .elements()
        .par_iter()
        .with_min_len(MIN_PARALLEL_LEN)
        .map(|&x| f(x))
        .collect();
    Matrix::from_parts(a.shape(), data)
}

fn zip_binary<F>(a: &Matrix, b: &Matrix, f: F) -> Matrix
where
    F: Fn(f32, f32) -> f32 + Sync + Send,
{
    let data = a
        .elements()
        .par_iter()
        .zip(b.elements().par_iter())
        .with_min_len(MIN_PARALLEL_LEN)
        .map(|(&x, &y)| f(x, y))
        .collect();
    Matrix::from_parts(a.shape(), data)
}

/// Sequential left-to-right sum, so results do not depend on thread scheduling.
pub(crate) fn sum_of(elements: &[f32]) -> f32 {
    elements.iter().sum()
}

pub(crate) fn absolute_sum_of(elements: &[f32]) -> f32 {
    elements.iter().map(|x| x.abs()).sum()
}

/// `1 / (1 + e^-x)`, evaluated as negate, exponentiate, add one, reciprocal.
#[inline]
fn sigmoid_scalar(x: f32) -> f32 {
    let negated = -x;
    let exponent = negated.exp();
    let denominator = exponent + 1.0;
    denominator.recip()
}

impl ComputeDevice for CpuDevice {
    fn mode(&self) -> ComputeMode {
        ComputeMode::Cpu
    }

    fn name(&self) -> &str {
        "cpu"
    }

    fn add(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        #[cfg(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2"))]
        {
            let mut out = vec![0.0; a.count()];
            lanes::zip_into(&mut out, a.elements(), b.elements(), lanes::Op::Add);
            Ok(Matrix::from_parts(a.shape(), out))
        }

        #[cfg(not(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2")))]
        {
            Ok(zip_binary(a, b, |x, y| x + y))
        }
    }

    fn subtract(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        #[cfg(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2"))]
        {
            let mut out = vec![0.0; a.count()];
            lanes::zip_into(&mut out, a.elements(), b.elements(), lanes::Op::Subtract);
            Ok(Matrix::from_parts(a.shape(), out))
        }

        #[cfg(not(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2")))]
        {
            Ok(zip_binary(a, b, |x, y| x - y))
        }
    }

    /// Row-parallel `i-k-j` contraction: each output row accumulates
    /// `a[i, l] * b[l, ..]` for increasing `l`.
    fn multiply(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        let (m, k, n) = (a.rows(), a.columns(), b.columns());
        let a_data = a.elements();
        let b_data = b.elements();

        let mut out = vec![0.0f32; m * n];

        out.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
            let a_row = &a_data[i * k..(i + 1) * k];
            for (l, &a_il) in a_row.iter().enumerate() {
                let b_row = &b_data[l * n..(l + 1) * n];

                #[cfg(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2"))]
                lanes::axpy(row, a_il, b_row);

                #[cfg(not(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2")))]
                for (o, &b_lj) in row.iter_mut().zip(b_row) {
                    *o += a_il * b_lj;
                }
            }
        });

        let shape = crate::Shape::new(m, n)?;
        Ok(Matrix::from_parts(shape, out))
    }

    fn scale(&self, a: &Matrix, c: f32) -> Result<Matrix> {
        #[cfg(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2"))]
        {
            let mut out = vec![0.0; a.count()];
            lanes::scale_into(&mut out, a.elements(), c);
            Ok(Matrix::from_parts(a.shape(), out))
        }

        #[cfg(not(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2")))]
        {
            Ok(map_unary(a, |x| x * c))
        }
    }

    fn divide(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        Ok(zip_binary(a, b, |x, y| x / y))
    }

    fn modulo(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        Ok(zip_binary(a, b, |x, y| x % y))
    }

    fn sum(&self, a: &Matrix) -> Result<f32> {
        Ok(sum_of(a.elements()))
    }

    fn absolute_sum(&self, a: &Matrix) -> Result<f32> {
        Ok(absolute_sum_of(a.elements()))
    }

    fn exponentiate(&self, a: &Matrix) -> Result<Matrix> {
        Ok(map_unary(a, f32::exp))
    }

    fn sigmoid(&self, a: &Matrix) -> Result<Matrix> {
        Ok(map_unary(a, sigmoid_scalar))
    }

    fn sigmoid_derivative(&self, a: &Matrix) -> Result<Matrix> {
        Ok(map_unary(a, |x| {
            let s = sigmoid_scalar(x);
            s * (1.0 - s)
        }))
    }

    fn tanh(&self, a: &Matrix) -> Result<Matrix> {
        Ok(map_unary(a, f32::tanh))
    }

    fn tanh_derivative(&self, a: &Matrix) -> Result<Matrix> {
        Ok(map_unary(a, |x| {
            let t = x.tanh();
            1.0 - t * t
        }))
    }

    fn relu(&self, a: &Matrix) -> Result<Matrix> {
        #[cfg(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2"))]
        {
            let mut out = vec![0.0; a.count()];
            lanes::relu_into(&mut out, a.elements());
            Ok(Matrix::from_parts(a.shape(), out))
        }

        #[cfg(not(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2")))]
        {
            Ok(map_unary(a, |x| if x > 0.0 { x } else { 0.0 }))
        }
    }

    fn relu_derivative(&self, a: &Matrix) -> Result<Matrix> {
        Ok(map_unary(a, |x| if x > 0.0 { 1.0 } else { 0.0 }))
    }
}

/// AVX2 lanes over `f32`.
#[cfg(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2"))]
#[allow(unsafe_code)]
mod lanes {
    use super::MIN_PARALLEL_LEN;
    use core::arch::x86_64::{
        _mm256_add_ps, _mm256_loadu_ps, _mm256_max_ps, _mm256_mul_ps, _mm256_set1_ps,
        _mm256_setzero_ps, _mm256_storeu_ps, _mm256_sub_ps,
    };
    use rayon::prelude::*;

    const LANES: usize = 8;

    #[derive(Clone, Copy)]
    pub(super) enum Op {
        Add,
        Subtract,
    }

    pub(super) fn zip_into(out: &mut [f32], a: &[f32], b: &[f32], op: Op) {
        out.par_chunks_mut(MIN_PARALLEL_LEN)
            .zip(a.par_chunks(MIN_PARALLEL_LEN))
            .zip(b.par_chunks(MIN_PARALLEL_LEN))
            .for_each(|((o, x), y)| {
                let whole = o.len() - o.len() % LANES;
                for idx in (0..whole).step_by(LANES) {
                    unsafe {
                        let xv = _mm256_loadu_ps(x.as_ptr().add(idx));
                        let yv = _mm256_loadu_ps(y.as_ptr().add(idx));
                        let r = match op {
                            Op::Add => _mm256_add_ps(xv, yv),
                            Op::Subtract => _mm256_sub_ps(xv, yv),
                        };
                        _mm256_storeu_ps(o.as_mut_ptr().add(idx), r);
                    }
                }
                for idx in whole..o.len() {
                    o[idx] = match op {
                        Op::Add => x[idx] + y[idx],
                        Op::Subtract => x[idx] - y[idx],
                    };
                }
            });
    }

    pub(super) fn scale_into(out: &mut [f32], a: &[f32], c: f32) {
        out.par_chunks_mut(MIN_PARALLEL_LEN)
            .zip(a.par_chunks(MIN_PARALLEL_LEN))
            .for_each(|(o, x)| {
                let whole = o.len() - o.len() % LANES;
                unsafe {
                    let cv = _mm256_set1_ps(c);
                    for idx in (0..whole).step_by(LANES) {
                        let xv = _mm256_loadu_ps(x.as_ptr().add(idx));
                        _mm256_storeu_ps(o.as_mut_ptr().add(idx), _mm256_mul_ps(xv, cv));
                    }
                }
                for idx in whole..o.len() {
                    o[idx] = x[idx] * c;
                }
            });
    }

    pub(super) fn relu_into(out: &mut [f32], a: &[f32]) {
        out.par_chunks_mut(MIN_PARALLEL_LEN)
            .zip(a.par_chunks(MIN_PARALLEL_LEN))
            .for_each(|(o, x)| {
                let whole = o.len() - o.len() % LANES;
                unsafe {
                    let zero = _mm256_setzero_ps();
                    for idx in (0..whole).step_by(LANES) {
                        let xv = _mm256_loadu_ps(x.as_ptr().add(idx));
                        _mm256_storeu_ps(o.as_mut_ptr().add(idx), _mm256_max_ps(xv, zero));
                    }
                }
                for idx in whole..o.len() {
                    o[idx] = if x[idx] > 0.0 { x[idx] } else { 0.0 };
                }
            });
    }

    /// `row += alpha * b_row`
    pub(super) fn axpy(row: &mut [f32], alpha: f32, b_row: &[f32]) {
        let whole = row.len() - row.len() % LANES;
        unsafe {
            let av = _mm256_set1_ps(alpha);
            for idx in (0..whole).step_by(LANES) {
                let bv = _mm256_loadu_ps(b_row.as_ptr().add(idx));
                let ov = _mm256_loadu_ps(row.as_ptr().add(idx));
                let r = _mm256_add_ps(ov, _mm256_mul_ps(av, bv));
                _mm256_storeu_ps(row.as_mut_ptr().add(idx), r);
            }
        }
        for idx in whole..row.len() {
            row[idx] += alpha * b_row[idx];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix;

    #[test]
    fn add_and_subtract() {
        let a = matrix![[1.0, 2.0], [3.0, 4.0]];
        let b = matrix![[0.0, 1.0], [2.0, 3.0]];
        let cpu = CpuDevice::new();
        assert_eq!(cpu.add(&a, &a).unwrap(), matrix![[2.0, 4.0], [6.0, 8.0]]);
        assert_eq!(cpu.subtract(&a, &b).unwrap(), matrix![[1.0, 1.0], [1.0, 1.0]]);
    }

    #[test]
    fn multiply_rectangular() {
        let a = matrix![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let b = matrix![[7.0, 8.0], [9.0, 10.0], [11.0, 12.0]];
        let c = CpuDevice.multiply(&a, &b).unwrap();
        assert_eq!(c, matrix![[58.0, 64.0], [139.0, 154.0]]);
    }

    #[test]
    fn multiply_large_crosses_parallel_threshold() {
        let n = 70;
        let a = Matrix::filled(n, n, 1.0).unwrap();
        let b = Matrix::filled(n, n, 2.0).unwrap();
        let c = CpuDevice.multiply(&a, &b).unwrap();
        #[allow(clippy::cast_precision_loss)]
        let expected = 2.0 * n as f32;
        assert!(c.elements().iter().all(|&x| x == expected));
    }

    #[test]
    fn scale_matches_scalar_loop() {
        let a = Matrix::from_vec(1, 19, (0..19).map(|i| i as f32).collect()).unwrap();
        let scaled = CpuDevice.scale(&a, -0.5).unwrap();
        for (i, &x) in scaled.elements().iter().enumerate() {
            assert_eq!(x, i as f32 * -0.5);
        }
    }

    #[test]
    fn divide_and_modulo() {
        let a = matrix![[7.0, -7.0], [9.0, 1.0]];
        let b = matrix![[2.0, 2.0], [3.0, 4.0]];
        assert_eq!(
            CpuDevice.divide(&a, &b).unwrap(),
            matrix![[3.5, -3.5], [3.0, 0.25]]
        );
        assert_eq!(
            CpuDevice.modulo(&a, &b).unwrap(),
            matrix![[1.0, -1.0], [0.0, 1.0]]
        );
    }

    #[test]
    fn reductions() {
        let a = matrix![[1.0, -2.0], [3.0, -4.0]];
        assert_eq!(CpuDevice.sum(&a).unwrap(), -2.0);
        assert_eq!(CpuDevice.absolute_sum(&a).unwrap(), 10.0);
    }

    #[test]
    fn sigmoid_of_zero_is_half() {
        let a = matrix![[0.0]];
        assert_eq!(CpuDevice.sigmoid(&a).unwrap()[(0, 0)], 0.5);
        assert_eq!(CpuDevice.sigmoid_derivative(&a).unwrap()[(0, 0)], 0.25);
    }

    #[test]
    fn tanh_derivative_is_one_minus_square() {
        let a = matrix![[0.0, 0.5, -1.5]];
        let d = CpuDevice.tanh_derivative(&a).unwrap();
        for (i, &x) in a.elements().iter().enumerate() {
            let t = x.tanh();
            assert!((d.elements()[i] - (1.0 - t * t)).abs() < 1e-6);
        }
    }

    #[test]
    fn relu_and_derivative() {
        let a = matrix![[-1.0, 0.0, 2.5, -3.3]];
        assert_eq!(CpuDevice.relu(&a).unwrap(), matrix![[0.0, 0.0, 2.5, 0.0]]);
        assert_eq!(
            CpuDevice.relu_derivative(&a).unwrap(),
            matrix![[0.0, 0.0, 1.0, 0.0]]
        );
    }

    #[test]
    fn exponentiate_elementwise() {
        let a = matrix![[1.0, 2.0], [3.0, 4.0]];
        let e = CpuDevice.exponentiate(&a).unwrap();
        for (x, y) in a.elements().iter().zip(e.elements()) {
            assert!((x.exp() - y).abs() < 1e-4);
        }
    }
}
