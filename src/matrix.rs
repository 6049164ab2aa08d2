//! The dense row-major [`Matrix`] and its arithmetic surface.
//!
//! Arithmetic comes in three flavours:
//!
//! - `*_with(device, ..)` validates operands and runs on an explicit device
//! - `checked_*` does the same on the device selected by
//!   [`set_compute_mode`](crate::set_compute_mode)
//! - the `std::ops` operators call `checked_*` and panic on failure

use crate::backend::compute_device;
use crate::error::{MatrixError, Result};
use crate::init::InitializationPolicy;
use crate::ops::ComputeDevice;
use crate::ops::cpu;
use crate::shape::Shape;
use core::fmt;
use core::ops::Index;
use rand::Rng;

/// A two-dimensional matrix of `f32` values stored in row-major order.
///
/// Element `(r, c)` lives at `elements[r * columns + c]`. A matrix owns its
/// buffer exclusively and operations never modify their operands.
///
/// Equality compares shapes and then every element with `==`, so two matrices
/// holding `NaN` are never equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    shape: Shape,
    elements: Vec<f32>,
}

impl Matrix {
    /// Assembles a matrix from a shape and a buffer of matching length.
    pub(crate) fn from_parts(shape: Shape, elements: Vec<f32>) -> Self {
        debug_assert_eq!(shape.count(), elements.len());
        Self { shape, elements }
    }

    /// A matrix of the given shape with every element set to `value`.
    #[must_use]
    pub fn full(shape: Shape, value: f32) -> Self {
        Self::from_parts(shape, vec![value; shape.count()])
    }

    /// A `rows × columns` matrix with every element set to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Initialization`] if either dimension is zero or the
    /// element count overflows.
    pub fn filled(rows: usize, columns: usize, value: f32) -> Result<Self> {
        Ok(Self::full(Shape::new(rows, columns)?, value))
    }

    /// A `rows × columns` matrix of zeros.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Initialization`] if either dimension is zero or the
    /// element count overflows.
    ///
    /// # Example
    ///
    /// ```
    /// use mlkit::Matrix;
    ///
    /// let z = Matrix::zeros(2, 3).unwrap();
    /// assert_eq!(z.sum(), 0.0);
    /// assert!(Matrix::zeros(0, 3).is_err());
    /// ```
    pub fn zeros(rows: usize, columns: usize) -> Result<Self> {
        Self::filled(rows, columns, 0.0)
    }

    /// A `rows × columns` matrix of ones.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Initialization`] if either dimension is zero or the
    /// element count overflows.
    pub fn ones(rows: usize, columns: usize) -> Result<Self> {
        Self::filled(rows, columns, 1.0)
    }

    /// Wraps a row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Initialization`] if either dimension is zero or
    /// `elements.len() != rows * columns`.
    pub fn from_vec(rows: usize, columns: usize, elements: Vec<f32>) -> Result<Self> {
        let shape = Shape::new(rows, columns)?;
        if elements.len() != shape.count() {
            return Err(MatrixError::initialization(format!(
                "{} elements cannot fill a {shape} matrix",
                elements.len()
            )));
        }
        Ok(Self::from_parts(shape, elements))
    }

    /// Builds a matrix from a list of rows.
    ///
    /// Every row must have the same, non-zero length; that length becomes the
    /// column count. Ragged input is rejected rather than padded or truncated.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Initialization`] on empty or ragged input.
    ///
    /// # Example
    ///
    /// ```
    /// use mlkit::Matrix;
    ///
    /// let m = Matrix::from_nested(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
    /// assert_eq!(m.at(1, 0).unwrap(), 3.0);
    ///
    /// let ragged: [&[f32]; 2] = [&[1.0, 2.0], &[3.0]];
    /// assert!(Matrix::from_nested(&ragged).is_err());
    /// ```
    pub fn from_nested<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(MatrixError::initialization("nested input has no rows"));
        };
        let columns = first.as_ref().len();
        let shape = Shape::new(rows.len(), columns)?;

        let mut elements = Vec::with_capacity(shape.count());
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != columns {
                return Err(MatrixError::initialization(format!(
                    "row {r} has {} columns, expected {columns}",
                    row.len()
                )));
            }
            elements.extend_from_slice(row);
        }
        Ok(Self::from_parts(shape, elements))
    }

    /// A matrix filled according to `policy`, drawing from the thread-local RNG.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Initialization`] if the policy bounds are invalid.
    pub fn with_policy(shape: Shape, policy: InitializationPolicy) -> Result<Self> {
        Self::with_policy_rng(shape, policy, &mut rand::rng())
    }

    /// Like [`Matrix::with_policy`] with an explicit random source.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Initialization`] if the policy bounds are invalid.
    pub fn with_policy_rng<R: Rng>(
        shape: Shape,
        policy: InitializationPolicy,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(Self::from_parts(shape, policy.fill(shape, rng)?))
    }

    /// The shape of this matrix.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.shape.rows()
    }

    /// Number of columns.
    #[must_use]
    pub const fn columns(&self) -> usize {
        self.shape.columns()
    }

    /// Number of elements.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.shape.count()
    }

    /// The row-major element buffer.
    #[must_use]
    pub fn elements(&self) -> &[f32] {
        &self.elements
    }

    /// Consumes the matrix and returns its row-major buffer.
    #[must_use]
    pub fn into_elements(self) -> Vec<f32> {
        self.elements
    }

    fn offset(&self, row: usize, column: usize) -> Result<usize> {
        if row >= self.rows() || column >= self.columns() {
            return Err(MatrixError::Index {
                row,
                column,
                shape: self.shape,
            });
        }
        Ok(row * self.columns() + column)
    }

    /// The element at `(row, column)`.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Index`] if the position lies outside the matrix.
    pub fn at(&self, row: usize, column: usize) -> Result<f32> {
        self.offset(row, column).map(|i| self.elements[i])
    }

    /// A new `columns × rows` matrix with `result[(c, r)] == self[(r, c)]`.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let (rows, columns) = (self.rows(), self.columns());
        let mut out = Vec::with_capacity(self.count());
        for c in 0..columns {
            out.extend((0..rows).map(|r| self.elements[r * columns + c]));
        }
        Self::from_parts(self.shape.transposed(), out)
    }

    /// Sum of all elements.
    ///
    /// Always evaluated on the CPU, whatever the active compute mode.
    #[must_use]
    pub fn sum(&self) -> f32 {
        cpu::sum_of(&self.elements)
    }

    /// Sum of the absolute values of all elements.
    ///
    /// Always evaluated on the CPU, whatever the active compute mode.
    #[must_use]
    pub fn absolute_sum(&self) -> f32 {
        cpu::absolute_sum_of(&self.elements)
    }

    /// Whether both matrices share a shape and every pair of elements is
    /// within `tolerance` (absolute below magnitude 1, relative above).
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f32) -> bool {
        self.shape == other.shape && crate::approx::within(&self.elements, &other.elements, tolerance)
    }

    /// Elementwise `e^x` on the active device.
    ///
    /// # Errors
    ///
    /// Fails if the active device is unavailable or the kernel fails.
    pub fn exponentiate(&self) -> Result<Self> {
        compute_device()?.exponentiate(self)
    }

    /// Elementwise `e^x` on `device`.
    ///
    /// # Errors
    ///
    /// Fails if the kernel fails.
    pub fn exponentiate_with(&self, device: &dyn ComputeDevice) -> Result<Self> {
        device.exponentiate(self)
    }
}

fn mismatch(
    operation: &'static str,
    requirement: &'static str,
    lhs: &Matrix,
    rhs: &Matrix,
) -> MatrixError {
    MatrixError::Dimension {
        operation,
        requirement,
        lhs: lhs.shape,
        rhs: rhs.shape,
    }
}

fn same_shape(operation: &'static str, lhs: &Matrix, rhs: &Matrix) -> Result<()> {
    if lhs.shape == rhs.shape {
        Ok(())
    } else {
        Err(mismatch(operation, "shapes must be identical", lhs, rhs))
    }
}

/// Validated arithmetic against an explicit device.
impl Matrix {
    /// `self + rhs` on `device`.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Dimension`] unless the shapes are identical.
    pub fn checked_add_with(&self, device: &dyn ComputeDevice, rhs: &Self) -> Result<Self> {
        same_shape("add", self, rhs)?;
        device.add(self, rhs)
    }

    /// `self - rhs` on `device`.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Dimension`] unless the shapes are identical.
    pub fn checked_sub_with(&self, device: &dyn ComputeDevice, rhs: &Self) -> Result<Self> {
        same_shape("subtract", self, rhs)?;
        device.subtract(self, rhs)
    }

    /// The matrix product `self × rhs` on `device`.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Dimension`] if `self.columns() != rhs.rows()`.
    pub fn checked_mul_with(&self, device: &dyn ComputeDevice, rhs: &Self) -> Result<Self> {
        if self.columns() != rhs.rows() {
            return Err(mismatch(
                "multiply",
                "lhs columns must equal rhs rows",
                self,
                rhs,
            ));
        }
        device.multiply(self, rhs)
    }

    /// Every element multiplied by `c`, on `device`.
    ///
    /// # Errors
    ///
    /// Fails only if the kernel fails.
    pub fn checked_scale_with(&self, device: &dyn ComputeDevice, c: f32) -> Result<Self> {
        device.scale(self, c)
    }

    /// Elementwise `self / rhs` on `device`.
    ///
    /// Zero elements in `rhs` produce infinities or `NaN`.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Dimension`] unless the shapes are identical and
    /// `rhs` is square.
    pub fn checked_div_with(&self, device: &dyn ComputeDevice, rhs: &Self) -> Result<Self> {
        same_shape("divide", self, rhs)?;
        if !rhs.shape.is_square() {
            return Err(mismatch("divide", "divisor must be square", self, rhs));
        }
        device.divide(self, rhs)
    }

    /// Every element divided by `c`, on `device`.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::DivisionByZero`] if `c == 0`.
    pub fn checked_div_scalar_with(&self, device: &dyn ComputeDevice, c: f32) -> Result<Self> {
        if c == 0.0 {
            return Err(MatrixError::DivisionByZero);
        }
        device.scale(self, c.recip())
    }

    /// Elementwise floating remainder `self % rhs` on `device`; the result
    /// takes the sign of `self`.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Dimension`] unless the shapes are identical.
    pub fn checked_rem_with(&self, device: &dyn ComputeDevice, rhs: &Self) -> Result<Self> {
        same_shape("modulo", self, rhs)?;
        device.modulo(self, rhs)
    }
}

/// Validated arithmetic on the active device.
impl Matrix {
    /// `self + rhs`.
    ///
    /// # Errors
    ///
    /// See [`Matrix::checked_add_with`]; also fails if the active device is
    /// unavailable.
    pub fn checked_add(&self, rhs: &Self) -> Result<Self> {
        self.checked_add_with(compute_device()?, rhs)
    }

    /// `self - rhs`.
    ///
    /// # Errors
    ///
    /// See [`Matrix::checked_sub_with`]; also fails if the active device is
    /// unavailable.
    pub fn checked_sub(&self, rhs: &Self) -> Result<Self> {
        self.checked_sub_with(compute_device()?, rhs)
    }

    /// The matrix product `self × rhs`.
    ///
    /// # Errors
    ///
    /// See [`Matrix::checked_mul_with`]; also fails if the active device is
    /// unavailable.
    ///
    /// # Example
    ///
    /// ```
    /// use mlkit::matrix;
    ///
    /// let a = matrix![[1.0, 2.0], [3.0, 4.0]];
    /// let b = matrix![[4.0, 5.0], [6.0, 7.0]];
    /// assert_eq!(a.checked_mul(&b).unwrap(), matrix![[16.0, 19.0], [36.0, 43.0]]);
    /// assert!(a.checked_mul(&matrix![[1.0, 2.0]]).is_err());
    /// ```
    pub fn checked_mul(&self, rhs: &Self) -> Result<Self> {
        self.checked_mul_with(compute_device()?, rhs)
    }

    /// Every element multiplied by `c`.
    ///
    /// # Errors
    ///
    /// Fails if the active device is unavailable.
    pub fn checked_scale(&self, c: f32) -> Result<Self> {
        self.checked_scale_with(compute_device()?, c)
    }

    /// Elementwise `self / rhs`.
    ///
    /// # Errors
    ///
    /// See [`Matrix::checked_div_with`]; also fails if the active device is
    /// unavailable.
    pub fn checked_div(&self, rhs: &Self) -> Result<Self> {
        self.checked_div_with(compute_device()?, rhs)
    }

    /// Every element divided by `c`.
    ///
    /// # Errors
    ///
    /// See [`Matrix::checked_div_scalar_with`]; also fails if the active device
    /// is unavailable.
    pub fn checked_div_scalar(&self, c: f32) -> Result<Self> {
        self.checked_div_scalar_with(compute_device()?, c)
    }

    /// Elementwise floating remainder `self % rhs`.
    ///
    /// # Errors
    ///
    /// See [`Matrix::checked_rem_with`]; also fails if the active device is
    /// unavailable.
    pub fn checked_rem(&self, rhs: &Self) -> Result<Self> {
        self.checked_rem_with(compute_device()?, rhs)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    /// # Panics
    ///
    /// Panics if the position lies outside the matrix.
    fn index(&self, (row, column): (usize, usize)) -> &f32 {
        match self.offset(row, column) {
            Ok(i) => &self.elements[i],
            Err(e) => panic!("{e}"),
        }
    }
}

impl fmt::Display for Matrix {
    /// One line per row, elements separated by tabs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (r, row) in self.elements.chunks(self.columns()).enumerate() {
            if r > 0 {
                writeln!(f)?;
            }
            for (c, x) in row.iter().enumerate() {
                if c > 0 {
                    f.write_str("\t")?;
                }
                fmt::Display::fmt(x, f)?;
            }
        }
        Ok(())
    }
}

macro_rules! matrix_binary_op {
    ($trait:ident, $method:ident, $checked:ident, $sym:literal) => {
        impl core::ops::$trait<&Matrix> for &Matrix {
            type Output = Matrix;

            fn $method(self, rhs: &Matrix) -> Matrix {
                match self.$checked(rhs) {
                    Ok(m) => m,
                    Err(e) => panic!(concat!("Matrix ", $sym, " Matrix: {}"), e),
                }
            }
        }

        impl core::ops::$trait<Matrix> for Matrix {
            type Output = Matrix;

            fn $method(self, rhs: Matrix) -> Matrix {
                core::ops::$trait::$method(&self, &rhs)
            }
        }

        impl core::ops::$trait<&Matrix> for Matrix {
            type Output = Matrix;

            fn $method(self, rhs: &Matrix) -> Matrix {
                core::ops::$trait::$method(&self, rhs)
            }
        }

        impl core::ops::$trait<Matrix> for &Matrix {
            type Output = Matrix;

            fn $method(self, rhs: Matrix) -> Matrix {
                core::ops::$trait::$method(self, &rhs)
            }
        }
    };
}

matrix_binary_op!(Add, add, checked_add, "+");
matrix_binary_op!(Sub, sub, checked_sub, "-");
matrix_binary_op!(Mul, mul, checked_mul, "*");
matrix_binary_op!(Div, div, checked_div, "/");
matrix_binary_op!(Rem, rem, checked_rem, "%");

macro_rules! matrix_scalar_op {
    ($trait:ident, $method:ident, $checked:ident, $sym:literal) => {
        impl core::ops::$trait<f32> for &Matrix {
            type Output = Matrix;

            fn $method(self, c: f32) -> Matrix {
                match self.$checked(c) {
                    Ok(m) => m,
                    Err(e) => panic!(concat!("Matrix ", $sym, " f32: {}"), e),
                }
            }
        }

        impl core::ops::$trait<f32> for Matrix {
            type Output = Matrix;

            fn $method(self, c: f32) -> Matrix {
                core::ops::$trait::$method(&self, c)
            }
        }
    };
}

matrix_scalar_op!(Mul, mul, checked_scale, "*");
matrix_scalar_op!(Div, div, checked_div_scalar, "/");

impl core::ops::Mul<&Matrix> for f32 {
    type Output = Matrix;

    fn mul(self, m: &Matrix) -> Matrix {
        m * self
    }
}

impl core::ops::Mul<Matrix> for f32 {
    type Output = Matrix;

    fn mul(self, m: Matrix) -> Matrix {
        &m * self
    }
}

impl core::ops::Neg for &Matrix {
    type Output = Matrix;

    fn neg(self) -> Matrix {
        self * -1.0
    }
}

impl core::ops::Neg for Matrix {
    type Output = Matrix;

    fn neg(self) -> Matrix {
        &self * -1.0
    }
}

/// Builds a [`Matrix`] from nested row literals.
///
/// Every element is converted with `as f32`.
///
/// # Panics
///
/// Panics if the rows have different lengths.
///
/// # Example
///
/// ```
/// use mlkit::matrix;
///
/// let m = matrix![[1, 2, 3], [4, 5, 6]];
/// assert_eq!(m.shape().rows(), 2);
/// assert_eq!(m[(1, 2)], 6.0);
/// ```
#[macro_export]
macro_rules! matrix {
    ($( [ $( $x:expr ),+ $(,)? ] ),+ $(,)?) => {
        match $crate::Matrix::from_nested(&[ $( &[ $( $x as f32 ),+ ][..] ),+ ]) {
            Ok(m) => m,
            Err(e) => panic!("ragged matrix literal: {}", e),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::CpuDevice;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn constructors_reject_zero_dimensions() {
        assert!(Matrix::zeros(0, 2).is_err());
        assert!(Matrix::ones(2, 0).is_err());
        assert!(Matrix::from_vec(0, 0, vec![]).is_err());
    }

    #[test]
    fn from_vec_checks_length() {
        assert!(Matrix::from_vec(2, 2, vec![1.0; 3]).is_err());
        let m = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(m[(1, 1)], 4.0);
    }

    #[test]
    fn from_nested_rejects_ragged_and_empty() {
        let ragged: Vec<Vec<f32>> = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            Matrix::from_nested(&ragged),
            Err(MatrixError::Initialization { .. })
        ));
        let empty: [[f32; 2]; 0] = [];
        assert!(Matrix::from_nested(&empty).is_err());
        let no_columns: [[f32; 0]; 2] = [[], []];
        assert!(Matrix::from_nested(&no_columns).is_err());
    }

    #[test]
    fn at_is_bounds_checked() {
        let m = matrix![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(m.at(0, 1).unwrap(), 2.0);
        assert_eq!(
            m.at(2, 0),
            Err(MatrixError::Index {
                row: 2,
                column: 0,
                shape: m.shape()
            })
        );
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn index_panics_out_of_range() {
        let m = matrix![[1.0]];
        let _ = m[(0, 1)];
    }

    #[test]
    fn transpose_swaps_positions() {
        let m = matrix![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let t = m.transpose();
        assert_eq!(t, matrix![[1.0, 4.0], [2.0, 5.0], [3.0, 6.0]]);
        assert_eq!(t.transpose(), m);
    }

    #[test]
    fn reductions() {
        let m = matrix![[1.0, -2.0], [-3.0, 4.0]];
        assert_eq!(m.sum(), 0.0);
        assert_eq!(m.absolute_sum(), 10.0);
    }

    #[test]
    fn add_requires_identical_shapes() {
        let a = matrix![[1.0, 2.0]];
        let b = matrix![[1.0], [2.0]];
        let err = a.checked_add_with(&CpuDevice, &b).unwrap_err();
        assert!(matches!(err, MatrixError::Dimension { operation: "add", .. }));
    }

    #[test]
    fn product_requires_inner_dimensions() {
        let a = Matrix::ones(2, 3).unwrap();
        let b = Matrix::ones(2, 3).unwrap();
        assert!(a.checked_mul_with(&CpuDevice, &b).is_err());
        let p = a.checked_mul_with(&CpuDevice, &b.transpose()).unwrap();
        assert_eq!(p, Matrix::filled(2, 2, 3.0).unwrap());
    }

    #[test]
    fn division_requires_square_divisor() {
        let a = Matrix::ones(2, 3).unwrap();
        let err = a.checked_div_with(&CpuDevice, &a).unwrap_err();
        assert!(matches!(
            err,
            MatrixError::Dimension {
                requirement: "divisor must be square",
                ..
            }
        ));

        let q = matrix![[2.0, 4.0], [6.0, 8.0]]
            .checked_div_with(&CpuDevice, &matrix![[2.0, 2.0], [3.0, 4.0]])
            .unwrap();
        assert_eq!(q, matrix![[1.0, 2.0], [2.0, 2.0]]);
    }

    #[test]
    fn division_by_zero_element_is_ieee() {
        let q = matrix![[1.0, 0.0], [-1.0, 1.0]]
            .checked_div_with(&CpuDevice, &matrix![[0.0, 0.0], [0.0, 1.0]])
            .unwrap();
        assert_eq!(q[(0, 0)], f32::INFINITY);
        assert!(q[(0, 1)].is_nan());
        assert_eq!(q[(1, 0)], f32::NEG_INFINITY);
    }

    #[test]
    fn scalar_division_by_zero_fails() {
        let m = Matrix::ones(2, 2).unwrap();
        assert_eq!(
            m.checked_div_scalar_with(&CpuDevice, 0.0),
            Err(MatrixError::DivisionByZero)
        );
        let half = m.checked_div_scalar_with(&CpuDevice, 2.0).unwrap();
        assert_eq!(half, Matrix::filled(2, 2, 0.5).unwrap());
    }

    #[test]
    fn remainder_keeps_dividend_sign() {
        let r = matrix![[5.5, -5.5]]
            .checked_rem_with(&CpuDevice, &matrix![[2.0, 2.0]])
            .unwrap();
        assert_eq!(r, matrix![[1.5, -1.5]]);
    }

    #[test]
    fn operators_on_default_cpu_mode() {
        let a = matrix![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(&a + &a, matrix![[2.0, 4.0], [6.0, 8.0]]);
        assert_eq!(&a - &a, Matrix::zeros(2, 2).unwrap());
        assert_eq!(2.0 * &a, &a * 2.0);
        assert_eq!(-a.clone(), matrix![[-1.0, -2.0], [-3.0, -4.0]]);
        assert_eq!(a.clone() / 2.0, matrix![[0.5, 1.0], [1.5, 2.0]]);
    }

    #[test]
    #[should_panic(expected = "Matrix + Matrix")]
    fn operator_panics_on_mismatch() {
        let _ = Matrix::ones(1, 2).unwrap() + Matrix::ones(2, 1).unwrap();
    }

    #[test]
    fn seeded_policy_is_reproducible() {
        let shape = Shape::new(3, 3).unwrap();
        let policy = InitializationPolicy::Random { min: -1.0, max: 1.0 };
        let a = Matrix::with_policy_rng(shape, policy, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = Matrix::with_policy_rng(shape, policy, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
        assert!(Matrix::with_policy(shape, InitializationPolicy::Xavier).is_ok());
    }

    #[test]
    fn display_is_tab_separated_rows() {
        let m = matrix![[1.0, 2.5], [-3.0, 4.0]];
        assert_eq!(m.to_string(), "1\t2.5\n-3\t4");
    }

    #[test]
    fn approx_eq_tolerates_small_differences() {
        let a = matrix![[1.0, 2.0]];
        let b = matrix![[1.00001, 2.00001]];
        assert!(a.approx_eq(&b, 1e-4));
        assert!(!a.approx_eq(&matrix![[1.0], [2.0]], 1e-4));
    }
}
