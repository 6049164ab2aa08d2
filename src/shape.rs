//! Two-dimensional matrix shapes.

use crate::error::{MatrixError, Result};
use core::fmt;

/// Largest element count whose `f32` buffer stays within `isize::MAX` bytes.
const MAX_ELEMENTS: usize = isize::MAX.unsigned_abs() / size_of::<f32>();

/// The `(rows, columns)` pair describing a matrix.
///
/// Both dimensions are strictly positive and their product fits in a single
/// allocation of `f32`s; a `Shape` can only be obtained through
/// [`Shape::new`], which enforces both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    rows: usize,
    columns: usize,
}

impl Shape {
    /// Creates a shape with `rows` rows and `columns` columns.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Initialization`] if either dimension is zero or
    /// `rows * columns` elements could not be addressed.
    ///
    /// # Example
    ///
    /// ```
    /// use mlkit::Shape;
    ///
    /// let shape = Shape::new(2, 3).unwrap();
    /// assert_eq!(shape.count(), 6);
    /// assert!(Shape::new(0, 3).is_err());
    /// ```
    pub fn new(rows: usize, columns: usize) -> Result<Self> {
        if rows == 0 || columns == 0 {
            return Err(MatrixError::initialization(format!(
                "matrix must be at least 1x1, got {rows}x{columns}"
            )));
        }
        match rows.checked_mul(columns) {
            Some(count) if count <= MAX_ELEMENTS => Ok(Self { rows, columns }),
            _ => Err(MatrixError::initialization(format!(
                "{rows}x{columns} elements exceed the addressable size"
            ))),
        }
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    /// Total number of elements (`rows * columns`, never overflows).
    #[must_use]
    pub const fn count(&self) -> usize {
        self.rows * self.columns
    }

    /// Whether the shape has as many rows as columns.
    #[must_use]
    pub const fn is_square(&self) -> bool {
        self.rows == self.columns
    }

    /// The shape with rows and columns swapped.
    #[must_use]
    pub const fn transposed(&self) -> Self {
        Self {
            rows: self.columns,
            columns: self.rows,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.rows, self.columns)
    }
}
