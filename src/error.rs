//! Errors produced by matrix construction, validation and device dispatch.
//!
//! Everything that originates from caller-supplied data (shapes, indices,
//! initialization bounds, scalar divisors) is a recoverable [`MatrixError`].
//! Device errors describe the environment: once the GPU backend fails to
//! initialize it stays unusable for the owner of that device.

use crate::shape::Shape;
use thiserror::Error;

/// Errors that can occur while building or operating on a [`Matrix`](crate::Matrix).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    /// Operand shapes are incompatible for the requested operation.
    #[error("dimension mismatch in {operation}: {requirement} (lhs {lhs}, rhs {rhs})")]
    Dimension {
        /// The operation that rejected its operands.
        operation: &'static str,
        /// The rule the operands violated.
        requirement: &'static str,
        /// Shape of the left operand.
        lhs: Shape,
        /// Shape of the right operand.
        rhs: Shape,
    },

    /// A row or column index lies outside the matrix.
    #[error("index ({row}, {column}) is out of range for a {shape} matrix")]
    Index {
        /// Requested row.
        row: usize,
        /// Requested column.
        column: usize,
        /// Shape of the indexed matrix.
        shape: Shape,
    },

    /// A matrix could not be constructed from the given dimensions or data.
    #[error("invalid matrix initialization: {reason}")]
    Initialization {
        /// Why the construction was rejected.
        reason: String,
    },

    /// A matrix was divided by the scalar zero.
    #[error("division of a matrix by scalar zero")]
    DivisionByZero,

    /// The compute device is unavailable or its kernel library is incomplete.
    #[error("compute device unavailable: {reason}")]
    DeviceInitialization {
        /// Description of the underlying failure.
        reason: String,
    },

    /// A kernel was submitted but could not be executed or read back.
    #[error("kernel `{kernel}` failed: {reason}")]
    Dispatch {
        /// Name of the kernel that failed.
        kernel: &'static str,
        /// Description of the underlying failure.
        reason: String,
    },
}

impl MatrixError {
    pub(crate) fn initialization(reason: impl Into<String>) -> Self {
        Self::Initialization {
            reason: reason.into(),
        }
    }

    pub(crate) fn device(reason: impl Into<String>) -> Self {
        Self::DeviceInitialization {
            reason: reason.into(),
        }
    }

    #[cfg(feature = "wgpu")]
    pub(crate) fn dispatch(kernel: &'static str, reason: impl Into<String>) -> Self {
        Self::Dispatch {
            kernel,
            reason: reason.into(),
        }
    }
}

/// Convenient result type for matrix operations.
pub type Result<T> = core::result::Result<T, MatrixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_error_names_both_shapes() {
        let err = MatrixError::Dimension {
            operation: "add",
            requirement: "shapes must be identical",
            lhs: Shape::new(2, 3).unwrap(),
            rhs: Shape::new(3, 2).unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("add"));
        assert!(msg.contains("(2, 3)"));
        assert!(msg.contains("(3, 2)"));
    }

    #[test]
    fn helpers_build_matching_variants() {
        assert!(matches!(
            MatrixError::initialization("empty"),
            MatrixError::Initialization { .. }
        ));
        assert!(matches!(
            MatrixError::device("no adapter"),
            MatrixError::DeviceInitialization { .. }
        ));
    }
}
