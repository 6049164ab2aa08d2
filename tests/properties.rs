//! Property-based tests for matrix operations.
//!
//! These tests use proptest to generate random matrices and check algebraic
//! identities and activation invariants on the CPU device.

use mlkit::nn::{Block, ReLU, Sigmoid, Softmax};
use mlkit::{ComputeContext, Matrix};
use proptest::prelude::*;

const MAX_DIM: usize = 8;

prop_compose! {
    fn arb_matrix_dims()(
        rows in 1usize..=MAX_DIM,
        cols in 1usize..=MAX_DIM
    ) -> (usize, usize) {
        (rows, cols)
    }
}

prop_compose! {
    fn arb_matrix_with(rows: usize, cols: usize, bound: f32)(
        data in prop::collection::vec(-bound..bound, rows * cols)
    ) -> Matrix {
        Matrix::from_vec(rows, cols, data).unwrap()
    }
}

prop_compose! {
    fn arb_matrix(bound: f32)((rows, cols) in arb_matrix_dims())(
        m in arb_matrix_with(rows, cols, bound)
    ) -> Matrix {
        m
    }
}

prop_compose! {
    /// Three matrices with chainable shapes `(m, k)`, `(k, n)`, `(n, p)`.
    fn arb_chain()(
        m in 1usize..=MAX_DIM,
        k in 1usize..=MAX_DIM,
        n in 1usize..=MAX_DIM,
        p in 1usize..=MAX_DIM
    )(
        a in arb_matrix_with(m, k, 2.0),
        b in arb_matrix_with(k, n, 2.0),
        c in arb_matrix_with(n, p, 2.0)
    ) -> (Matrix, Matrix, Matrix) {
        (a, b, c)
    }
}

proptest! {
    /// Transposing twice gives back the original matrix.
    #[test]
    fn test_transpose_involution(a in arb_matrix(100.0)) {
        let t = a.transpose();
        prop_assert_eq!(t.rows(), a.columns());
        prop_assert_eq!(t.transpose(), a);
    }

    /// Addition is commutative: a + b = b + a
    #[test]
    fn test_addition_commutative(
        (a, b) in arb_matrix_dims().prop_flat_map(|(r, c)| {
            (arb_matrix_with(r, c, 100.0), arb_matrix_with(r, c, 100.0))
        })
    ) {
        let ctx = ComputeContext::cpu();
        prop_assert_eq!(ctx.add(&a, &b).unwrap(), ctx.add(&b, &a).unwrap());
    }

    /// Matrix product is associative up to rounding.
    #[test]
    fn test_product_associative((a, b, c) in arb_chain()) {
        let ctx = ComputeContext::cpu();
        let left = ctx.multiply(&ctx.multiply(&a, &b).unwrap(), &c).unwrap();
        let right = ctx.multiply(&a, &ctx.multiply(&b, &c).unwrap()).unwrap();
        prop_assert!(left.approx_eq(&right, 1e-3), "{left}\n!=\n{right}");
    }

    /// Subtracting a matrix from itself yields zeros.
    #[test]
    fn test_self_subtraction_is_zero(a in arb_matrix(1000.0)) {
        let ctx = ComputeContext::cpu();
        let z = ctx.subtract(&a, &a).unwrap();
        prop_assert_eq!(z, Matrix::full(a.shape(), 0.0));
    }

    /// ReLU equals max(x, 0) elementwise.
    #[test]
    fn test_relu_is_max(a in arb_matrix(50.0)) {
        let y = ReLU::new("relu").forward(&a).unwrap();
        for (x, r) in a.elements().iter().zip(y.elements()) {
            prop_assert_eq!(x.max(0.0), *r);
        }
    }

    /// Sigmoid stays strictly inside (0, 1) for moderate inputs.
    #[test]
    fn test_sigmoid_open_unit_interval(a in arb_matrix(10.0)) {
        let y = Sigmoid::new("sigmoid").forward(&a).unwrap();
        prop_assert!(y.elements().iter().all(|&v| v > 0.0 && v < 1.0));
    }

    /// Softmax output is a probability distribution.
    #[test]
    fn test_softmax_sums_to_one(a in arb_matrix(30.0)) {
        let y = Softmax::new("softmax").forward(&a).unwrap();
        prop_assert!((y.sum() - 1.0).abs() < 1e-5);
        prop_assert!(y.elements().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    /// Scalar division by c matches scaling by 1 / c.
    #[test]
    fn test_scalar_division_is_reciprocal_scale(
        a in arb_matrix(100.0),
        c in prop_oneof![-100.0f32..-0.01, 0.01f32..100.0]
    ) {
        let ctx = ComputeContext::cpu();
        prop_assert_eq!(ctx.divide_scalar(&a, c).unwrap(), ctx.scale(&a, 1.0 / c).unwrap());
    }

    /// A buffer of the wrong length never builds a matrix.
    #[test]
    fn test_from_vec_length_checked((rows, cols) in arb_matrix_dims(), extra in 1usize..4) {
        prop_assert!(Matrix::from_vec(rows, cols, vec![0.0; rows * cols + extra]).is_err());
    }
}
