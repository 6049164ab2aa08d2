//! Neural-network building blocks on top of [`Matrix`].
//!
//! Every block is a pure transform from an input matrix to an output matrix.
//! Blocks hold no input state; the caller passes the input to
//! [`Block::forward`] (active device) or [`Block::forward_with`] (explicit
//! device) and receives a fresh matrix.
//!
//! # Blocks
//!
//! - [`Sigmoid`], [`Tanh`], [`ReLU`]: elementwise activations with derivatives
//! - [`Softmax`]: normalizes a matrix so its elements sum to one
//! - [`InnerProduct`]: `weights × input + bias`
//! - [`FeedForward`]: an ordered topology of blocks applied in sequence
//!
//! Training is out of scope: layers expose their parameters but nothing
//! updates them.

use crate::Matrix;
use crate::backend::compute_device;
use crate::error::Result;
use crate::ops::ComputeDevice;

mod activation;
mod inner_product;
mod network;
mod softmax;

pub use self::activation::{ReLU, Sigmoid, Tanh};
pub use self::inner_product::InnerProduct;
pub use self::network::FeedForward;
pub use self::softmax::Softmax;

/// A named unit that transforms an input matrix into an output matrix.
pub trait Block: Send + Sync {
    /// The name given to the block at construction.
    fn name(&self) -> &str;

    /// Applies the block on `device`.
    ///
    /// # Errors
    ///
    /// Fails if `input` has the wrong shape for the block or the device fails.
    fn forward_with(&self, device: &dyn ComputeDevice, input: &Matrix) -> Result<Matrix>;

    /// Applies the block on the device selected by the global compute mode.
    ///
    /// # Errors
    ///
    /// See [`Block::forward_with`]; also fails if the active device is
    /// unavailable.
    fn forward(&self, input: &Matrix) -> Result<Matrix> {
        self.forward_with(compute_device()?, input)
    }
}

/// An elementwise activation function with a known derivative.
pub trait Activation: Block {
    /// Applies the derivative of the activation on `device`.
    ///
    /// # Errors
    ///
    /// Fails if the device fails.
    fn derivative_with(&self, device: &dyn ComputeDevice, input: &Matrix) -> Result<Matrix>;

    /// Applies the derivative of the activation on the active device.
    ///
    /// # Errors
    ///
    /// See [`Activation::derivative_with`]; also fails if the active device is
    /// unavailable.
    fn derivative(&self, input: &Matrix) -> Result<Matrix> {
        self.derivative_with(compute_device()?, input)
    }
}

/// A block with trainable parameters.
pub trait Layer: Block {
    /// The weight matrix.
    fn weights(&self) -> &Matrix;

    /// The bias matrix.
    fn bias(&self) -> &Matrix;
}
