use super::Block;
use crate::Matrix;
use crate::error::Result;
use crate::ops::ComputeDevice;

/// A feed-forward network: an ordered topology of blocks, each consuming the
/// previous block's output.
///
/// A network is itself a [`Block`], so networks nest.
///
/// # Example
///
/// ```
/// use mlkit::nn::{Block, FeedForward, InnerProduct, Sigmoid};
/// use mlkit::matrix;
///
/// let net = FeedForward::new("net")
///     .with(InnerProduct::from_parameters("fc", matrix![[1.0, -1.0]], matrix![[0.0]]))
///     .with(Sigmoid::new("act"));
///
/// let out = net.forward(&matrix![[2.0], [2.0]]).unwrap();
/// assert_eq!(out, matrix![[0.5]]);
/// ```
#[derive(Default)]
pub struct FeedForward {
    name: String,
    topology: Vec<Box<dyn Block>>,
}

impl core::fmt::Debug for FeedForward {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FeedForward")
            .field("name", &self.name)
            .field(
                "topology",
                &self.topology.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl FeedForward {
    /// An empty network called `name`; it returns its input unchanged.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topology: Vec::new(),
        }
    }

    /// Appends `block` to the topology.
    pub fn push(&mut self, block: impl Block + 'static) {
        self.topology.push(Box::new(block));
    }

    /// Appends `block` to the topology, builder style.
    #[must_use]
    pub fn with(mut self, block: impl Block + 'static) -> Self {
        self.push(block);
        self
    }

    /// The blocks in application order.
    #[must_use]
    pub fn topology(&self) -> &[Box<dyn Block>] {
        &self.topology
    }
}

impl Block for FeedForward {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward_with(&self, device: &dyn ComputeDevice, input: &Matrix) -> Result<Matrix> {
        let mut current = input.clone();
        for block in &self.topology {
            tracing::trace!(network = %self.name, block = block.name(), "forward");
            current = block.forward_with(device, &current)?;
        }
        Ok(current)
    }
}
