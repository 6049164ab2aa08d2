//! GPU-accelerated matrix operations using WGPU.
//!
//! This module implements the [`ComputeDevice`] kernels on the GPU with WGPU +
//! WGSL. A [`GpuDevice`] selects an adapter, creates a device and queue, and
//! compiles its kernel library once; every operation then follows
//! the same steps:
//!
//! 1. look up the kernel's pipeline
//! 2. upload the operands into storage buffers and the shape/scalar into a
//!    uniform block
//! 3. dispatch a grid covering every output element
//! 4. copy the output into a staging buffer, submit, and block until it maps
//! 5. read the staging buffer back into a new [`Matrix`]
//!
//! Reductions are not run on the GPU; [`ComputeDevice::sum`] and
//! [`ComputeDevice::absolute_sum`] forward to the CPU device.

mod kernels;

use self::kernels::{Arity, Kernel, KernelLibrary, MATMUL_TILE, Params};
use super::{ComputeDevice, CpuDevice};
use crate::Matrix;
use crate::backend::ComputeMode;
use crate::error::{MatrixError, Result};
use crate::shape::Shape;
use std::sync::mpsc;
use wgpu::util::DeviceExt;

/// Upper bound for the elementwise workgroup width.
const PREFERRED_WORKGROUP_WIDTH: u32 = 256;

/// Options used to pick the adapter behind a [`GpuDevice`].
#[derive(Debug, Clone)]
pub struct GpuOptions {
    /// Preference between integrated and discrete adapters.
    pub power_preference: wgpu::PowerPreference,
    /// Only accept a software fallback adapter.
    pub force_fallback_adapter: bool,
}

impl Default for GpuOptions {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
        }
    }
}

/// A GPU device with its queue and compiled kernel library.
///
/// Creating one is expensive (adapter selection, device creation and shader
/// compilation); reuse it across operations. Resources are released on drop.
pub struct GpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    name: String,
    library: KernelLibrary,
    workgroup_width: u32,
    max_groups_per_dimension: u32,
    max_binding_size: u64,
}

impl core::fmt::Debug for GpuDevice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GpuDevice")
            .field("name", &self.name)
            .field("workgroup_width", &self.workgroup_width)
            .field("max_groups_per_dimension", &self.max_groups_per_dimension)
            .finish_non_exhaustive()
    }
}

impl GpuDevice {
    /// Initializes a GPU device on the default high-performance adapter.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::DeviceInitialization`] if no adapter or device is
    /// available, or the kernel library fails to compile.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mlkit::ops::GpuDevice;
    ///
    /// let gpu = GpuDevice::new().unwrap();
    /// println!("running on {gpu:?}");
    /// ```
    pub fn new() -> Result<Self> {
        Self::with_options(&GpuOptions::default())
    }

    /// Initializes a GPU device on an adapter matching `options`.
    ///
    /// # Errors
    ///
    /// See [`GpuDevice::new`].
    pub fn with_options(options: &GpuOptions) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: options.power_preference,
            force_fallback_adapter: options.force_fallback_adapter,
            compatible_surface: None,
        }))
        .map_err(|e| MatrixError::device(format!("no GPU adapter: {e}")))?;

        let info = adapter.get_info();
        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("mlkit"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|e| MatrixError::device(format!("GPU device request failed: {e}")))?;

        let workgroup_width = PREFERRED_WORKGROUP_WIDTH
            .min(limits.max_compute_workgroup_size_x)
            .min(limits.max_compute_invocations_per_workgroup);
        if workgroup_width == 0
            || limits.max_compute_invocations_per_workgroup < MATMUL_TILE * MATMUL_TILE
        {
            return Err(MatrixError::device(format!(
                "adapter `{}` does not support compute workgroups",
                info.name
            )));
        }

        let library = KernelLibrary::compile(&device, workgroup_width)?;

        tracing::info!(
            adapter = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            workgroup_width,
            kernels = library.len(),
            "GPU device initialized"
        );

        Ok(Self {
            device,
            queue,
            name: info.name,
            library,
            workgroup_width,
            max_groups_per_dimension: limits.max_compute_workgroups_per_dimension,
            max_binding_size: u64::from(limits.max_storage_buffer_binding_size)
                .min(limits.max_buffer_size),
        })
    }

    /// Launch grid covering `len` invocations in groups of `workgroup_width`,
    /// folded into two dimensions past the per-dimension limit.
    fn linear_grid(&self, kernel: Kernel, len: usize) -> Result<(u32, u32)> {
        let width = u64::from(self.workgroup_width);
        let groups = (len as u64).div_ceil(width);
        let max = u64::from(self.max_groups_per_dimension);

        if groups <= max {
            return Ok((to_u32(kernel, groups)?, 1));
        }
        let rows = groups.div_ceil(max);
        if rows > max {
            return Err(MatrixError::dispatch(
                kernel.name(),
                format!("{len} elements exceed the device launch limits"),
            ));
        }
        Ok((to_u32(kernel, max)?, to_u32(kernel, rows)?))
    }

    fn tile_grid(&self, shape: Shape) -> Result<(u32, u32)> {
        let kernel = Kernel::Matmul;
        let tile = MATMUL_TILE as usize;
        let x = to_u32(kernel, shape.columns().div_ceil(tile) as u64)?;
        let y = to_u32(kernel, shape.rows().div_ceil(tile) as u64)?;
        if x > self.max_groups_per_dimension || y > self.max_groups_per_dimension {
            return Err(MatrixError::dispatch(
                kernel.name(),
                format!("a {shape} product exceeds the device launch limits"),
            ));
        }
        Ok((x, y))
    }

    fn storage(&self, label: &str, data: &[f32]) -> wgpu::Buffer {
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(data),
            usage: wgpu::BufferUsages::STORAGE,
        })
    }

    fn check_size(&self, kernel: Kernel, len: usize) -> Result<u64> {
        let bytes = (len * size_of::<f32>()) as u64;
        if bytes > self.max_binding_size {
            return Err(MatrixError::dispatch(
                kernel.name(),
                format!(
                    "{bytes} byte buffer exceeds the {} byte binding limit",
                    self.max_binding_size
                ),
            ));
        }
        Ok(bytes)
    }

    /// Runs `kernel` over `inputs` and returns `len` output elements.
    fn execute(
        &self,
        kernel: Kernel,
        params: Params,
        inputs: &[&[f32]],
        len: usize,
        grid: (u32, u32),
    ) -> Result<Vec<f32>> {
        let pipeline = self.library.pipeline(kernel)?;
        let arity = kernel.arity();
        let expected_inputs = match arity {
            Arity::Unary => 1,
            Arity::Binary => 2,
        };
        debug_assert_eq!(inputs.len(), expected_inputs);

        tracing::debug!(
            kernel = kernel.name(),
            elements = len,
            grid_x = grid.0,
            grid_y = grid.1,
            "dispatching kernel"
        );

        let device = &self.device;
        let size = self.check_size(kernel, len)?;
        for data in inputs {
            self.check_size(kernel, data.len())?;
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("params"),
            contents: bytemuck::bytes_of(&params.words()),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let input_buffers: Vec<wgpu::Buffer> = inputs
            .iter()
            .zip(["lhs", "rhs"])
            .map(|(data, label)| self.storage(label, data))
            .collect();
        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("output"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: params_buffer.as_entire_binding(),
        }];
        for buffer in input_buffers.iter().chain(Some(&output_buffer)) {
            entries.push(wgpu::BindGroupEntry {
                binding: entries.len() as u32,
                resource: buffer.as_entire_binding(),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kernel.name()),
            layout: self.library.layout(arity),
            entries: &entries,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(kernel.name()),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.name()),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(grid.0, grid.1, 1);
        }
        encoder.copy_buffer_to_buffer(&output_buffer, 0, &staging_buffer, 0, size);
        self.queue.submit(Some(encoder.finish()));

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(MatrixError::dispatch(kernel.name(), err.to_string()));
        }

        let slice = staging_buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // the receiver outlives the poll below
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| MatrixError::dispatch(kernel.name(), e.to_string()))?;
        rx.recv()
            .map_err(|e| MatrixError::dispatch(kernel.name(), e.to_string()))?
            .map_err(|e| MatrixError::dispatch(kernel.name(), e.to_string()))?;

        let out = {
            let view = slice.get_mapped_range();
            bytemuck::try_cast_slice::<u8, f32>(&view)
                .map_err(|e| MatrixError::dispatch(kernel.name(), e.to_string()))?
                .to_vec()
        };
        staging_buffer.unmap();
        Ok(out)
    }

    fn unary(&self, kernel: Kernel, a: &Matrix, scalar: f32) -> Result<Matrix> {
        let len = a.count();
        let params = Params {
            len: to_u32(kernel, len as u64)?,
            rows: to_u32(kernel, a.rows() as u64)?,
            columns: to_u32(kernel, a.columns() as u64)?,
            scalar,
            ..Params::default()
        };
        let grid = self.linear_grid(kernel, len)?;
        let data = self.execute(kernel, params, &[a.elements()], len, grid)?;
        Ok(Matrix::from_parts(a.shape(), data))
    }

    fn binary(&self, kernel: Kernel, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        let len = a.count();
        let params = Params {
            len: to_u32(kernel, len as u64)?,
            rows: to_u32(kernel, a.rows() as u64)?,
            columns: to_u32(kernel, a.columns() as u64)?,
            ..Params::default()
        };
        let grid = self.linear_grid(kernel, len)?;
        let data = self.execute(kernel, params, &[a.elements(), b.elements()], len, grid)?;
        Ok(Matrix::from_parts(a.shape(), data))
    }
}

fn to_u32(kernel: Kernel, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        MatrixError::dispatch(kernel.name(), format!("{value} does not fit a 32-bit launch parameter"))
    })
}

impl ComputeDevice for GpuDevice {
    fn mode(&self) -> ComputeMode {
        ComputeMode::Gpu
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn add(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        self.binary(Kernel::Add, a, b)
    }

    fn subtract(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        self.binary(Kernel::Subtract, a, b)
    }

    fn multiply(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        let kernel = Kernel::Matmul;
        let shape = Shape::new(a.rows(), b.columns())?;
        let params = Params {
            len: to_u32(kernel, shape.count() as u64)?,
            rows: to_u32(kernel, a.rows() as u64)?,
            inner: to_u32(kernel, a.columns() as u64)?,
            columns: to_u32(kernel, b.columns() as u64)?,
            ..Params::default()
        };
        let grid = self.tile_grid(shape)?;
        let data = self.execute(
            kernel,
            params,
            &[a.elements(), b.elements()],
            shape.count(),
            grid,
        )?;
        Ok(Matrix::from_parts(shape, data))
    }

    fn scale(&self, a: &Matrix, c: f32) -> Result<Matrix> {
        self.unary(Kernel::Scale, a, c)
    }

    fn divide(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        self.binary(Kernel::Divide, a, b)
    }

    fn modulo(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        self.binary(Kernel::Modulo, a, b)
    }

    fn sum(&self, a: &Matrix) -> Result<f32> {
        CpuDevice.sum(a)
    }

    fn absolute_sum(&self, a: &Matrix) -> Result<f32> {
        CpuDevice.absolute_sum(a)
    }

    fn exponentiate(&self, a: &Matrix) -> Result<Matrix> {
        self.unary(Kernel::Exponentiate, a, 0.0)
    }

    fn sigmoid(&self, a: &Matrix) -> Result<Matrix> {
        self.unary(Kernel::Sigmoid, a, 0.0)
    }

    fn sigmoid_derivative(&self, a: &Matrix) -> Result<Matrix> {
        self.unary(Kernel::SigmoidDerivative, a, 0.0)
    }

    fn tanh(&self, a: &Matrix) -> Result<Matrix> {
        self.unary(Kernel::Tanh, a, 0.0)
    }

    fn tanh_derivative(&self, a: &Matrix) -> Result<Matrix> {
        self.unary(Kernel::TanhDerivative, a, 0.0)
    }

    fn relu(&self, a: &Matrix) -> Result<Matrix> {
        self.unary(Kernel::Relu, a, 0.0)
    }

    fn relu_derivative(&self, a: &Matrix) -> Result<Matrix> {
        self.unary(Kernel::ReluDerivative, a, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix;

    /// `None` when the machine has no usable adapter.
    fn gpu() -> Option<GpuDevice> {
        GpuDevice::new().ok()
    }

    #[test]
    fn default_options_prefer_high_performance() {
        let options = GpuOptions::default();
        assert_eq!(options.power_preference, wgpu::PowerPreference::HighPerformance);
        assert!(!options.force_fallback_adapter);
    }

    #[test]
    fn adds_and_multiplies() {
        let Some(gpu) = gpu() else { return };
        let a = matrix![[1.0, 2.0], [3.0, 4.0]];
        let b = matrix![[4.0, 5.0], [6.0, 7.0]];
        assert_eq!(gpu.add(&a, &a).unwrap(), matrix![[2.0, 4.0], [6.0, 8.0]]);
        assert_eq!(gpu.multiply(&a, &b).unwrap(), matrix![[16.0, 19.0], [36.0, 43.0]]);
    }

    #[test]
    fn odd_lengths_cover_every_element() {
        let Some(gpu) = gpu() else { return };
        let n = gpu.workgroup_width as usize * 3 + 7;
        let a = Matrix::filled(1, n, 1.5).unwrap();
        let scaled = gpu.scale(&a, 2.0).unwrap();
        assert!(scaled.elements().iter().all(|&x| x == 3.0));
    }

    #[test]
    fn reductions_run_on_the_cpu() {
        let Some(gpu) = gpu() else { return };
        let a = matrix![[1.0, -2.0], [3.0, -4.0]];
        assert_eq!(gpu.sum(&a).unwrap(), -2.0);
        assert_eq!(gpu.absolute_sum(&a).unwrap(), 10.0);
    }

    #[test]
    fn folded_grid_covers_large_launches() {
        let Some(gpu) = gpu() else { return };
        let max = gpu.max_groups_per_dimension as usize;
        let len = gpu.workgroup_width as usize * max + 1;
        let (x, y) = gpu.linear_grid(Kernel::Add, len).unwrap();
        assert_eq!(x as usize, max);
        assert_eq!(y, 2);
    }
}
