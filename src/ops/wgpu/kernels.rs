//! The WGSL kernel library.
//!
//! Every kernel is compiled into a compute pipeline once, when a
//! [`GpuDevice`](super::GpuDevice) is created, and looked up by name on each
//! dispatch.

use crate::error::{MatrixError, Result};
use std::collections::HashMap;

const UNARY: &str = include_str!("shaders/unary.wgsl");
const BINARY: &str = include_str!("shaders/binary.wgsl");
const MATMUL: &str = include_str!("shaders/matmul.wgsl");

const WIDTH_PLACEHOLDER: &str = "__WORKGROUP_WIDTH__";

/// Side length of the square matmul workgroup.
pub(super) const MATMUL_TILE: u32 = 16;

/// The kernels bundled with the GPU backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum Kernel {
    Add,
    Subtract,
    Divide,
    Modulo,
    Scale,
    Exponentiate,
    Sigmoid,
    SigmoidDerivative,
    Tanh,
    TanhDerivative,
    Relu,
    ReluDerivative,
    Matmul,
}

/// Which bind group layout a kernel expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Arity {
    /// `params`, `input`, `output`.
    Unary,
    /// `params`, `lhs`, `rhs`, `output`.
    Binary,
}

#[derive(Clone, Copy)]
enum Module {
    Unary,
    Binary,
    Matmul,
}

impl Kernel {
    pub(super) const ALL: [Self; 13] = [
        Self::Add,
        Self::Subtract,
        Self::Divide,
        Self::Modulo,
        Self::Scale,
        Self::Exponentiate,
        Self::Sigmoid,
        Self::SigmoidDerivative,
        Self::Tanh,
        Self::TanhDerivative,
        Self::Relu,
        Self::ReluDerivative,
        Self::Matmul,
    ];

    /// The entry point name inside its WGSL module.
    pub(super) const fn name(self) -> &'static str {
        match self {
            Self::Add => "add_kernel",
            Self::Subtract => "subtract_kernel",
            Self::Divide => "divide_kernel",
            Self::Modulo => "modulo_kernel",
            Self::Scale => "scale_kernel",
            Self::Exponentiate => "exponentiate_kernel",
            Self::Sigmoid => "sigmoid_kernel",
            Self::SigmoidDerivative => "sigmoid_derivative_kernel",
            Self::Tanh => "tanh_kernel",
            Self::TanhDerivative => "tanh_derivative_kernel",
            Self::Relu => "relu_kernel",
            Self::ReluDerivative => "relu_derivative_kernel",
            Self::Matmul => "matmul_kernel",
        }
    }

    const fn module(self) -> Module {
        match self {
            Self::Add | Self::Subtract | Self::Divide | Self::Modulo => Module::Binary,
            Self::Matmul => Module::Matmul,
            _ => Module::Unary,
        }
    }

    pub(super) const fn arity(self) -> Arity {
        match self.module() {
            Module::Unary => Arity::Unary,
            Module::Binary | Module::Matmul => Arity::Binary,
        }
    }
}

/// The uniform block shared by every kernel; 32 bytes, matching `Params` in
/// the WGSL sources.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct Params {
    pub len: u32,
    pub rows: u32,
    pub inner: u32,
    pub columns: u32,
    pub scalar: f32,
}

impl Params {
    pub(super) fn words(self) -> [u32; 8] {
        [
            self.len,
            self.rows,
            self.inner,
            self.columns,
            self.scalar.to_bits(),
            0,
            0,
            0,
        ]
    }
}

fn layout_entry(binding: u32, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn bind_group_layout(device: &wgpu::Device, arity: Arity) -> wgpu::BindGroupLayout {
    let uniform = wgpu::BufferBindingType::Uniform;
    let read = wgpu::BufferBindingType::Storage { read_only: true };
    let write = wgpu::BufferBindingType::Storage { read_only: false };

    let (label, entries) = match arity {
        Arity::Unary => (
            "unary_bgl",
            vec![
                layout_entry(0, uniform),
                layout_entry(1, read),
                layout_entry(2, write),
            ],
        ),
        Arity::Binary => (
            "binary_bgl",
            vec![
                layout_entry(0, uniform),
                layout_entry(1, read),
                layout_entry(2, read),
                layout_entry(3, write),
            ],
        ),
    };

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}

/// Compiled pipelines for every [`Kernel`], keyed by kernel.
pub(super) struct KernelLibrary {
    unary_layout: wgpu::BindGroupLayout,
    binary_layout: wgpu::BindGroupLayout,
    pipelines: HashMap<Kernel, wgpu::ComputePipeline>,
}

impl KernelLibrary {
    /// Compiles all bundled kernels for `device` with the given elementwise
    /// workgroup width.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::DeviceInitialization`] if a module fails WGSL
    /// validation or a pipeline cannot be created.
    pub(super) fn compile(device: &wgpu::Device, workgroup_width: u32) -> Result<Self> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let width = workgroup_width.to_string();
        let shader = |label: &str, source: &str| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.replace(WIDTH_PLACEHOLDER, &width).into()),
            })
        };
        let unary = shader("unary", UNARY);
        let binary = shader("binary", BINARY);
        let matmul = shader("matmul", MATMUL);

        let unary_layout = bind_group_layout(device, Arity::Unary);
        let binary_layout = bind_group_layout(device, Arity::Binary);
        let pipeline_layout = |label: &str, bgl: &wgpu::BindGroupLayout| {
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[bgl],
                push_constant_ranges: &[],
            })
        };
        let unary_pipeline_layout = pipeline_layout("unary_pipeline_layout", &unary_layout);
        let binary_pipeline_layout = pipeline_layout("binary_pipeline_layout", &binary_layout);

        let pipelines = Kernel::ALL
            .iter()
            .map(|&kernel| {
                let (module, layout) = match kernel.module() {
                    Module::Unary => (&unary, &unary_pipeline_layout),
                    Module::Binary => (&binary, &binary_pipeline_layout),
                    Module::Matmul => (&matmul, &binary_pipeline_layout),
                };
                let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(kernel.name()),
                    layout: Some(layout),
                    module,
                    entry_point: Some(kernel.name()),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    cache: None,
                });
                (kernel, pipeline)
            })
            .collect();

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(MatrixError::device(format!(
                "kernel library failed to compile: {err}"
            )));
        }

        Ok(Self {
            unary_layout,
            binary_layout,
            pipelines,
        })
    }

    /// The compiled pipeline for `kernel`.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::DeviceInitialization`] if the kernel is missing
    /// from the library.
    pub(super) fn pipeline(&self, kernel: Kernel) -> Result<&wgpu::ComputePipeline> {
        self.pipelines.get(&kernel).ok_or_else(|| {
            MatrixError::device(format!("kernel `{}` not found in library", kernel.name()))
        })
    }

    pub(super) const fn layout(&self, arity: Arity) -> &wgpu::BindGroupLayout {
        match arity {
            Arity::Unary => &self.unary_layout,
            Arity::Binary => &self.binary_layout,
        }
    }

    pub(super) fn len(&self) -> usize {
        self.pipelines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kernel_has_an_entry_point_in_its_module() {
        for kernel in Kernel::ALL {
            let source = match kernel.module() {
                Module::Unary => UNARY,
                Module::Binary => BINARY,
                Module::Matmul => MATMUL,
            };
            assert!(
                source.contains(&format!("fn {}(", kernel.name())),
                "{} missing",
                kernel.name()
            );
        }
    }

    #[test]
    fn elementwise_modules_take_the_width_placeholder() {
        assert!(UNARY.contains(WIDTH_PLACEHOLDER));
        assert!(BINARY.contains(WIDTH_PLACEHOLDER));
        assert!(MATMUL.contains(&format!("@workgroup_size({MATMUL_TILE}, {MATMUL_TILE})")));
    }

    #[test]
    fn params_pack_scalar_bits_at_word_four() {
        let words = Params {
            len: 6,
            scalar: -0.5,
            ..Params::default()
        }
        .words();
        assert_eq!(words[0], 6);
        assert_eq!(f32::from_bits(words[4]), -0.5);
        assert_eq!(words.len() * 4, 32);
    }

    #[test]
    fn arity_follows_module() {
        assert_eq!(Kernel::Scale.arity(), Arity::Unary);
        assert_eq!(Kernel::Modulo.arity(), Arity::Binary);
        assert_eq!(Kernel::Matmul.arity(), Arity::Binary);
    }
}
