//! Render pipelines for every program and pass state.
//!
//! All programs share one pipeline layout:
//!
//! | Group | Binding | Contents                                        |
//! |-------|---------|-------------------------------------------------|
//! | 0     | 0       | per-draw uniforms, dynamic offset               |
//! | 1     | 0-5     | 2D textures of the material's slots             |
//! | 1     | 6       | cube map                                        |
//! | 1     | 7       | linear sampler                                  |
//!
//! Pipelines are created on first use and cached by [`PipelineKey`], so the
//! depth test and blend state of a light pass select a pipeline rather than
//! mutating global state.

use std::collections::HashMap;

use super::{Program, Stage};
use crate::frame::DrawUniforms;
use crate::geometry::Vertex3d;
use crate::gpu::GpuContext;

/// Number of 2D texture bindings in group 1.
pub const TEXTURE_BINDINGS: u32 = 6;
/// Binding of the cube map in group 1.
pub const CUBE_BINDING: u32 = 6;
/// Binding of the sampler in group 1.
pub const SAMPLER_BINDING: u32 = 7;

/// Depth attachment format of the scene target.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DepthTest {
    /// No test and no depth writes.
    #[default]
    Disabled,
    /// Test and write; the first light pass.
    Less,
    /// Test without writing; the later light passes.
    Equal,
    /// Test without writing; overlays drawn on top of the shaded scene.
    LessEqual,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Blend {
    #[default]
    Replace,
    /// `dst = dst + src`
    Additive,
}

impl Blend {
    fn state(self) -> wgpu::BlendState {
        match self {
            Blend::Replace => wgpu::BlendState::REPLACE,
            Blend::Additive => {
                let add = wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                };
                wgpu::BlendState {
                    color: add,
                    alpha: add,
                }
            }
        }
    }
}

impl DepthTest {
    fn state(self) -> wgpu::DepthStencilState {
        let (depth_write_enabled, depth_compare) = match self {
            DepthTest::Disabled => (false, wgpu::CompareFunction::Always),
            DepthTest::Less => (true, wgpu::CompareFunction::Less),
            DepthTest::Equal => (false, wgpu::CompareFunction::Equal),
            DepthTest::LessEqual => (false, wgpu::CompareFunction::LessEqual),
        };
        wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

/// Everything that selects a render pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub program: Program,
    /// `None` for passes without a depth attachment.
    pub depth: Option<DepthTest>,
    pub blend: Blend,
    pub format: wgpu::TextureFormat,
}

/// Shared layouts plus the lazily built pipeline cache.
pub struct Pipelines {
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    modules: HashMap<Program, wgpu::ShaderModule>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl Pipelines {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Uniforms Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<DrawUniforms>() as u64
                    ),
                },
                count: None,
            }],
        });

        let texture_entry = |binding: u32, view_dimension| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension,
                multisampled: false,
            },
            count: None,
        };
        let mut entries = (0..TEXTURE_BINDINGS)
            .map(|binding| texture_entry(binding, wgpu::TextureViewDimension::D2))
            .collect::<Vec<_>>();
        entries.push(texture_entry(CUBE_BINDING, wgpu::TextureViewDimension::Cube));
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: SAMPLER_BINDING,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Textures Layout"),
            entries: &entries,
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Lightpass Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            uniform_layout,
            texture_layout,
            layout,
            sampler,
            modules: HashMap::new(),
            pipelines: HashMap::new(),
        }
    }

    pub fn uniform_layout(&self) -> &wgpu::BindGroupLayout {
        &self.uniform_layout
    }

    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Number of pipelines built so far.
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// The pipeline for `key`, built on first request.
    pub fn get(&mut self, gpu: &GpuContext, key: PipelineKey) -> &wgpu::RenderPipeline {
        if !self.pipelines.contains_key(&key) {
            let pipeline = self.create(gpu, key);
            self.pipelines.insert(key, pipeline);
        }
        &self.pipelines[&key]
    }

    fn create(&mut self, gpu: &GpuContext, key: PipelineKey) -> wgpu::RenderPipeline {
        let program = key.program;
        let module = self.modules.entry(program).or_insert_with(|| {
            log::debug!("compiling {}", program.name());
            gpu.device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(program.name()),
                    source: wgpu::ShaderSource::Wgsl(program.source().into()),
                })
        });

        let (buffers, topology): (&[wgpu::VertexBufferLayout], _) = match program.stage() {
            Stage::Surface => (&[Vertex3d::LAYOUT], wgpu::PrimitiveTopology::TriangleList),
            Stage::Edges => (&[Vertex3d::LAYOUT], wgpu::PrimitiveTopology::LineList),
            Stage::Vectors => (&[Vertex3d::INSTANCE_LAYOUT], wgpu::PrimitiveTopology::LineList),
            Stage::Screen => (&[], wgpu::PrimitiveTopology::TriangleList),
        };

        log::debug!("pipeline {:?}", key);
        gpu.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(program.name()),
                layout: Some(&self.layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: key.format,
                        blend: Some(key.blend.state()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // both sides are shaded
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: key.depth.map(DepthTest::state),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_light_passes_add_without_writing_depth() {
        let additive = Blend::Additive.state();
        assert_eq!(additive.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(additive.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(additive.color.operation, wgpu::BlendOperation::Add);
        assert_eq!(Blend::Replace.state(), wgpu::BlendState::REPLACE);

        let first = DepthTest::Less.state();
        assert!(first.depth_write_enabled);
        assert_eq!(first.depth_compare, wgpu::CompareFunction::Less);
        let later = DepthTest::Equal.state();
        assert!(!later.depth_write_enabled);
        assert_eq!(later.depth_compare, wgpu::CompareFunction::Equal);
    }
}
