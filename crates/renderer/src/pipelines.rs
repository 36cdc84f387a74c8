//! Bind group layouts and render pipelines for the scene passes.

use wgpu::{
    BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, BlendState,
    BufferBindingType, BufferSize, ColorTargetState, ColorWrites, CompareFunction,
    DepthBiasState, DepthStencilState, Device, FragmentState, PipelineLayoutDescriptor,
    RenderPipeline, RenderPipelineDescriptor, SamplerBindingType, ShaderModuleDescriptor,
    ShaderSource, ShaderStages, TextureFormat, TextureSampleType, TextureViewDimension,
    VertexState,
};

use crate::resources::DEPTH_FORMAT;
use crate::uniforms::{FrameUniform, ObjectUniform};
use crate::vertex::Vertex;

const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");
const LIT_WGSL: &str = include_str!("shaders/lit.wgsl");
const PLANE_WGSL: &str = include_str!("shaders/plane.wgsl");
const SKY_WGSL: &str = include_str!("shaders/sky.wgsl");
const SHADOW_WGSL: &str = include_str!("shaders/shadow.wgsl");

pub struct Layouts {
    /// Frame uniform + shadow map + environment (scene passes).
    pub frame: BindGroupLayout,
    /// Frame uniform only (shadow pass, which writes the shadow map).
    pub shadow_frame: BindGroupLayout,
    /// Per-draw object uniform with a dynamic offset.
    pub object: BindGroupLayout,
    pub material: BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &Device) -> Self {
        let frame_uniform = BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: BufferSize::new(std::mem::size_of::<FrameUniform>() as u64),
            },
            count: None,
        };
        let frame = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Frame BGL"),
            entries: &[
                frame_uniform,
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Depth,
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Comparison),
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 3,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 4,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let shadow_frame = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Shadow frame BGL"),
            entries: &[frame_uniform],
        });
        let object = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Object BGL"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: BufferSize::new(std::mem::size_of::<ObjectUniform>() as u64),
                },
                count: None,
            }],
        });
        Self {
            frame,
            shadow_frame,
            object,
            material: crate::material::layout(device),
        }
    }
}

pub struct Pipelines {
    pub shadow: RenderPipeline,
    pub lit: RenderPipeline,
    pub plane: RenderPipeline,
    pub sky: RenderPipeline,
}

impl Pipelines {
    pub fn new(device: &Device, layouts: &Layouts, surface_format: TextureFormat) -> Self {
        let module = |label: &str, src: &str, with_common: bool| {
            let source = if with_common {
                format!("{COMMON_WGSL}\n{src}")
            } else {
                src.to_string()
            };
            device.create_shader_module(ShaderModuleDescriptor {
                label: Some(label),
                source: ShaderSource::Wgsl(source.into()),
            })
        };
        let lit_module = module("Lit WGSL", LIT_WGSL, true);
        let plane_module = module("Plane WGSL", PLANE_WGSL, true);
        let sky_module = module("Sky WGSL", SKY_WGSL, true);
        let shadow_module = module("Shadow WGSL", SHADOW_WGSL, false);

        let layout = |label: &str, groups: &[&BindGroupLayout]| {
            device.create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: groups,
                push_constant_ranges: &[],
            })
        };
        let lit_layout = layout("Lit layout", &[&layouts.frame, &layouts.object, &layouts.material]);
        let plane_layout = layout("Plane layout", &[&layouts.frame, &layouts.object]);
        let sky_layout = layout("Sky layout", &[&layouts.frame]);
        let shadow_layout = layout("Shadow layout", &[&layouts.shadow_frame, &layouts.object]);

        let color_target = [Some(ColorTargetState {
            format: surface_format,
            blend: Some(BlendState::REPLACE),
            write_mask: ColorWrites::ALL,
        })];
        let depth = |write: bool, bias: DepthBiasState| DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: write,
            depth_compare: CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias,
        };

        let lit = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Lit pipeline"),
            layout: Some(&lit_layout),
            vertex: VertexState {
                module: &lit_module,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(FragmentState {
                module: &lit_module,
                entry_point: Some("fs_main"),
                targets: &color_target,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(depth(true, DepthBiasState::default())),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Planes are seen from both sides.
        let plane = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Plane pipeline"),
            layout: Some(&plane_layout),
            vertex: VertexState {
                module: &plane_module,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(FragmentState {
                module: &plane_module,
                entry_point: Some("fs_main"),
                targets: &color_target,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(depth(true, DepthBiasState::default())),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sky = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Sky pipeline"),
            layout: Some(&sky_layout),
            vertex: VertexState {
                module: &sky_module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(FragmentState {
                module: &sky_module,
                entry_point: Some("fs_main"),
                targets: &color_target,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(depth(false, DepthBiasState::default())),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let shadow = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Shadow pipeline"),
            layout: Some(&shadow_layout),
            vertex: VertexState {
                module: &shadow_module,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(depth(
                true,
                DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            )),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            shadow,
            lit,
            plane,
            sky,
        }
    }
}
