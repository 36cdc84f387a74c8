//! Material bind groups (group 2): factors plus color, occlusion, normal and
//! roughness maps sharing one sampler.

use corelib::loading::TextureSlot;
use wgpu::util::DeviceExt;
use wgpu::{
    BindGroup, BindGroupLayout, BindGroupLayoutEntry, BindingType, BufferBindingType, Device,
    Sampler, SamplerBindingType, ShaderStages, TextureSampleType, TextureView,
    TextureViewDimension,
};

use crate::resources::{Defaults, GpuTexture};
use crate::uniforms::MaterialUniform;

pub fn layout(device: &Device) -> BindGroupLayout {
    let texture = |binding| BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Texture {
            sample_type: TextureSampleType::Float { filterable: true },
            view_dimension: TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Material BGL"),
        entries: &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            texture(1),
            texture(2),
            texture(3),
            texture(4),
            BindGroupLayoutEntry {
                binding: 5,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// Views for the four map bindings, in binding order.
pub struct MaterialMaps<'a> {
    pub color: &'a TextureView,
    pub occlusion: &'a TextureView,
    pub normal: &'a TextureView,
    pub roughness: &'a TextureView,
}

impl<'a> MaterialMaps<'a> {
    /// Only a color map; neutral defaults for the rest.
    pub fn color_only(color: &'a TextureView, defaults: &'a Defaults) -> Self {
        Self {
            color,
            occlusion: &defaults.white_linear.view,
            normal: &defaults.flat_normal.view,
            roughness: &defaults.white_linear.view,
        }
    }
}

pub fn bind_group(
    device: &Device,
    layout: &BindGroupLayout,
    label: &str,
    uniform: &MaterialUniform,
    maps: MaterialMaps<'_>,
    sampler: &Sampler,
) -> BindGroup {
    let buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(uniform),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buf.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(maps.color),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(maps.occlusion),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(maps.normal),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::TextureView(maps.roughness),
            },
            wgpu::BindGroupEntry {
                binding: 5,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// The floor's four texture slots. Empty slots render with the neutral
/// default until their texture arrives.
#[derive(Default)]
pub struct FloorSlots {
    color: Option<GpuTexture>,
    occlusion: Option<GpuTexture>,
    normal: Option<GpuTexture>,
    roughness: Option<GpuTexture>,
}

impl FloorSlots {
    pub fn set(&mut self, slot: TextureSlot, texture: GpuTexture) {
        *self.slot_mut(slot) = Some(texture);
    }

    pub fn is_bound(&self, slot: TextureSlot) -> bool {
        match slot {
            TextureSlot::Color => self.color.is_some(),
            TextureSlot::Occlusion => self.occlusion.is_some(),
            TextureSlot::Normal => self.normal.is_some(),
            TextureSlot::Roughness => self.roughness.is_some(),
        }
    }

    pub fn maps<'a>(&'a self, defaults: &'a Defaults) -> MaterialMaps<'a> {
        let pick = |t: &'a Option<GpuTexture>, fallback: &'a GpuTexture| &t.as_ref().unwrap_or(fallback).view;
        MaterialMaps {
            color: pick(&self.color, &defaults.white_srgb),
            occlusion: pick(&self.occlusion, &defaults.white_linear),
            normal: pick(&self.normal, &defaults.flat_normal),
            roughness: pick(&self.roughness, &defaults.white_linear),
        }
    }

    fn slot_mut(&mut self, slot: TextureSlot) -> &mut Option<GpuTexture> {
        match slot {
            TextureSlot::Color => &mut self.color,
            TextureSlot::Occlusion => &mut self.occlusion,
            TextureSlot::Normal => &mut self.normal,
            TextureSlot::Roughness => &mut self.roughness,
        }
    }
}
