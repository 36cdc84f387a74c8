//! GPU-side meshes and textures.

use asset::cubemap::CubemapData;
use asset::mesh::MeshData;
use asset::texture::{ColorSpace, TextureData, WrapMode};
use wgpu::util::DeviceExt;
use wgpu::{
    AddressMode, Buffer, BufferUsages, Device, Extent3d, FilterMode, Queue, Sampler,
    SamplerDescriptor, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages,
    TextureView, TextureViewDescriptor, TextureViewDimension,
};

use crate::vertex::Vertex;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

pub struct GpuMesh {
    pub vertex_buf: Buffer,
    pub index_buf: Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &Device, label: &str, mesh: &MeshData) -> Self {
        let vertices: Vec<Vertex> = mesh.vertices.iter().map(Vertex::from).collect();
        let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} VB")),
            contents: bytemuck::cast_slice(&vertices),
            usage: BufferUsages::VERTEX,
        });
        let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} IB")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: BufferUsages::INDEX,
        });
        Self {
            vertex_buf,
            index_buf,
            index_count: mesh.indices.len() as u32,
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buf.slice(..));
        pass.set_index_buffer(self.index_buf.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

pub fn texture_format(space: ColorSpace) -> TextureFormat {
    match space {
        ColorSpace::Srgb => TextureFormat::Rgba8UnormSrgb,
        ColorSpace::Linear => TextureFormat::Rgba8Unorm,
    }
}

fn address_mode(mode: WrapMode) -> AddressMode {
    match mode {
        WrapMode::ClampToEdge => AddressMode::ClampToEdge,
        WrapMode::Repeat => AddressMode::Repeat,
        WrapMode::MirroredRepeat => AddressMode::MirrorRepeat,
    }
}

pub struct GpuTexture {
    pub view: TextureView,
    pub width: u32,
    pub height: u32,
}

impl GpuTexture {
    pub fn upload(device: &Device, queue: &Queue, label: &str, data: &TextureData) -> Self {
        let texture = device.create_texture_with_data(
            queue,
            &TextureDescriptor {
                label: Some(label),
                size: Extent3d {
                    width: data.width,
                    height: data.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: TextureDimension::D2,
                format: texture_format(data.color_space),
                usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data.data,
        );
        Self {
            view: texture.create_view(&TextureViewDescriptor::default()),
            width: data.width,
            height: data.height,
        }
    }

    /// Six-layer texture viewed as a cube.
    pub fn upload_cube(device: &Device, queue: &Queue, label: &str, cube: &CubemapData) -> Self {
        let format = cube
            .faces
            .first()
            .map(|f| texture_format(f.color_space))
            .unwrap_or(TextureFormat::Rgba8UnormSrgb);
        let texture = device.create_texture_with_data(
            queue,
            &TextureDescriptor {
                label: Some(label),
                size: Extent3d {
                    width: cube.size,
                    height: cube.size,
                    depth_or_array_layers: 6,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: TextureDimension::D2,
                format,
                usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &cube.layer_bytes(),
        );
        Self {
            view: texture.create_view(&TextureViewDescriptor {
                label: Some(label),
                dimension: Some(TextureViewDimension::Cube),
                ..Default::default()
            }),
            width: cube.size,
            height: cube.size,
        }
    }
}

pub fn sampler_for(device: &Device, label: &str, data: &TextureData) -> Sampler {
    device.create_sampler(&SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode(data.sampling.wrap_u),
        address_mode_v: address_mode(data.sampling.wrap_v),
        mag_filter: FilterMode::Linear,
        min_filter: FilterMode::Linear,
        ..Default::default()
    })
}

pub fn linear_sampler(device: &Device, label: &str, mode: AddressMode) -> Sampler {
    device.create_sampler(&SamplerDescriptor {
        label: Some(label),
        address_mode_u: mode,
        address_mode_v: mode,
        address_mode_w: mode,
        mag_filter: FilterMode::Linear,
        min_filter: FilterMode::Linear,
        ..Default::default()
    })
}

pub fn shadow_sampler(device: &Device) -> Sampler {
    device.create_sampler(&SamplerDescriptor {
        label: Some("Shadow sampler"),
        address_mode_u: AddressMode::ClampToEdge,
        address_mode_v: AddressMode::ClampToEdge,
        mag_filter: FilterMode::Linear,
        min_filter: FilterMode::Linear,
        compare: Some(wgpu::CompareFunction::LessEqual),
        ..Default::default()
    })
}

/// Depth-only target. `sampled` adds TEXTURE_BINDING for the shadow map.
pub fn depth_view(device: &Device, label: &str, width: u32, height: u32, sampled: bool) -> TextureView {
    let mut usage = TextureUsages::RENDER_ATTACHMENT;
    if sampled {
        usage |= TextureUsages::TEXTURE_BINDING;
    }
    let tex = device.create_texture(&TextureDescriptor {
        label: Some(label),
        size: Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

/// 1×1 textures bound wherever a real map is missing or still loading.
pub struct Defaults {
    pub white_srgb: GpuTexture,
    pub white_linear: GpuTexture,
    pub flat_normal: GpuTexture,
    pub black_cube: GpuTexture,
}

impl Defaults {
    pub fn new(device: &Device, queue: &Queue) -> Self {
        let solid = |rgba: [u8; 4], space: ColorSpace, label: &str| {
            GpuTexture::upload(device, queue, label, &TextureData::solid(rgba, space))
        };
        let face = TextureData::solid([0, 0, 0, 255], ColorSpace::Srgb);
        let cube = CubemapData {
            faces: vec![face; 6],
            size: 1,
        };
        Self {
            white_srgb: solid([255; 4], ColorSpace::Srgb, "Default white"),
            white_linear: solid([255; 4], ColorSpace::Linear, "Default white (linear)"),
            flat_normal: solid([128, 128, 255, 255], ColorSpace::Linear, "Default normal"),
            black_cube: GpuTexture::upload_cube(device, queue, "Default environment", &cube),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_space_picks_format() {
        assert_eq!(texture_format(ColorSpace::Srgb), TextureFormat::Rgba8UnormSrgb);
        assert_eq!(texture_format(ColorSpace::Linear), TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn wrap_modes_map_to_address_modes() {
        assert_eq!(address_mode(WrapMode::Repeat), AddressMode::Repeat);
        assert_eq!(address_mode(WrapMode::MirroredRepeat), AddressMode::MirrorRepeat);
        assert_eq!(address_mode(WrapMode::ClampToEdge), AddressMode::ClampToEdge);
    }
}
