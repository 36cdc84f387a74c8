use asset::mesh::MeshVertex;
use bytemuck::{Pod, Zeroable};
use wgpu::{VertexBufferLayout, VertexStepMode};

/// Vertex: position + normal + uv.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
    };
}

impl From<&MeshVertex> for Vertex {
    fn from(v: &MeshVertex) -> Self {
        Self {
            pos: v.position,
            normal: v.normal,
            uv: v.uv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_tightly_packed() {
        assert_eq!(Vertex::LAYOUT.array_stride, 32);
        let attrs = Vertex::LAYOUT.attributes;
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs[2].offset, 24);
    }

    #[test]
    fn converts_from_mesh_vertex() {
        let v = Vertex::from(&MeshVertex::new([1.0, 2.0, 3.0], [0.0, 0.0, 1.0], [0.5, 0.25]));
        assert_eq!(v.pos, [1.0, 2.0, 3.0]);
        assert_eq!(v.uv, [0.5, 0.25]);
    }
}
