//! CPU-side mesh representation used by loaders and the renderer.

/// Vertex with position/normal/uv. Values are in object space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Indexed triangle mesh with tightly-packed vertices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    /// Plane in the XY plane facing +Z, centred on the origin, split into
    /// `segments × segments` quads. UVs span `[0, 1]` with v pointing down.
    pub fn plane(width: f32, height: f32, segments: u32) -> Self {
        let seg = segments.max(1);
        let row = seg + 1;
        let mut vertices = Vec::with_capacity((row * row) as usize);
        for iy in 0..row {
            let v = iy as f32 / seg as f32;
            let y = (0.5 - v) * height;
            for ix in 0..row {
                let u = ix as f32 / seg as f32;
                let x = (u - 0.5) * width;
                vertices.push(MeshVertex::new([x, y, 0.0], [0.0, 0.0, 1.0], [u, v]));
            }
        }

        let mut indices = Vec::with_capacity((seg * seg * 6) as usize);
        for iy in 0..seg {
            for ix in 0..seg {
                let a = iy * row + ix;
                let b = a + row;
                let c = b + 1;
                let d = a + 1;
                // CCW seen from +Z
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        Self::new(vertices, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_data_validity() {
        let data = MeshData::new(vec![MeshVertex::default()], vec![0]);
        assert!(data.is_valid());
        assert!(!MeshData::default().is_valid());
    }

    #[test]
    fn plane_counts_and_extent() {
        let p = MeshData::plane(50.0, 50.0, 4);
        assert_eq!(p.vertices.len(), 25);
        assert_eq!(p.indices.len(), 4 * 4 * 6);
        let max_x = p.vertices.iter().map(|v| v.position[0]).fold(f32::MIN, f32::max);
        assert!((max_x - 25.0).abs() < 1e-5);
        assert!(p.indices.iter().all(|&i| (i as usize) < p.vertices.len()));
    }

    #[test]
    fn plane_triangles_face_positive_z() {
        let p = MeshData::plane(2.0, 2.0, 1);
        for tri in p.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| p.vertices[i as usize].position);
            let e1 = [b[0] - a[0], b[1] - a[1]];
            let e2 = [c[0] - a[0], c[1] - a[1]];
            let cross_z = e1[0] * e2[1] - e1[1] * e2[0];
            assert!(cross_z > 0.0);
        }
    }
}
