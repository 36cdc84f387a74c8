//! Uniform blocks shared with the WGSL shaders. Every field is a `mat4` or a
//! `vec4` so the Rust layout matches WGSL's uniform alignment without padding.

use bytemuck::{Pod, Zeroable};
use corelib::scene::{SceneObject, SceneState};
use glam::Mat4;

use asset::model::ModelMaterial;

/// Flat ambient used while no environment map is bound.
const FALLBACK_AMBIENT: f32 = 0.08;

/// Per-frame data (group 0).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    /// Inverse of `proj * rotation(view)`, maps NDC to sky directions.
    pub sky_inv_view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    /// xyz: towards the light, w: 1 if the light casts shadows.
    pub light_dir: [f32; 4],
    /// rgb: color, w: intensity.
    pub light_color: [f32; 4],
    /// x: environment bound, y: shadow texel size, z: fallback ambient.
    pub env: [f32; 4],
}

impl FrameUniform {
    pub fn from_scene(scene: &SceneState, has_environment: bool, shadow_map_size: u32) -> Self {
        let cam = &scene.camera;
        let view = cam.view();
        let rot_only = Mat4::from_mat3(glam::Mat3::from_mat4(view));
        let sky = (cam.proj() * rot_only).inverse();

        let light = &scene.light;
        let dir = light.direction();
        let [r, g, b] = light.color;
        Self {
            view_proj: cam.proj_view().to_cols_array_2d(),
            light_view_proj: light.shadow_proj_view().to_cols_array_2d(),
            sky_inv_view_proj: sky.to_cols_array_2d(),
            camera_pos: cam.position.extend(1.0).to_array(),
            light_dir: [dir.x, dir.y, dir.z, flag(light.cast_shadow)],
            light_color: [r, g, b, light.intensity],
            env: [
                flag(has_environment),
                1.0 / shadow_map_size.max(1) as f32,
                FALLBACK_AMBIENT,
                0.0,
            ],
        }
    }
}

/// Per-draw data (group 1, dynamic offset).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    /// x: env intensity, y: receive shadow, zw: uv repeat.
    pub params: [f32; 4],
    /// time, frequency, amplitude, unused.
    pub wave: [f32; 4],
    pub color: [f32; 4],
}

impl ObjectUniform {
    pub fn new(object: &SceneObject, world: Mat4) -> Self {
        let normal = world.inverse().transpose();
        let env_intensity = if object.receives_environment {
            object.env_map_intensity
        } else {
            1.0
        };
        Self {
            model: world.to_cols_array_2d(),
            normal: normal.to_cols_array_2d(),
            params: [env_intensity, flag(object.receive_shadow), 1.0, 1.0],
            wave: [0.0; 4],
            color: [1.0; 4],
        }
    }

    pub fn with_uv_repeat(mut self, repeat: [f32; 2]) -> Self {
        self.params[2] = repeat[0];
        self.params[3] = repeat[1];
        self
    }

    pub fn with_wave(mut self, time: f32, frequency: f32, amplitude: f32, color: [f32; 3]) -> Self {
        self.wave = [time, frequency, amplitude, 0.0];
        self.color = [color[0], color[1], color[2], 1.0];
        self
    }
}

/// Material factors (group 2, binding 0).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    /// metallic, roughness, unused, unused.
    pub pbr: [f32; 4],
    pub emissive: [f32; 4],
    /// Which maps to use: normal, occlusion, roughness.
    pub maps: [f32; 4],
}

impl MaterialUniform {
    pub fn from_model(m: &ModelMaterial) -> Self {
        let [er, eg, eb] = m.emissive;
        Self {
            base_color: m.base_color,
            pbr: [m.metallic, m.roughness, 0.0, 0.0],
            emissive: [er, eg, eb, 0.0],
            maps: [0.0; 4],
        }
    }

    /// Floor: dielectric, every map in use.
    pub fn floor() -> Self {
        Self {
            base_color: [1.0; 4],
            pbr: [0.0, 1.0, 0.0, 0.0],
            emissive: [0.0; 4],
            maps: [1.0, 1.0, 1.0, 0.0],
        }
    }
}

#[inline]
fn flag(b: bool) -> f32 {
    if b { 1.0 } else { 0.0 }
}

/// Round `size` up to the next multiple of `align` (a power of two).
pub fn align_to(size: u64, align: u64) -> u64 {
    (size + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use corelib::presets::ScenePreset;
    use corelib::scene::{ObjectKind, SceneObject};

    fn camera_position(u: &FrameUniform) -> Vec3 {
        Vec3::new(u.camera_pos[0], u.camera_pos[1], u.camera_pos[2])
    }

    #[test]
    fn uniform_sizes_are_vec4_multiples() {
        assert_eq!(std::mem::size_of::<FrameUniform>(), 256);
        assert_eq!(std::mem::size_of::<ObjectUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 64);
    }

    #[test]
    fn frame_uniform_reflects_scene() {
        let scene = ScenePreset::airport().build_scene(16.0 / 9.0);
        let u = FrameUniform::from_scene(&scene, true, 1024);
        assert_eq!(camera_position(&u), scene.camera.position);
        assert_eq!(u.light_color[3], 3.0);
        assert_eq!(u.light_dir[3], 1.0);
        assert_eq!(u.env[0], 1.0);
        assert!((u.env[1] - 1.0 / 1024.0).abs() < 1e-9);
        let d = Vec3::new(u.light_dir[0], u.light_dir[1], u.light_dir[2]);
        assert!((d.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn sky_matrix_ignores_camera_translation() {
        let mut scene = ScenePreset::airport().build_scene(1.0);
        let a = FrameUniform::from_scene(&scene, true, 512).sky_inv_view_proj;
        let offset = Vec3::new(5.0, 0.0, 5.0);
        scene.camera.position += offset;
        scene.camera.target += offset;
        let b = FrameUniform::from_scene(&scene, true, 512).sky_inv_view_proj;
        let (a, b) = (Mat4::from_cols_array_2d(&a), Mat4::from_cols_array_2d(&b));
        assert!(a.abs_diff_eq(b, 1e-4));
    }

    #[test]
    fn object_uniform_uses_env_intensity_only_when_flagged() {
        let floor = corelib::scene::Floor {
            width: 1.0,
            height: 1.0,
            uv_repeat: [8.0, 8.0],
        };
        let mut obj = SceneObject::new("floor", ObjectKind::Floor(floor));
        obj.env_map_intensity = 2.5;
        assert_eq!(ObjectUniform::new(&obj, Mat4::IDENTITY).params[0], 1.0);
        let obj = obj.receiving_environment();
        let u = ObjectUniform::new(&obj, Mat4::IDENTITY).with_uv_repeat(floor.uv_repeat);
        assert_eq!(u.params, [2.5, 0.0, 8.0, 8.0]);
    }

    #[test]
    fn alignment_rounds_up() {
        assert_eq!(align_to(176, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
    }
}
