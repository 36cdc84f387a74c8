use crate::{Mat4, Vec3};

/// Right-handed perspective camera with a cached projection matrix.
///
/// The projection only changes through [`PerspectiveCamera::update_projection`],
/// so a new aspect ratio has no effect until it is recomputed.
#[derive(Clone, Copy, Debug)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov_y_rad: f32, aspect: f32, z_near: f32, z_far: f32, position: Vec3) -> Self {
        let mut camera = Self {
            position,
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_rad,
            z_near,
            z_far,
            aspect,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection();
        camera
    }

    /// Recompute the projection from the current fov/aspect/planes.
    pub fn update_projection(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        );
    }

    /// Store a new aspect ratio and recompute the projection.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection();
    }

    #[inline]
    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Projection with z in [0, 1], the convention wgpu expects.
    #[inline]
    pub fn proj(&self) -> Mat4 {
        self.projection
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }

    /// Unit vector from the camera towards its target.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_change_updates_projection() {
        let mut cam = PerspectiveCamera::new(1.0, 1.0, 0.1, 100.0, Vec3::Z);
        let before = cam.proj();
        cam.set_aspect(2.0);
        assert_ne!(before, cam.proj());
        // x scale is y scale / aspect
        let m = cam.proj().to_cols_array();
        assert!((m[0] * 2.0 - m[5]).abs() < 1e-5);
    }

    #[test]
    fn raw_aspect_write_is_stale_until_recomputed() {
        let mut cam = PerspectiveCamera::new(1.0, 1.0, 0.1, 100.0, Vec3::Z);
        let before = cam.proj();
        cam.aspect = 3.0;
        assert_eq!(before, cam.proj());
        cam.update_projection();
        assert_ne!(before, cam.proj());
    }
}
