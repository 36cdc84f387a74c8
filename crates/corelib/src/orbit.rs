//! Orbit camera controls with optional damping (inertia).
//!
//! Input (drag/wheel) only accumulates pending deltas; the camera moves in
//! [`OrbitControls::update`], which the frame loop calls once per tick.
//! With damping enabled each update applies `damping_factor` of the pending
//! motion and keeps the rest, so the camera glides to a stop over a few
//! dozen frames.

use std::f32::consts::{PI, TAU};

use crate::Vec3;
use crate::camera::PerspectiveCamera;

const POLAR_EPS: f32 = 1e-4;
const ZOOM_STEP: f32 = 0.95;

/// Polar coordinates of the camera offset around the target (Y up).
#[derive(Clone, Copy, Debug, PartialEq)]
struct Spherical {
    radius: f32,
    /// Polar angle from +Y.
    phi: f32,
    /// Azimuth around Y, measured from +Z towards +X.
    theta: f32,
}

impl Spherical {
    fn from_offset(v: Vec3) -> Self {
        let radius = v.length();
        if radius <= f32::EPSILON {
            return Self {
                radius: 0.0,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            theta: v.x.atan2(v.z),
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vec3 {
        let s = self.phi.sin() * self.radius;
        Vec3::new(
            s * self.theta.sin(),
            self.phi.cos() * self.radius,
            s * self.theta.cos(),
        )
    }
}

#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_offset: Vec3,
    steps: u64,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            steps: 0,
        }
    }

    pub fn with_damping(mut self, factor: f32) -> Self {
        self.enable_damping = true;
        self.damping_factor = factor;
        self
    }

    /// Drag by `(dx, dy)` pixels on a viewport `height` pixels tall.
    /// A drag across the full height turns the camera once around.
    pub fn rotate(&mut self, dx: f32, dy: f32, height: f32) {
        let h = height.max(1.0);
        self.delta_theta -= TAU * dx / h * self.rotate_speed;
        self.delta_phi -= TAU * dy / h * self.rotate_speed;
    }

    /// Move the target in the camera plane so the scene follows the cursor.
    pub fn pan(&mut self, dx: f32, dy: f32, height: f32, camera: &PerspectiveCamera) {
        let h = height.max(1.0);
        let offset = camera.position - self.target;
        // Half-height of the view frustum at the target distance.
        let target_distance = offset.length() * (camera.fov_y_rad * 0.5).tan();

        let forward = camera.forward();
        let right = forward.cross(camera.up).normalize_or(Vec3::X);
        let up = right.cross(forward);

        let pan_x = 2.0 * dx * target_distance / h * self.pan_speed;
        let pan_y = 2.0 * dy * target_distance / h * self.pan_speed;
        self.pan_offset += -right * pan_x + up * pan_y;
    }

    /// Positive `steps` zoom in, negative zoom out.
    pub fn zoom(&mut self, steps: f32) {
        self.scale *= ZOOM_STEP.powf(steps);
    }

    /// Apply one damping step and place the camera. Returns true when the
    /// camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        self.steps += 1;

        let mut spherical = Spherical::from_offset(camera.position - self.target);
        let factor = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };

        spherical.theta += self.delta_theta * factor;
        spherical.phi += self.delta_phi * factor;
        spherical.theta = wrap_angle(spherical.theta);
        spherical.phi = spherical.phi.clamp(POLAR_EPS, PI - POLAR_EPS);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        self.target += self.pan_offset * factor;

        let old_position = camera.position;
        camera.position = self.target + spherical.to_offset();
        camera.look_at(self.target);

        if self.enable_damping {
            let keep = 1.0 - self.damping_factor;
            self.delta_theta *= keep;
            self.delta_phi *= keep;
            self.pan_offset *= keep;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        (camera.position - old_position).length_squared() > 1e-8
    }

    /// Number of `update` calls so far.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Pending rotation that damping has not yet applied.
    pub fn pending_rotation(&self) -> (f32, f32) {
        (self.delta_theta, self.delta_phi)
    }
}

fn wrap_angle(a: f32) -> f32 {
    if a > PI {
        a - TAU
    } else if a < -PI {
        a + TAU
    } else {
        a
    }
}
