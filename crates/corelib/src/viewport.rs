//! Viewport size bookkeeping for the resize handler.

use crate::camera::PerspectiveCamera;

/// Highest pixel ratio the renderer will use, however dense the display.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

/// Render surface size: logical dimensions plus the pixel ratio applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl SurfaceSize {
    /// Size of the backing buffer in device pixels.
    pub fn physical(&self) -> (u32, u32) {
        let w = (self.width as f32 * self.pixel_ratio).round() as u32;
        let h = (self.height as f32 * self.pixel_ratio).round() as u32;
        (w.max(1), h.max(1))
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// `min(device, cap)`; garbage device ratios fall back to 1.
pub fn capped_pixel_ratio(device_ratio: f32, cap: f32) -> f32 {
    if !device_ratio.is_finite() || device_ratio <= 0.0 {
        return 1.0;
    }
    device_ratio.min(cap)
}

#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    cap: f32,
    size: SurfaceSize,
}

impl Viewport {
    pub fn new(width: u32, height: u32, device_ratio: f32) -> Self {
        Self::with_cap(width, height, device_ratio, MAX_PIXEL_RATIO)
    }

    pub fn with_cap(width: u32, height: u32, device_ratio: f32, cap: f32) -> Self {
        Self {
            cap,
            size: SurfaceSize {
                width: width.max(1),
                height: height.max(1),
                pixel_ratio: capped_pixel_ratio(device_ratio, cap),
            },
        }
    }

    /// Apply a new logical size: camera aspect + projection first, then the
    /// surface size the renderer should configure.
    pub fn resize(
        &mut self,
        camera: &mut PerspectiveCamera,
        width: u32,
        height: u32,
        device_ratio: f32,
    ) -> SurfaceSize {
        self.size = SurfaceSize {
            width: width.max(1),
            height: height.max(1),
            pixel_ratio: capped_pixel_ratio(device_ratio, self.cap),
        };
        camera.set_aspect(self.size.aspect());
        self.size
    }

    /// Same as [`Viewport::resize`] for window systems that report physical
    /// pixels and a scale factor.
    pub fn resize_physical(
        &mut self,
        camera: &mut PerspectiveCamera,
        physical_width: u32,
        physical_height: u32,
        scale_factor: f64,
    ) -> SurfaceSize {
        let scale = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor
        } else {
            1.0
        };
        let width = (physical_width as f64 / scale).round() as u32;
        let height = (physical_height as f64 / scale).round() as u32;
        self.resize(camera, width, height, scale as f32)
    }

    #[inline]
    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    #[inline]
    pub fn cap(&self) -> f32 {
        self.cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vec3;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(75f32.to_radians(), 1.0, 0.1, 100.0, Vec3::Z)
    }

    #[test]
    fn resize_sets_aspect_and_surface() {
        let mut cam = camera();
        let mut vp = Viewport::new(800, 600, 1.0);
        for (w, h) in [(1920, 1080), (640, 480), (300, 900), (1, 1)] {
            let s = vp.resize(&mut cam, w, h, 1.0);
            assert_eq!((s.width, s.height), (w, h));
            assert!((cam.aspect - w as f32 / h as f32).abs() < 1e-6);
        }
    }

    #[test]
    fn pixel_ratio_is_capped() {
        let mut cam = camera();
        let mut vp = Viewport::new(800, 600, 1.0);
        for ratio in [1.0, 1.5, 2.0, 3.0, 4.5] {
            let s = vp.resize(&mut cam, 800, 600, ratio);
            assert!(s.pixel_ratio <= MAX_PIXEL_RATIO);
            assert_eq!(s.pixel_ratio, ratio.min(MAX_PIXEL_RATIO));
        }
        let s = vp.resize(&mut cam, 800, 600, 3.0);
        assert_eq!(s.physical(), (1600, 1200));
    }

    #[test]
    fn resize_is_idempotent() {
        let mut cam = camera();
        let mut vp = Viewport::new(800, 600, 1.0);
        let a = vp.resize(&mut cam, 1024, 768, 2.0);
        let proj = cam.proj();
        let b = vp.resize(&mut cam, 1024, 768, 2.0);
        assert_eq!(a, b);
        assert_eq!(proj, cam.proj());
    }

    #[test]
    fn zero_size_is_clamped() {
        let mut cam = camera();
        let mut vp = Viewport::new(800, 600, 1.0);
        let s = vp.resize(&mut cam, 0, 0, 1.0);
        assert_eq!((s.width, s.height), (1, 1));
        assert!(cam.proj().to_cols_array().iter().all(|f| f.is_finite()));
    }

    #[test]
    fn physical_resize_converts_to_logical() {
        let mut cam = camera();
        let mut vp = Viewport::new(800, 600, 1.0);
        let s = vp.resize_physical(&mut cam, 3000, 1500, 3.0);
        assert_eq!((s.width, s.height), (1000, 500));
        assert_eq!(s.pixel_ratio, 2.0);
        assert_eq!(s.physical(), (2000, 1000));
        assert!((cam.aspect - 2.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_device_ratio_falls_back_to_one() {
        assert_eq!(capped_pixel_ratio(f32::NAN, 2.0), 1.0);
        assert_eq!(capped_pixel_ratio(0.0, 2.0), 1.0);
        assert_eq!(capped_pixel_ratio(1.25, 2.0), 1.25);
    }
}
