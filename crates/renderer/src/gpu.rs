//! Surface, device and the main depth buffer.

use std::sync::Arc;

use corelib::viewport::SurfaceSize;
use wgpu::{
    Device, DeviceDescriptor, Features, Instance, InstanceDescriptor, Limits, PowerPreference,
    PresentMode, Queue, Surface, SurfaceConfiguration, SurfaceTexture, TextureFormat,
    TextureUsages, TextureView,
};
use winit::window::Window;

use crate::error::RenderError;
use crate::resources::depth_view;

pub struct GpuState {
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,
    device: Device,
    queue: Queue,
    depth_view: TextureView,
    size: SurfaceSize,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>, sized to `size.physical()`.
    pub async fn new(
        window: Arc<Window>,
        backends: wgpu::Backends,
        size: SurfaceSize,
    ) -> Result<Self, RenderError> {
        let instance = Instance::new(InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter(backends))?;
        let info = adapter.get_info();
        log::info!("Using adapter '{}' ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("Viewer Device"),
                    required_features: Features::empty(),
                    required_limits: Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let (width, height) = size.physical();
        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        let depth_view = depth_view(&device, "DepthTex", width, height, false);

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            depth_view,
            size,
        })
    }

    /// Reconfigure the surface and depth buffer for a new size.
    pub fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
        let (width, height) = size.physical();
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.reconfigure();
    }

    /// Re-apply the current configuration after a lost/outdated surface.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = depth_view(
            &self.device,
            "DepthTex",
            self.surface_config.width,
            self.surface_config.height,
            false,
        );
    }

    /// Next swapchain image. A lost or outdated surface is reconfigured
    /// before the error is returned, so the next frame can succeed.
    pub fn acquire(&mut self) -> Result<SurfaceTexture, RenderError> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(e) => {
                let err = RenderError::from(e);
                if err.is_recoverable() {
                    log::debug!("{err}; reconfiguring surface");
                    self.reconfigure();
                }
                Err(err)
            }
        }
    }

    #[inline]
    pub fn device(&self) -> &Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    #[inline]
    pub fn surface_format(&self) -> TextureFormat {
        self.surface_config.format
    }

    #[inline]
    pub fn depth_view(&self) -> &TextureView {
        &self.depth_view
    }

    #[inline]
    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn size_in_pixels(&self) -> [u32; 2] {
        [self.surface_config.width, self.surface_config.height]
    }
}
