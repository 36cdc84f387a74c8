use corelib::frame::FrameError;
use thiserror::Error;
use wgpu::SurfaceError;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter for backends {0:?}")]
    NoAdapter(wgpu::Backends),
    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface does not support any texture format")]
    NoSurfaceFormat,
    #[error("surface error: {0}")]
    Surface(#[from] SurfaceError),
}

impl RenderError {
    /// Lost/outdated/timed-out surfaces cost one frame; running out of
    /// memory ends the loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Surface(SurfaceError::Lost | SurfaceError::Outdated | SurfaceError::Timeout)
        )
    }

    pub fn into_frame_error(self) -> FrameError {
        if self.is_recoverable() {
            FrameError::Recoverable(self.to_string())
        } else {
            FrameError::Fatal(self.to_string())
        }
    }
}
