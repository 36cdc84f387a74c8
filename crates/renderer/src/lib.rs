//! Renderer: wgpu device and surface, scene passes (shadow, lit, wave
//! planes, sky) and an overlay hook for UI drawn on top.
//! wgpu = 23.x, winit = 0.30.x

pub mod draw;
pub mod error;
pub mod gpu;
pub mod material;
pub mod pipelines;
pub mod renderer;
pub mod resources;
pub mod uniforms;
pub mod vertex;

pub use error::RenderError;
pub use renderer::{Overlay, OverlayTarget, Renderer};
