//! Platform layer: window, event loop, input and the per-tick glue between
//! asset streaming, the frame loop and the renderer.
//!
//! - Redraws are requested only while the frame loop is running.
//! - Completed loads and panel edits are applied between ticks.
//! - Resize and scale changes go through the viewport before the renderer.

mod input;
mod overlay;
pub mod panel;
pub mod streaming;
mod viewer;

use std::path::PathBuf;

use anyhow::{Context, Result};
use corelib::loading::LoadPolicy;
use corelib::presets::{DEFAULT_ASSET_ROOT, SceneKind};
use winit::event_loop::{ControlFlow, EventLoop};

/// Everything the command line can set.
#[derive(Clone, Debug)]
pub struct ViewerOptions {
    pub backends: wgpu::Backends,
    /// Logical window size.
    pub width: u32,
    pub height: u32,
    pub show_fps: bool,
    pub assets: PathBuf,
    pub scene: SceneKind,
    pub load_policy: LoadPolicy,
    /// Stop after this many ticks.
    pub frames: Option<u64>,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            width: 1280,
            height: 720,
            show_fps: false,
            assets: PathBuf::from(DEFAULT_ASSET_ROOT),
            scene: SceneKind::default(),
            load_policy: LoadPolicy::default(),
            frames: None,
        }
    }
}

/// Open the viewer window and run until it is closed or the loop stops.
/// A fatal render error or a fail-fast load failure is returned.
pub fn run(options: ViewerOptions) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = viewer::ViewerApp::new(options);
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;
    app.finish()
}
