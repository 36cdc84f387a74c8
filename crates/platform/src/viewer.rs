//! The winit application: owns the window, renderer, scene and frame loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use corelib::clock::{FrameClock, FrameTime, MonotonicTime};
use corelib::frame::{FrameError, FrameLoop, RunControl, SceneRenderer, TickOutcome};
use corelib::presets::ScenePreset;
use corelib::scene::SceneState;
use corelib::tunables::TunableRegistry;
use corelib::viewport::Viewport;
use renderer::{Overlay, RenderError, Renderer};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::ViewerOptions;
use crate::input::OrbitInput;
use crate::overlay::EguiOverlay;
use crate::panel::{Panel, apply_edits};
use crate::streaming::AssetStream;

const TITLE: &str = "Airport viewer";
const FPS_INTERVAL: Duration = Duration::from_secs(1);

pub struct ViewerApp {
    options: ViewerOptions,
    preset: ScenePreset,
    viewer: Option<Viewer>,
    error: Option<anyhow::Error>,
}

impl ViewerApp {
    pub fn new(options: ViewerOptions) -> Self {
        let preset = ScenePreset::for_kind(options.scene);
        Self {
            options,
            preset,
            viewer: None,
            error: None,
        }
    }

    /// Called once the event loop has returned.
    pub fn finish(self) -> Result<()> {
        if let Some(v) = &self.viewer {
            let s = v.assets.table().summary();
            log::info!(
                "Viewer closed after {} frames ({} dropped); assets: {} loaded, {} failed, {} pending",
                v.frame_loop.clock().frame_count(),
                v.frame_loop.dropped_frames(),
                s.loaded,
                s.failed,
                s.pending
            );
        }
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        if let Some(v) = &self.viewer {
            v.frame_loop.control().stop();
        }
        self.error.get_or_insert(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }
        match Viewer::new(event_loop, &self.options, &self.preset) {
            Ok(v) => self.viewer = Some(v),
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(v) = self.viewer.as_mut() else {
            return;
        };
        let consumed = v.panel.is_visible() && v.overlay.on_window_event(&v.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                v.frame_loop.control().stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let scale = v.window.scale_factor();
                v.resize(size.width, size.height, scale);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let size = v.window.inner_size();
                log::info!("Scale factor changed: {scale_factor:.3}");
                v.resize(size.width, size.height, scale_factor);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::F1),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => v.panel.toggle(),
            WindowEvent::RedrawRequested => match v.redraw() {
                Ok(()) if v.frame_loop.control().is_running() => v.window.request_redraw(),
                Ok(()) => event_loop.exit(),
                Err(e) => self.fail(event_loop, e),
            },
            other if !consumed => {
                let height = v.window.inner_size().height as f32;
                v.input.handle(&other, &mut v.scene, height);
            }
            _ => {}
        }
    }
}

struct Viewer {
    window: Arc<Window>,
    renderer: Renderer,
    overlay: EguiOverlay,
    panel: Panel,
    input: OrbitInput,
    scene: SceneState,
    tunables: TunableRegistry,
    viewport: Viewport,
    frame_loop: FrameLoop<MonotonicTime>,
    assets: AssetStream,
    fps: Option<FpsCounter>,
}

impl Viewer {
    fn new(event_loop: &ActiveEventLoop, options: &ViewerOptions, preset: &ScenePreset) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(LogicalSize::new(options.width, options.height));
        let window = Arc::new(event_loop.create_window(attrs).context("failed to create window")?);
        let inner = window.inner_size();
        let scale = window.scale_factor();
        log::info!("Window created: {}x{} (scale {scale:.2})", inner.width, inner.height);

        let mut viewport = Viewport::new(options.width, options.height, scale as f32);
        let mut scene = preset.build_scene(viewport.size().aspect());
        let size = viewport.resize_physical(&mut scene.camera, inner.width, inner.height, scale);

        let renderer = pollster::block_on(Renderer::new(window.clone(), options.backends, size))
            .context("failed to initialise renderer")?;
        let overlay = EguiOverlay::new(&window, &renderer);

        let tunables = preset.tunables();
        tunables.apply_all(&mut scene);
        let assets = AssetStream::start(preset, &options.assets, options.load_policy)?;

        let frame_loop = FrameLoop::new(FrameClock::new(MonotonicTime::start()), RunControl::new())
            .with_frame_limit(options.frames);

        window.request_redraw();
        Ok(Self {
            window,
            renderer,
            overlay,
            panel: Panel::default(),
            input: OrbitInput::default(),
            scene,
            tunables,
            viewport,
            frame_loop,
            assets,
            fps: options.show_fps.then(FpsCounter::default),
        })
    }

    fn resize(&mut self, width: u32, height: u32, scale: f64) {
        let size = self
            .viewport
            .resize_physical(&mut self.scene.camera, width, height, scale);
        let (pw, ph) = size.physical();
        log::debug!(
            "Resized: {}x{} logical, {pw}x{ph} surface (ratio {:.2})",
            size.width,
            size.height,
            size.pixel_ratio
        );
        self.renderer.resize(size);
    }

    /// One tick: splice finished loads, run the panel, then the frame loop.
    fn redraw(&mut self) -> Result<()> {
        self.assets
            .drain(&mut self.scene, &mut self.renderer)
            .context("asset loading stopped the viewer")?;

        let show_panel = self.panel.is_visible();
        if show_panel {
            let mut edits = Vec::new();
            let (panel, tunables) = (&self.panel, &self.tunables);
            self.overlay
                .run(&self.window, |ctx| edits = panel.ui(ctx, tunables));
            apply_edits(&mut self.tunables, &mut self.scene, edits);
        }

        let mut presenter = Presenter {
            renderer: &mut self.renderer,
            overlay: show_panel.then_some(&mut self.overlay),
        };
        let outcome = self.frame_loop.tick(&mut self.scene, &mut presenter)?;

        if let (Some(fps), TickOutcome::Rendered(time) | TickOutcome::Dropped(time)) =
            (self.fps.as_mut(), outcome)
        {
            if let Some(rate) = fps.frame(&time) {
                self.window.set_title(&format!("{TITLE} | {rate:.1} FPS"));
            }
        }
        Ok(())
    }
}

/// Renders the scene plus, when the panel is open, the egui overlay.
struct Presenter<'a> {
    renderer: &'a mut Renderer,
    overlay: Option<&'a mut EguiOverlay>,
}

impl SceneRenderer for Presenter<'_> {
    fn render(&mut self, scene: &SceneState, _time: &FrameTime) -> Result<(), FrameError> {
        let overlay = self.overlay.as_deref_mut().map(|o| o as &mut dyn Overlay);
        self.renderer
            .render(scene, overlay)
            .map_err(RenderError::into_frame_error)
    }
}

/// Average frame rate over roughly one-second windows.
#[derive(Debug, Default)]
struct FpsCounter {
    window_start: Duration,
    frames: u32,
}

impl FpsCounter {
    fn frame(&mut self, time: &FrameTime) -> Option<f32> {
        self.frames += 1;
        let span = time.elapsed.saturating_sub(self.window_start);
        if span < FPS_INTERVAL {
            return None;
        }
        let rate = self.frames as f32 / span.as_secs_f32();
        self.window_start = time.elapsed;
        self.frames = 0;
        Some(rate)
    }
}
