//! egui on top of the scene. Stored next to the renderer in the viewer,
//! not inside it, because `egui_winit::State` is tied to the window.

use renderer::{Overlay, OverlayTarget, Renderer};
use wgpu::{CommandBuffer, CommandEncoder};
use winit::event::WindowEvent;
use winit::window::Window;

/// Surface pixels per egui point. egui lays out and reads the cursor in
/// window points (physical window pixels / scale factor); the surface holds
/// the same logical area at the capped ratio, so one point spans
/// `pixel_ratio` surface pixels.
fn surface_pixels_per_point(pixel_ratio: f32, zoom: f32) -> f32 {
    pixel_ratio * zoom
}

pub struct EguiOverlay {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    shapes: Vec<egui::epaint::ClippedShape>,
    textures_delta: egui::TexturesDelta,
}

impl EguiOverlay {
    pub fn new(window: &Window, renderer: &Renderer) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            Some(renderer.device().limits().max_texture_dimension_2d as usize),
        );
        let egui_renderer =
            egui_wgpu::Renderer::new(renderer.device(), renderer.surface_format(), None, 1, false);
        Self {
            ctx,
            state,
            renderer: egui_renderer,
            shapes: Vec::new(),
            textures_delta: egui::TexturesDelta::default(),
        }
    }

    /// Forward a window event. Returns true if egui consumed it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Build this frame's UI. Shapes are tessellated at record time, against
    /// the surface they are drawn into.
    pub fn run(&mut self, window: &Window, ui: impl FnMut(&egui::Context)) {
        let raw_input = self.state.take_egui_input(window);
        let output = self.ctx.run(raw_input, ui);
        self.state
            .handle_platform_output(window, output.platform_output);
        self.shapes = output.shapes;
        self.textures_delta.append(output.textures_delta);
    }
}

impl Overlay for EguiOverlay {
    fn record(
        &mut self,
        target: &OverlayTarget<'_>,
        encoder: &mut CommandEncoder,
    ) -> Vec<CommandBuffer> {
        let pixels_per_point = surface_pixels_per_point(target.pixel_ratio, self.ctx.zoom_factor());
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: target.size_in_pixels,
            pixels_per_point,
        };
        let paint_jobs = self
            .ctx
            .tessellate(std::mem::take(&mut self.shapes), pixels_per_point);
        let delta = std::mem::take(&mut self.textures_delta);
        for (id, image) in &delta.set {
            self.renderer
                .update_texture(target.device, target.queue, *id, image);
        }
        let extra = self.renderer.update_buffers(
            target.device,
            target.queue,
            encoder,
            &paint_jobs,
            &screen,
        );

        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui overlay"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.renderer
                .render(&mut pass.forget_lifetime(), &paint_jobs, &screen);
        }

        for id in &delta.free {
            self.renderer.free_texture(id);
        }
        extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::viewport::Viewport;

    #[test]
    fn drawn_and_hit_tested_positions_agree_when_ratio_is_capped() {
        // Scale factor 3 is capped to 2 for the surface.
        let scale = 3.0_f32;
        let viewport = Viewport::new(400, 300, scale);
        let size = viewport.size();
        let (sw, sh) = size.physical();
        assert_eq!((sw, sh), (800, 600));

        let ppp = surface_pixels_per_point(size.pixel_ratio, 1.0);
        let (window_w, window_h) = (400.0 * scale, 300.0 * scale);
        for (cx, cy) in [(0.0, 0.0), (600.0, 450.0), (1137.0, 21.0)] {
            // egui-winit: cursor in window pixels divided by the scale factor.
            let point = (cx / scale, cy / scale);
            // Where that point is painted, as a fraction of the surface,
            // must be where the cursor is, as a fraction of the window.
            let drawn = (point.0 * ppp / sw as f32, point.1 * ppp / sh as f32);
            assert!((drawn.0 - cx / window_w).abs() < 1e-6);
            assert!((drawn.1 - cy / window_h).abs() < 1e-6);
        }
    }

    #[test]
    fn zoom_scales_points() {
        assert_eq!(surface_pixels_per_point(2.0, 1.5), 3.0);
    }
}
