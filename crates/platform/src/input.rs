//! Mouse input for the orbit controls: left drag rotates, right drag pans,
//! the wheel zooms.

use corelib::scene::SceneState;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// Pixels of trackpad scrolling per wheel notch.
const PIXELS_PER_LINE: f32 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Drag {
    Rotate,
    Pan,
}

#[derive(Debug, Default)]
pub struct OrbitInput {
    drag: Option<Drag>,
    cursor: Option<(f32, f32)>,
}

impl OrbitInput {
    /// Feed one window event. `height` is the window height in the same
    /// pixels as the cursor positions. Returns true if the controls moved.
    pub fn handle(&mut self, event: &WindowEvent, scene: &mut SceneState, height: f32) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.on_button(*button, *state);
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.on_cursor(position.x as f32, position.y as f32, scene, height)
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
                };
                self.on_wheel(steps, scene)
            }
            _ => false,
        }
    }

    fn on_button(&mut self, button: MouseButton, state: ElementState) {
        let drag = match button {
            MouseButton::Left => Drag::Rotate,
            MouseButton::Right => Drag::Pan,
            _ => return,
        };
        match state {
            ElementState::Pressed => self.drag = Some(drag),
            ElementState::Released if self.drag == Some(drag) => self.drag = None,
            ElementState::Released => {}
        }
    }

    fn on_cursor(&mut self, x: f32, y: f32, scene: &mut SceneState, height: f32) -> bool {
        let last = self.cursor.replace((x, y));
        let (Some(drag), Some((lx, ly))) = (self.drag, last) else {
            return false;
        };
        let (dx, dy) = (x - lx, y - ly);
        match drag {
            Drag::Rotate => scene.controls.rotate(dx, dy, height),
            Drag::Pan => scene.controls.pan(dx, dy, height, &scene.camera),
        }
        true
    }

    fn on_wheel(&mut self, steps: f32, scene: &mut SceneState) -> bool {
        if steps == 0.0 {
            return false;
        }
        scene.controls.zoom(steps);
        true
    }
}
