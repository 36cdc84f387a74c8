//! Tunables panel: one slider per bounded scalar, a color button per color.
//!
//! The panel never writes the scene itself. Edits are collected while the
//! UI runs and applied through the registry afterwards, so targets and
//! propagation run before the tick that follows.

use corelib::scene::SceneState;
use corelib::tunables::{TunableRegistry, TunableValue};

#[derive(Clone, Debug, PartialEq)]
pub struct Edit {
    pub name: String,
    pub value: TunableValue,
}

#[derive(Debug, Default)]
pub struct Panel {
    visible: bool,
}

impl Panel {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::debug!("Tunables panel {}", if self.visible { "shown" } else { "hidden" });
    }

    /// Draw the panel and return what the user changed this frame.
    pub fn ui(&self, ctx: &egui::Context, registry: &TunableRegistry) -> Vec<Edit> {
        let mut edits = Vec::new();
        egui::Window::new("Tunables")
            .default_pos([12.0, 12.0])
            .resizable(false)
            .show(ctx, |ui| {
                for t in registry.iter() {
                    let changed = match t.value {
                        TunableValue::Scalar(mut v) => {
                            let response = match t.bounds {
                                Some(b) => ui.add(
                                    egui::Slider::new(&mut v, b.min..=b.max)
                                        .step_by(b.step as f64)
                                        .text(t.name.as_str()),
                                ),
                                None => ui.add(egui::DragValue::new(&mut v).prefix(format!("{}: ", t.name))),
                            };
                            response.changed().then_some(TunableValue::Scalar(v))
                        }
                        TunableValue::Color(mut c) => {
                            let changed = ui
                                .horizontal(|ui| {
                                    let r = ui.color_edit_button_rgb(&mut c);
                                    ui.label(t.name.as_str());
                                    r.changed()
                                })
                                .inner;
                            changed.then_some(TunableValue::Color(c))
                        }
                    };
                    if let Some(value) = changed {
                        edits.push(Edit {
                            name: t.name.clone(),
                            value,
                        });
                    }
                }
                ui.separator();
                ui.small("F1 hides this panel");
            });
        edits
    }
}

/// Write edits through the registry. Unknown names are logged and skipped.
pub fn apply_edits(registry: &mut TunableRegistry, scene: &mut SceneState, edits: Vec<Edit>) {
    for edit in edits {
        if let Err(e) = registry.set(&edit.name, edit.value, scene) {
            log::warn!("Panel edit rejected: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::presets::ScenePreset;

    #[test]
    fn edits_reach_the_scene_before_the_next_tick() {
        let preset = ScenePreset::airport();
        let mut scene = preset.build_scene(1.0);
        let mut registry = preset.tunables();
        apply_edits(
            &mut registry,
            &mut scene,
            vec![
                Edit {
                    name: "lightIntensity".into(),
                    value: TunableValue::Scalar(7.5),
                },
                Edit {
                    name: "lightX".into(),
                    value: TunableValue::Scalar(-1.0),
                },
            ],
        );
        assert_eq!(scene.light.intensity, 7.5);
        assert_eq!(scene.light.position.x, -1.0);
        assert_eq!(
            registry.get("lightIntensity").map(|t| t.value),
            Some(TunableValue::Scalar(7.5))
        );
    }

    #[test]
    fn unknown_edits_are_skipped() {
        let preset = ScenePreset::airport();
        let mut scene = preset.build_scene(1.0);
        let mut registry = preset.tunables();
        let before = scene.light.intensity;
        apply_edits(
            &mut registry,
            &mut scene,
            vec![Edit {
                name: "fogDensity".into(),
                value: TunableValue::Scalar(1.0),
            }],
        );
        assert_eq!(scene.light.intensity, before);
    }

    #[test]
    fn panel_starts_hidden_and_toggles() {
        let mut p = Panel::default();
        assert!(!p.is_visible());
        p.toggle();
        assert!(p.is_visible());
    }
}
