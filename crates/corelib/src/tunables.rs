//! Named live parameters written straight through to scene fields.
//!
//! The debug panel is only a view over [`TunableRegistry`]. A `set` writes
//! the target and runs the propagation before returning, i.e. before the
//! next tick. Bounds are advisory: `set` does not clamp (the panel's slider
//! does), `set_clamped` does.

use crate::error::{CoreError, CoreResult};
use crate::scene::{ObjectKind, SceneState};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TunableValue {
    Scalar(f32),
    Color([f32; 3]),
}

impl TunableValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Color(_) => "color",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Field a tunable writes to.
#[derive(Clone, Debug, PartialEq)]
pub enum TunableTarget {
    LightIntensity,
    LightPosition(Axis),
    EnvMapIntensity,
    PlaneFrequency(String),
    PlaneAmplitude(String),
    PlaneColor(String),
}

/// Work to run after a value changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Propagation {
    /// Push the environment intensity to every object that receives it.
    ReapplyEnvironment,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tunable {
    pub name: String,
    pub value: TunableValue,
    pub bounds: Option<Bounds>,
    pub target: TunableTarget,
    pub propagation: Option<Propagation>,
}

impl Tunable {
    pub fn scalar(
        name: impl Into<String>,
        target: TunableTarget,
        value: f32,
        min: f32,
        max: f32,
        step: f32,
    ) -> Self {
        Self {
            name: name.into(),
            value: TunableValue::Scalar(value),
            bounds: Some(Bounds { min, max, step }),
            target,
            propagation: None,
        }
    }

    pub fn color(name: impl Into<String>, target: TunableTarget, value: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            value: TunableValue::Color(value),
            bounds: None,
            target,
            propagation: None,
        }
    }

    pub fn on_change(mut self, propagation: Propagation) -> Self {
        self.propagation = Some(propagation);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct TunableRegistry {
    entries: Vec<Tunable>,
}

impl TunableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace, by name) a tunable.
    pub fn register(&mut self, tunable: Tunable) {
        match self.entries.iter_mut().find(|t| t.name == tunable.name) {
            Some(slot) => *slot = tunable,
            None => self.entries.push(tunable),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Tunable> {
        self.entries.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tunable> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write `value` to the target as given, then propagate.
    pub fn set(&mut self, name: &str, value: TunableValue, scene: &mut SceneState) -> CoreResult<()> {
        let tunable = self
            .entries
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| CoreError::UnknownTunable(name.to_string()))?;
        if std::mem::discriminant(&tunable.value) != std::mem::discriminant(&value) {
            return Err(CoreError::TunableKind {
                name: name.to_string(),
                expected: tunable.value.kind(),
            });
        }
        tunable.value = value;
        write_target(&tunable.target, value, scene);
        if let Some(p) = tunable.propagation {
            propagate(p, scene);
        }
        Ok(())
    }

    /// Like [`TunableRegistry::set`], clamping scalars into their bounds.
    pub fn set_clamped(&mut self, name: &str, value: TunableValue, scene: &mut SceneState) -> CoreResult<()> {
        let value = match (value, self.get(name).and_then(|t| t.bounds)) {
            (TunableValue::Scalar(v), Some(b)) => TunableValue::Scalar(v.clamp(b.min, b.max)),
            (v, _) => v,
        };
        self.set(name, value, scene)
    }

    /// Push every current value into the scene (used once at startup).
    pub fn apply_all(&self, scene: &mut SceneState) {
        for t in &self.entries {
            write_target(&t.target, t.value, scene);
        }
        for p in self.entries.iter().filter_map(|t| t.propagation) {
            propagate(p, scene);
        }
    }
}

fn write_target(target: &TunableTarget, value: TunableValue, scene: &mut SceneState) {
    match (target, value) {
        (TunableTarget::LightIntensity, TunableValue::Scalar(v)) => scene.light.intensity = v,
        (TunableTarget::LightPosition(axis), TunableValue::Scalar(v)) => match axis {
            Axis::X => scene.light.position.x = v,
            Axis::Y => scene.light.position.y = v,
            Axis::Z => scene.light.position.z = v,
        },
        (TunableTarget::EnvMapIntensity, TunableValue::Scalar(v)) => scene.env_map_intensity = v,
        (TunableTarget::PlaneFrequency(name), TunableValue::Scalar(v)) => {
            with_plane(scene, name, |u| u.frequency = v)
        }
        (TunableTarget::PlaneAmplitude(name), TunableValue::Scalar(v)) => {
            with_plane(scene, name, |u| u.amplitude = v)
        }
        (TunableTarget::PlaneColor(name), TunableValue::Color(c)) => {
            with_plane(scene, name, |u| u.color = c)
        }
        (target, value) => {
            log::warn!("tunable target {target:?} cannot take a {} value", value.kind())
        }
    }
}

fn with_plane(
    scene: &mut SceneState,
    name: &str,
    f: impl FnOnce(&mut crate::scene::PlaneUniforms),
) {
    match scene.object_by_name_mut(name).map(|o| &mut o.kind) {
        Some(ObjectKind::ShaderPlane(p)) => f(&mut p.uniforms),
        _ => log::warn!("no shader plane named '{name}'"),
    }
}

fn propagate(p: Propagation, scene: &mut SceneState) {
    match p {
        Propagation::ReapplyEnvironment => {
            let n = scene.apply_environment();
            log::debug!("environment re-applied to {n} objects");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PerspectiveCamera;
    use crate::orbit::OrbitControls;
    use crate::scene::{DirectionalLight, Floor, PlaneUniforms, SceneObject, ShaderPlane};
    use crate::vec3;

    fn scene() -> SceneState {
        let mut s = SceneState::new(
            PerspectiveCamera::new(1.2, 1.0, 0.1, 100.0, vec3(-8.0, 4.0, 8.0)),
            OrbitControls::new(vec3(0.0, 1.0, 0.0)),
            DirectionalLight::new([1.0; 3], 3.0, vec3(3.0, 1.0, -2.25)),
        );
        s.insert(
            SceneObject::new(
                "floor",
                ObjectKind::Floor(Floor {
                    width: 50.0,
                    height: 50.0,
                    uv_repeat: [8.0, 8.0],
                }),
            )
            .receiving_environment(),
        );
        s.insert(SceneObject::new(
            "wave",
            ObjectKind::ShaderPlane(ShaderPlane {
                width: 1.0,
                height: 1.0,
                segments: 8,
                uniforms: PlaneUniforms {
                    time: 0.0,
                    frequency: 1.0,
                    amplitude: 0.1,
                    color: [0.0; 3],
                },
            }),
        ));
        s
    }

    fn registry() -> TunableRegistry {
        let mut r = TunableRegistry::new();
        r.register(
            Tunable::scalar("envMapIntensity", TunableTarget::EnvMapIntensity, 2.5, 0.0, 10.0, 0.001)
                .on_change(Propagation::ReapplyEnvironment),
        );
        r.register(Tunable::scalar("lightIntensity", TunableTarget::LightIntensity, 3.0, 0.0, 10.0, 0.001));
        r.register(Tunable::scalar("lightX", TunableTarget::LightPosition(Axis::X), 3.0, -5.0, 5.0, 0.001));
        r.register(Tunable::color("waveColor", TunableTarget::PlaneColor("wave".into()), [0.2, 0.4, 0.6]));
        r
    }

    #[test]
    fn set_writes_target_and_propagates_immediately() {
        let mut s = scene();
        let mut r = registry();
        r.set("envMapIntensity", TunableValue::Scalar(4.0), &mut s).unwrap();
        assert_eq!(s.env_map_intensity, 4.0);
        assert_eq!(s.objects()[0].env_map_intensity, 4.0);

        r.set("lightX", TunableValue::Scalar(-1.5), &mut s).unwrap();
        assert_eq!(s.light.position.x, -1.5);
        assert_eq!(r.get("lightX").unwrap().value, TunableValue::Scalar(-1.5));
    }

    #[test]
    fn direct_assignment_above_max_is_unclamped() {
        let mut s = scene();
        let mut r = registry();
        r.set("lightIntensity", TunableValue::Scalar(42.0), &mut s).unwrap();
        assert_eq!(s.light.intensity, 42.0);

        r.set_clamped("lightIntensity", TunableValue::Scalar(42.0), &mut s).unwrap();
        assert_eq!(s.light.intensity, 10.0);
    }

    #[test]
    fn color_targets_reach_shader_planes() {
        let mut s = scene();
        let mut r = registry();
        r.apply_all(&mut s);
        let ObjectKind::ShaderPlane(p) = &s.objects()[1].kind else {
            panic!("expected shader plane");
        };
        assert_eq!(p.uniforms.color, [0.2, 0.4, 0.6]);

        r.set("waveColor", TunableValue::Color([1.0, 0.0, 0.0]), &mut s).unwrap();
        let ObjectKind::ShaderPlane(p) = &s.objects()[1].kind else {
            panic!("expected shader plane");
        };
        assert_eq!(p.uniforms.color, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn mismatched_or_unknown_names_are_errors() {
        let mut s = scene();
        let mut r = registry();
        assert!(matches!(
            r.set("fog", TunableValue::Scalar(1.0), &mut s),
            Err(CoreError::UnknownTunable(_))
        ));
        assert!(matches!(
            r.set("lightX", TunableValue::Color([0.0; 3]), &mut s),
            Err(CoreError::TunableKind { .. })
        ));
    }

    #[test]
    fn apply_all_pushes_defaults() {
        let mut s = scene();
        s.light.intensity = 0.0;
        registry().apply_all(&mut s);
        assert_eq!(s.light.intensity, 3.0);
        assert_eq!(s.env_map_intensity, 2.5);
        assert_eq!(s.objects()[0].env_map_intensity, 2.5);
    }
}
