//! Declarative scene setups: which assets go where, light/camera defaults,
//! and the tunables each scene exposes.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::camera::PerspectiveCamera;
use crate::loading::{LoadId, LoadPurpose, LoadTable, TextureSlot, TextureWrap};
use crate::orbit::OrbitControls;
use crate::scene::{
    DirectionalLight, Floor, ObjectKind, PlaneUniforms, SceneObject, SceneState, ShaderPlane,
    ShadowSettings,
};
use crate::transform::Transform;
use crate::tunables::{Axis, Propagation, Tunable, TunableRegistry, TunableTarget};
use crate::{Vec3, vec3};

pub const DEFAULT_ASSET_ROOT: &str = "static";
const ENV_MAP_INTENSITY: f32 = 2.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SceneKind {
    #[default]
    Airport,
    Shaders,
}

impl FromStr for SceneKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "airport" => Ok(Self::Airport),
            "shaders" | "shader" => Ok(Self::Shaders),
            other => Err(format!("unknown scene '{other}'")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelRequest {
    pub name: String,
    pub path: PathBuf,
    pub placement: Vec3,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FloorPreset {
    pub width: f32,
    pub height: f32,
    pub uv_repeat: [f32; 2],
    pub textures: Vec<(TextureSlot, PathBuf)>,
}

impl FloorPreset {
    /// Maps tile across the floor unless it is textured exactly once.
    pub fn wrap(&self) -> TextureWrap {
        if self.uv_repeat == [1.0, 1.0] {
            TextureWrap::Clamp
        } else {
            TextureWrap::Repeat
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlanePreset {
    pub name: String,
    pub position: Vec3,
    pub size: f32,
    pub uniforms: PlaneUniforms,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScenePreset {
    pub kind: SceneKind,
    pub models: Vec<ModelRequest>,
    pub floor: Option<FloorPreset>,
    /// px, nx, py, ny, pz, nz
    pub environment: Option<[PathBuf; 6]>,
    pub planes: Vec<PlanePreset>,
}

impl ScenePreset {
    pub fn for_kind(kind: SceneKind) -> Self {
        match kind {
            SceneKind::Airport => Self::airport(),
            SceneKind::Shaders => Self::shaders(),
        }
    }

    pub fn airport() -> Self {
        let model = |name: &str, placement: Vec3| ModelRequest {
            name: name.to_string(),
            path: PathBuf::from(format!("models/{name}.glb")),
            placement,
        };
        let asphalt = |suffix: &str| {
            PathBuf::from(format!("textures/Asphalt_005_SD/Asphalt_006_{suffix}.jpg"))
        };
        Self {
            kind: SceneKind::Airport,
            models: vec![
                model("plane", vec3(0.0, 10.0, 0.0)),
                model("hangar", vec3(10.0, 0.0, 10.0)),
                model("terminal", vec3(-10.0, 0.0, -5.0)),
                model("bus", vec3(10.0, 0.5, -10.0)),
                model("tower", vec3(-10.0, 0.0, 10.0)),
            ],
            floor: Some(FloorPreset {
                width: 50.0,
                height: 50.0,
                uv_repeat: [8.0, 8.0],
                textures: vec![
                    (TextureSlot::Color, asphalt("COLOR")),
                    (TextureSlot::Occlusion, asphalt("OCC")),
                    (TextureSlot::Normal, asphalt("NRM")),
                    (TextureSlot::Roughness, asphalt("ROUGH")),
                ],
            }),
            environment: Some(cube_faces()),
            planes: Vec::new(),
        }
    }

    pub fn shaders() -> Self {
        let plane = |name: &str, x: f32, frequency: f32, amplitude: f32, color: [f32; 3]| PlanePreset {
            name: name.to_string(),
            position: vec3(x, 1.5, 0.0),
            size: 3.0,
            uniforms: PlaneUniforms {
                time: 0.0,
                frequency,
                amplitude,
                color,
            },
        };
        Self {
            kind: SceneKind::Shaders,
            models: Vec::new(),
            floor: None,
            environment: Some(cube_faces()),
            planes: vec![
                plane("flag", -4.0, 4.0, 0.15, [0.9, 0.3, 0.2]),
                plane("ripple", 0.0, 8.0, 0.08, [0.2, 0.6, 0.9]),
                plane("swell", 4.0, 2.0, 0.3, [0.3, 0.85, 0.4]),
            ],
        }
    }

    /// Build the initial scene: camera, controls, light and the objects
    /// that need no loading (floor mesh, shader planes).
    pub fn build_scene(&self, aspect: f32) -> SceneState {
        let camera = PerspectiveCamera::new(75f32.to_radians(), aspect, 0.1, 100.0, vec3(-8.0, 4.0, 8.0));
        let controls = OrbitControls::new(vec3(0.0, 1.0, 0.0)).with_damping(0.05);

        let mut light = DirectionalLight::new([1.0, 1.0, 1.0], 3.0, vec3(3.0, 1.0, -2.25));
        light.cast_shadow = true;
        light.shadow = ShadowSettings {
            map_size: 1024,
            far: 15.0,
            ..ShadowSettings::default()
        };

        let mut scene = SceneState::new(camera, controls, light);
        scene.env_map_intensity = ENV_MAP_INTENSITY;

        if let Some(floor) = &self.floor {
            let transform = Transform::identity().with_rotation_x(-std::f32::consts::FRAC_PI_2);
            scene.insert(
                SceneObject::new(
                    "floor",
                    ObjectKind::Floor(Floor {
                        width: floor.width,
                        height: floor.height,
                        uv_repeat: floor.uv_repeat,
                    }),
                )
                .with_transform(transform)
                .receiving_environment()
                .with_shadows(false, true),
            );
        }

        for p in &self.planes {
            scene.insert(
                SceneObject::new(
                    p.name.clone(),
                    ObjectKind::ShaderPlane(ShaderPlane {
                        width: p.size,
                        height: p.size,
                        segments: 64,
                        uniforms: p.uniforms,
                    }),
                )
                .with_transform(Transform::from_translation(p.position)),
            );
        }
        scene
    }

    /// Register every asset request under `root`, in declaration order.
    pub fn queue_requests(&self, root: &Path, table: &mut LoadTable) -> Vec<LoadId> {
        let mut ids = Vec::new();
        if let Some(floor) = &self.floor {
            let wrap = floor.wrap();
            for (slot, path) in &floor.textures {
                ids.push(table.request(vec![root.join(path)], LoadPurpose::Texture(*slot, wrap)));
            }
        }
        for m in &self.models {
            ids.push(table.request(
                vec![root.join(&m.path)],
                LoadPurpose::Model {
                    name: m.name.clone(),
                    placement: m.placement,
                },
            ));
        }
        if let Some(faces) = &self.environment {
            let paths = faces.iter().map(|f| root.join(f)).collect();
            ids.push(table.request(paths, LoadPurpose::Environment));
        }
        ids
    }

    pub fn tunables(&self) -> TunableRegistry {
        let mut r = TunableRegistry::new();
        if self.environment.is_some() {
            r.register(
                Tunable::scalar(
                    "envMapIntensity",
                    TunableTarget::EnvMapIntensity,
                    ENV_MAP_INTENSITY,
                    0.0,
                    10.0,
                    0.001,
                )
                .on_change(Propagation::ReapplyEnvironment),
            );
        }
        r.register(Tunable::scalar("lightIntensity", TunableTarget::LightIntensity, 3.0, 0.0, 10.0, 0.001));
        for (name, axis, value) in [
            ("lightX", Axis::X, 3.0),
            ("lightY", Axis::Y, 1.0),
            ("lightZ", Axis::Z, -2.25),
        ] {
            r.register(Tunable::scalar(name, TunableTarget::LightPosition(axis), value, -5.0, 5.0, 0.001));
        }
        for p in &self.planes {
            let u = p.uniforms;
            r.register(Tunable::scalar(
                format!("{}.frequency", p.name),
                TunableTarget::PlaneFrequency(p.name.clone()),
                u.frequency,
                0.0,
                20.0,
                0.01,
            ));
            r.register(Tunable::scalar(
                format!("{}.amplitude", p.name),
                TunableTarget::PlaneAmplitude(p.name.clone()),
                u.amplitude,
                0.0,
                1.0,
                0.001,
            ));
            r.register(Tunable::color(
                format!("{}.color", p.name),
                TunableTarget::PlaneColor(p.name.clone()),
                u.color,
            ));
        }
        r
    }
}

fn cube_faces() -> [PathBuf; 6] {
    ["px", "nx", "py", "ny", "pz", "nz"].map(|f| PathBuf::from(format!("textures/cubeMaps/{f}.png")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tunables::TunableValue;

    #[test]
    fn airport_requests_every_asset_once() {
        let preset = ScenePreset::airport();
        let mut table = LoadTable::new();
        let ids = preset.queue_requests(Path::new("static"), &mut table);
        // 4 floor textures + 5 models + 1 cube map
        assert_eq!(ids.len(), 10);
        assert_eq!(table.summary().pending, 10);

        let env = table
            .iter()
            .find(|p| p.purpose == LoadPurpose::Environment)
            .unwrap();
        assert_eq!(env.paths.len(), 6);
        assert_eq!(env.paths[0], Path::new("static/textures/cubeMaps/px.png"));

        let bus = table
            .iter()
            .find(|p| matches!(&p.purpose, LoadPurpose::Model { name, .. } if name == "bus"))
            .unwrap();
        assert_eq!(bus.paths[0], Path::new("static/models/bus.glb"));

        let tiled = table
            .iter()
            .filter(|p| matches!(p.purpose, LoadPurpose::Texture(_, TextureWrap::Repeat)))
            .count();
        assert_eq!(tiled, 4);
    }

    #[test]
    fn floor_textured_once_is_clamped() {
        let mut floor = ScenePreset::airport().floor.unwrap();
        assert_eq!(floor.wrap(), TextureWrap::Repeat);
        floor.uv_repeat = [1.0, 1.0];
        assert_eq!(floor.wrap(), TextureWrap::Clamp);
    }

    #[test]
    fn airport_scene_starts_with_floor_only() {
        let scene = ScenePreset::airport().build_scene(16.0 / 9.0);
        assert_eq!(scene.len(), 1);
        let floor = &scene.objects()[0];
        assert!(floor.receives_environment);
        assert!(floor.receive_shadow);
        assert!(scene.light.cast_shadow);
        assert_eq!(scene.light.shadow.map_size, 1024);
        assert_eq!(scene.light.shadow.far, 15.0);
        assert!(scene.controls.enable_damping);
        assert_eq!(scene.env_map_intensity, 2.5);
    }

    #[test]
    fn airport_tunables_match_panel_defaults() {
        let r = ScenePreset::airport().tunables();
        let names: Vec<_> = r.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["envMapIntensity", "lightIntensity", "lightX", "lightY", "lightZ"]);
        assert_eq!(r.get("lightZ").unwrap().value, TunableValue::Scalar(-2.25));
        let env = r.get("envMapIntensity").unwrap();
        assert_eq!(env.propagation, Some(Propagation::ReapplyEnvironment));
        assert_eq!(env.bounds.unwrap().max, 10.0);
    }

    #[test]
    fn shader_scene_has_planes_and_per_plane_tunables() {
        let preset = ScenePreset::shaders();
        let scene = preset.build_scene(1.0);
        assert_eq!(scene.len(), 3);
        let r = preset.tunables();
        assert!(r.get("ripple.frequency").is_some());
        assert!(matches!(r.get("swell.color").unwrap().value, TunableValue::Color(_)));
    }

    #[test]
    fn scene_kind_parses() {
        assert_eq!("Shaders".parse::<SceneKind>(), Ok(SceneKind::Shaders));
        assert!("lobby".parse::<SceneKind>().is_err());
    }
}
