//! Scene state: the single owned aggregate the render loop draws and the
//! attachment path mutates.

use crate::animation::AnimationMixer;
use crate::camera::PerspectiveCamera;
use crate::loading::LoadId;
use crate::orbit::OrbitControls;
use crate::transform::Transform;
use crate::{Mat4, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// GPU-side model handle issued by the renderer on upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModelId(pub u32);

/// GPU-side cube-map handle issued by the renderer on upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnvironmentId(pub u32);

/// One node of a model. Parents always precede their children.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelNode {
    pub name: Option<String>,
    pub parent: Option<usize>,
    pub local: Transform,
    /// Index into the model's mesh list.
    pub mesh: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct ModelInstance {
    pub model: ModelId,
    pub nodes: Vec<ModelNode>,
    pub mixer: Option<AnimationMixer>,
}

impl ModelInstance {
    pub fn new(model: ModelId, nodes: Vec<ModelNode>) -> Self {
        Self {
            model,
            nodes,
            mixer: None,
        }
    }

    pub fn with_mixer(mut self, mixer: AnimationMixer) -> Self {
        self.mixer = Some(mixer);
        self
    }

    /// Advance the mixer (if any) and write the posed locals back.
    pub fn advance(&mut self, delta: f32) {
        let Some(mixer) = self.mixer.as_mut() else {
            return;
        };
        let mut locals: Vec<Transform> = self.nodes.iter().map(|n| n.local).collect();
        mixer.update(delta, &mut locals);
        for (node, local) in self.nodes.iter_mut().zip(locals) {
            node.local = local;
        }
    }

    /// World matrix of every node given the object's root matrix.
    pub fn world_matrices(&self, root: Mat4) -> Vec<Mat4> {
        let mut out: Vec<Mat4> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let parent = node
                .parent
                .and_then(|p| out.get(p).copied())
                .unwrap_or(root);
            out.push(parent * node.local.matrix());
        }
        out
    }
}

/// Time-driven uniforms of a shader plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneUniforms {
    /// Absolute seconds since the loop started.
    pub time: f32,
    pub frequency: f32,
    pub amplitude: f32,
    pub color: [f32; 3],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShaderPlane {
    pub width: f32,
    pub height: f32,
    pub segments: u32,
    pub uniforms: PlaneUniforms,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Floor {
    pub width: f32,
    pub height: f32,
    pub uv_repeat: [f32; 2],
}

#[derive(Clone, Debug)]
pub enum ObjectKind {
    Model(ModelInstance),
    Floor(Floor),
    ShaderPlane(ShaderPlane),
}

#[derive(Clone, Debug)]
pub struct SceneObject {
    pub name: String,
    pub transform: Transform,
    pub kind: ObjectKind,
    /// Set at creation; picks up the scene environment and its intensity.
    pub receives_environment: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub env_map_intensity: f32,
    /// Request this object came from, if it was loaded.
    pub source: Option<LoadId>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            transform: Transform::identity(),
            kind,
            receives_environment: false,
            cast_shadow: false,
            receive_shadow: false,
            env_map_intensity: 1.0,
            source: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn receiving_environment(mut self) -> Self {
        self.receives_environment = true;
        self
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        self
    }

    pub fn model(&self) -> Option<&ModelInstance> {
        match &self.kind {
            ObjectKind::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn shader_plane_mut(&mut self) -> Option<&mut ShaderPlane> {
        match &mut self.kind {
            ObjectKind::ShaderPlane(p) => Some(p),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowSettings {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
    /// Half extent of the orthographic shadow camera.
    pub extent: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            map_size: 512,
            near: 0.5,
            far: 500.0,
            extent: 5.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    /// Light shines from here towards `target`.
    pub position: Vec3,
    pub target: Vec3,
    pub cast_shadow: bool,
    pub shadow: ShadowSettings,
}

impl DirectionalLight {
    pub fn new(color: [f32; 3], intensity: f32, position: Vec3) -> Self {
        Self {
            color,
            intensity,
            position,
            target: Vec3::ZERO,
            cast_shadow: false,
            shadow: ShadowSettings::default(),
        }
    }

    /// Unit vector pointing from the lit surface towards the light.
    pub fn direction(&self) -> Vec3 {
        (self.position - self.target).normalize_or(Vec3::Y)
    }

    /// View-projection of the orthographic shadow camera.
    pub fn shadow_proj_view(&self) -> Mat4 {
        let e = self.shadow.extent;
        let up = if self.direction().abs_diff_eq(Vec3::Y, 1e-3) {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_rh(self.position, self.target, up);
        let proj = Mat4::orthographic_rh(-e, e, -e, e, self.shadow.near, self.shadow.far);
        proj * view
    }
}

pub struct SceneState {
    objects: Vec<SceneObject>,
    ids: Vec<ObjectId>,
    next_id: u32,
    environment: Option<EnvironmentId>,
    pub env_map_intensity: f32,
    pub light: DirectionalLight,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    /// Clear color while no environment is loaded.
    pub background_color: [f32; 3],
}

impl SceneState {
    pub fn new(camera: PerspectiveCamera, controls: OrbitControls, light: DirectionalLight) -> Self {
        Self {
            objects: Vec::new(),
            ids: Vec::new(),
            next_id: 0,
            environment: None,
            env_map_intensity: 1.0,
            light,
            camera,
            controls,
            background_color: [0.05, 0.05, 0.08],
        }
    }

    /// Push a fully configured object.
    pub fn insert(&mut self, object: SceneObject) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push(object);
        self.ids.push(id);
        id
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.ids.iter().copied().zip(self.objects.iter())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        let i = self.ids.iter().position(|&x| x == id)?;
        self.objects.get(i)
    }

    pub fn object_by_name_mut(&mut self, name: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.name == name)
    }

    pub fn object_by_source(&self, source: LoadId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.source == Some(source))
    }

    pub fn contains_source(&self, source: LoadId) -> bool {
        self.object_by_source(source).is_some()
    }

    #[inline]
    pub fn environment(&self) -> Option<EnvironmentId> {
        self.environment
    }

    /// Use `env` as both background and image-based light.
    pub fn set_environment(&mut self, env: EnvironmentId) {
        self.environment = Some(env);
    }

    /// Push the environment intensity to every object that receives it and
    /// turn its shadows on. Returns how many objects were touched.
    pub fn apply_environment(&mut self) -> usize {
        let intensity = self.env_map_intensity;
        let mut touched = 0;
        for obj in self.objects.iter_mut().filter(|o| o.receives_environment) {
            obj.env_map_intensity = intensity;
            obj.cast_shadow = true;
            obj.receive_shadow = true;
            touched += 1;
        }
        touched
    }

    /// Delta-driven: advance every model mixer.
    pub fn advance_mixers(&mut self, delta: f32) {
        for obj in &mut self.objects {
            if let ObjectKind::Model(model) = &mut obj.kind {
                model.advance(delta);
            }
        }
    }

    /// Absolute-time-driven: set every shader plane's time uniform.
    pub fn set_shader_time(&mut self, elapsed: f32) {
        for plane in self.objects.iter_mut().filter_map(SceneObject::shader_plane_mut) {
            plane.uniforms.time = elapsed;
        }
    }

    /// One damping step of the orbit controls.
    pub fn update_controls(&mut self) -> bool {
        self.controls.update(&mut self.camera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimationClip, Channel, ChannelValues, Interpolation};
    use crate::{Quat, vec3};

    fn scene() -> SceneState {
        SceneState::new(
            PerspectiveCamera::new(1.2, 1.0, 0.1, 100.0, vec3(-8.0, 4.0, 8.0)),
            OrbitControls::new(vec3(0.0, 1.0, 0.0)),
            DirectionalLight::new([1.0; 3], 3.0, vec3(3.0, 1.0, -2.25)),
        )
    }

    fn plane(name: &str) -> SceneObject {
        SceneObject::new(
            name,
            ObjectKind::ShaderPlane(ShaderPlane {
                width: 2.0,
                height: 2.0,
                segments: 32,
                uniforms: PlaneUniforms {
                    time: 0.0,
                    frequency: 1.0,
                    amplitude: 0.1,
                    color: [1.0, 0.0, 0.0],
                },
            }),
        )
    }

    #[test]
    fn environment_reaches_only_flagged_objects() {
        let mut s = scene();
        let floor = s.insert(
            SceneObject::new(
                "floor",
                ObjectKind::Floor(Floor {
                    width: 50.0,
                    height: 50.0,
                    uv_repeat: [8.0, 8.0],
                }),
            )
            .receiving_environment()
            .with_shadows(false, true),
        );
        let p = s.insert(plane("p"));
        s.env_map_intensity = 2.5;
        assert_eq!(s.apply_environment(), 1);

        let floor = s.object(floor).unwrap();
        assert_eq!(floor.env_map_intensity, 2.5);
        assert!(floor.cast_shadow && floor.receive_shadow);
        let p = s.object(p).unwrap();
        assert_eq!(p.env_map_intensity, 1.0);
        assert!(!p.cast_shadow);
    }

    #[test]
    fn shader_time_is_absolute() {
        let mut s = scene();
        s.insert(plane("a"));
        s.insert(plane("b"));
        s.set_shader_time(1.25);
        s.set_shader_time(1.5);
        for o in s.objects() {
            if let ObjectKind::ShaderPlane(p) = &o.kind {
                assert_eq!(p.uniforms.time, 1.5);
            }
        }
    }

    #[test]
    fn world_matrices_follow_parent_chain() {
        let nodes = vec![
            ModelNode {
                name: Some("root".into()),
                parent: None,
                local: Transform::from_translation(vec3(1.0, 0.0, 0.0)),
                mesh: None,
            },
            ModelNode {
                name: Some("child".into()),
                parent: Some(0),
                local: Transform::from_translation(vec3(0.0, 2.0, 0.0)),
                mesh: Some(0),
            },
        ];
        let inst = ModelInstance::new(ModelId(0), nodes);
        let root = Transform::from_translation(vec3(10.0, 0.0, 10.0)).matrix();
        let m = inst.world_matrices(root);
        assert_eq!(m[1].transform_point3(Vec3::ZERO), vec3(11.0, 2.0, 10.0));
    }

    #[test]
    fn mixers_advance_by_delta() {
        let clip = AnimationClip::new(
            "spin",
            vec![Channel {
                node: 0,
                times: vec![0.0, 4.0],
                values: ChannelValues::Translation(vec![Vec3::ZERO, vec3(0.0, 4.0, 0.0)]),
                interpolation: Interpolation::Linear,
            }],
        );
        let node = ModelNode {
            name: None,
            parent: None,
            local: Transform::from_trs(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE),
            mesh: Some(0),
        };
        let mut s = scene();
        s.insert(SceneObject::new(
            "anim",
            ObjectKind::Model(
                ModelInstance::new(ModelId(1), vec![node]).with_mixer(AnimationMixer::new(vec![clip])),
            ),
        ));
        s.advance_mixers(1.0);
        s.advance_mixers(1.0);
        let m = s.objects()[0].model().unwrap();
        assert!((m.nodes[0].local.translation.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn shadow_camera_sees_the_origin() {
        let light = DirectionalLight::new([1.0; 3], 3.0, vec3(3.0, 1.0, -2.25));
        let clip = light.shadow_proj_view().project_point3(Vec3::ZERO);
        assert!(clip.x.abs() <= 1.0 && clip.y.abs() <= 1.0);
        assert!((0.0..=1.0).contains(&clip.z));
    }
}
