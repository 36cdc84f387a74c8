//! Per-frame draw list: what to draw with which geometry, material and
//! object uniform. Built from scene state alone, no GPU access.

use asset::model::ModelData;
use corelib::scene::{ObjectKind, SceneState};

use crate::uniforms::ObjectUniform;

/// Per-primitive material indices of an uploaded model, by mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelLayout {
    pub meshes: Vec<Vec<Option<usize>>>,
}

impl ModelLayout {
    pub fn from_data(data: &ModelData) -> Self {
        Self {
            meshes: data
                .meshes
                .iter()
                .map(|m| m.primitives.iter().map(|p| p.material).collect())
                .collect(),
        }
    }
}

/// Generated plane mesh, keyed by its exact dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlaneKey {
    width: u32,
    height: u32,
    pub segments: u32,
}

impl PlaneKey {
    pub fn new(width: f32, height: f32, segments: u32) -> Self {
        Self {
            width: width.to_bits(),
            height: height.to_bits(),
            segments: segments.max(1),
        }
    }

    pub fn width(&self) -> f32 {
        f32::from_bits(self.width)
    }

    pub fn height(&self) -> f32 {
        f32::from_bits(self.height)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Geometry {
    Primitive {
        model: usize,
        mesh: usize,
        primitive: usize,
    },
    Plane(PlaneKey),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaterialRef {
    /// `None` is the model's default material.
    Model { model: usize, material: Option<usize> },
    Floor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pipeline {
    Lit(MaterialRef),
    Wave,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Draw {
    pub geometry: Geometry,
    pub pipeline: Pipeline,
    /// Index into [`DrawList::uniforms`].
    pub object: usize,
    pub cast_shadow: bool,
}

#[derive(Debug, Default)]
pub struct DrawList {
    pub draws: Vec<Draw>,
    pub uniforms: Vec<ObjectUniform>,
}

impl DrawList {
    pub fn planes(&self) -> impl Iterator<Item = PlaneKey> + '_ {
        self.draws.iter().filter_map(|d| match d.geometry {
            Geometry::Plane(k) => Some(k),
            _ => None,
        })
    }

    pub fn shadow_casters(&self) -> impl Iterator<Item = &Draw> {
        self.draws.iter().filter(|d| d.cast_shadow)
    }
}

/// Walk the scene. Models whose upload is unknown to `models` are skipped.
pub fn collect(scene: &SceneState, models: &[ModelLayout]) -> DrawList {
    let mut list = DrawList::default();
    for obj in scene.objects() {
        let root = obj.transform.matrix();
        match &obj.kind {
            ObjectKind::Model(inst) => {
                let model = inst.model.0 as usize;
                let Some(layout) = models.get(model) else {
                    log::debug!("Model {:?} of '{}' is not uploaded", inst.model, obj.name);
                    continue;
                };
                for (node, world) in inst.nodes.iter().zip(inst.world_matrices(root)) {
                    let Some((mesh, materials)) =
                        node.mesh.and_then(|m| layout.meshes.get(m).map(|p| (m, p)))
                    else {
                        continue;
                    };
                    let object = list.uniforms.len();
                    list.uniforms.push(ObjectUniform::new(obj, world));
                    for (primitive, material) in materials.iter().enumerate() {
                        list.draws.push(Draw {
                            geometry: Geometry::Primitive {
                                model,
                                mesh,
                                primitive,
                            },
                            pipeline: Pipeline::Lit(MaterialRef::Model {
                                model,
                                material: *material,
                            }),
                            object,
                            cast_shadow: obj.cast_shadow,
                        });
                    }
                }
            }
            ObjectKind::Floor(floor) => {
                let object = list.uniforms.len();
                list.uniforms
                    .push(ObjectUniform::new(obj, root).with_uv_repeat(floor.uv_repeat));
                list.draws.push(Draw {
                    geometry: Geometry::Plane(PlaneKey::new(floor.width, floor.height, 1)),
                    pipeline: Pipeline::Lit(MaterialRef::Floor),
                    object,
                    cast_shadow: obj.cast_shadow,
                });
            }
            ObjectKind::ShaderPlane(plane) => {
                let u = plane.uniforms;
                let object = list.uniforms.len();
                list.uniforms.push(
                    ObjectUniform::new(obj, root).with_wave(u.time, u.frequency, u.amplitude, u.color),
                );
                list.draws.push(Draw {
                    geometry: Geometry::Plane(PlaneKey::new(plane.width, plane.height, plane.segments)),
                    pipeline: Pipeline::Wave,
                    object,
                    // The shadow pass does not displace vertices.
                    cast_shadow: false,
                });
            }
        }
    }
    list
}
